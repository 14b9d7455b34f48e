//! Error types for the tokenization engine.
//!
//! Lexical problems in the buffer are never errors: scanners report them as
//! error-kind tokens. The variants here cover engine invariants, language
//! lookup, and configuration loading.

use thiserror::Error;

/// Errors reported by the engine.
#[derive(Debug, Error)]
pub enum LexerError {
    /// A line index beyond the current document or state cache.
    #[error("line {line} out of range (document has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// A token sequence that breaks the contiguity or sentinel rules.
    #[error("malformed token sequence on line {line}: {reason}")]
    MalformedTokens { line: usize, reason: String },

    /// The buffer revision moved while a retokenization pass was running.
    #[error("buffer changed during retokenization (expected revision {expected}, found {found})")]
    BufferChanged { expected: u64, found: u64 },

    /// No lexer registered under the given identifier.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LexerError {
    /// Create a malformed-token error.
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTokens {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error signals a broken engine invariant that a full
    /// rebuild can repair.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            Self::LineOutOfRange { .. } | Self::MalformedTokens { .. } | Self::BufferChanged { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LexerError>;
