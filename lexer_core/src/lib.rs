//! Lexer Core - Incremental tokenization for a text editor.
//!
//! Keeps a per-line lexer state cache consistent with a buffer as it is
//! edited, regenerates line tokens on demand, and matches brackets using
//! those tokens. No rendering or windowing dependencies.

pub mod bracket;
pub mod buffer;
pub mod config;
pub mod document;
pub mod error;
pub mod fold;
pub mod parsers;
pub mod syntax;

pub use bracket::{BracketMatch, BracketMatcher};
pub use buffer::{BufferEdit, EditKind, LineSource, TextBuffer};
pub use config::EngineConfig;
pub use document::Document;
pub use error::{LexerError, Result};
pub use fold::{FoldManager, FoldQuery, FoldRegion, NoFolds};
pub use parsers::{
    BackgroundParser, DocumentSnapshot, NoticeLevel, ParseNotice, ParserScheduler,
    TokenErrorParser,
};
pub use syntax::{
    Damage, Language, LanguageRegistry, LexState, Lexer, LineStateCache, SyntaxHighlighter, Token,
    TokenKind, TokenSequence,
};
