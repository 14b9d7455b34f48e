//! Document facade.
//!
//! Ties a buffer to its retokenization driver, fold regions, and background
//! parsers, and routes every edit through all of them in order.

use crate::bracket::{BracketMatch, BracketMatcher};
use crate::buffer::{BufferEdit, TextBuffer};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fold::FoldManager;
use crate::parsers::{BackgroundParser, DocumentSnapshot, ParserScheduler};
use crate::syntax::{Damage, Language, SyntaxHighlighter, TokenSequence};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A buffer together with everything derived from it.
pub struct Document {
    /// The text buffer.
    buffer: TextBuffer,
    /// Syntax highlighter.
    highlighter: SyntaxHighlighter,
    /// Fold regions.
    folds: FoldManager,
    /// Idle-time parsers.
    parsers: ParserScheduler,
    /// File the buffer was loaded from, if any.
    file_path: Option<PathBuf>,
    /// Whether the buffer has been edited since loading.
    modified: bool,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file_path", &self.file_path)
            .field("language", &self.highlighter.language_id())
            .field("lines", &self.buffer.len_lines())
            .field("modified", &self.modified)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Document {
    /// Creates an empty document in the configured default language. Falls
    /// back to plain text if that language is unknown.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_buffer(TextBuffer::new(), None, config)
    }

    /// Creates a document holding `text`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str, config: EngineConfig) -> Self {
        Self::with_buffer(TextBuffer::from_str(text), None, config)
    }

    /// Loads a file, picking the language from its extension.
    pub fn open_file<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let buffer = TextBuffer::from_file(path)?;
        log::info!("Opened {} ({} lines)", path.display(), buffer.len_lines());
        Ok(Self::with_buffer(buffer, Some(path.to_path_buf()), config))
    }

    fn with_buffer(buffer: TextBuffer, file_path: Option<PathBuf>, config: EngineConfig) -> Self {
        let detected = file_path
            .as_deref()
            .map(Language::from_path)
            .filter(|lang| *lang != Language::PlainText);
        let language_id = match detected {
            Some(lang) => lang.id().to_string(),
            None => config.default_language.clone(),
        };

        let parsers = ParserScheduler::new(config.parser_delay());
        let mut highlighter = SyntaxHighlighter::new(config);
        let result = if highlighter.language_id() == language_id {
            highlighter.rebuild(&buffer)
        } else {
            highlighter.set_language(&language_id, &buffer)
        };
        if let Err(err) = result {
            log::warn!("{}; falling back to plain text", err);
            if let Err(err) = highlighter.rebuild(&buffer) {
                log::warn!("Initial tokenization failed: {}", err);
            }
        }

        Self {
            buffer,
            highlighter,
            folds: FoldManager::new(),
            parsers,
            file_path,
            modified: false,
        }
    }

    /// Returns a reference to the buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Returns the syntax highlighter.
    pub fn highlighter(&self) -> &SyntaxHighlighter {
        &self.highlighter
    }

    /// Returns the fold regions.
    pub fn folds(&self) -> &FoldManager {
        &self.folds
    }

    /// Mutable access to fold regions (toggling, folding all).
    pub fn folds_mut(&mut self) -> &mut FoldManager {
        &mut self.folds
    }

    /// Returns the parser scheduler.
    pub fn parsers(&self) -> &ParserScheduler {
        &self.parsers
    }

    /// Returns the current file path.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Returns whether the buffer has been edited.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Active language identifier.
    pub fn language_id(&self) -> &str {
        self.highlighter.language_id()
    }

    /// Switches language; the whole document is retokenized.
    pub fn set_language(&mut self, id: &str) -> Result<()> {
        self.highlighter.set_language(id, &self.buffer)?;
        self.parsers.restart(Instant::now());
        Ok(())
    }

    /// Inserts `text` at a character offset.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<Damage> {
        let edit = self.buffer.insert(offset, text);
        self.after_edit(&edit)
    }

    /// Removes the characters in `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) -> Result<Damage> {
        let edit = self.buffer.remove(start, end);
        if edit.len == 0 {
            let line = edit.start_line;
            return Ok(Damage::new(line, line));
        }
        self.after_edit(&edit)
    }

    fn after_edit(&mut self, edit: &BufferEdit) -> Result<Damage> {
        self.modified = true;
        self.folds.adjust_for_edit(edit);
        self.parsers.restart(Instant::now());
        self.highlighter.on_edit(&self.buffer, edit)
    }

    /// Tokens of `line`, generated on demand.
    pub fn token_sequence_for_line(&self, line: usize) -> Result<TokenSequence> {
        self.highlighter.token_sequence_for_line(&self.buffer, line)
    }

    /// Matches the bracket at `offset`.
    pub fn match_bracket(&self, offset: usize) -> Result<Option<BracketMatch>> {
        self.matcher().match_bracket(offset)
    }

    /// Matches the bracket before the caret, then after it.
    pub fn match_near_caret(&self, caret: usize) -> Result<Option<BracketMatch>> {
        self.matcher().match_near_caret(caret)
    }

    fn matcher(&self) -> BracketMatcher<'_> {
        BracketMatcher::new(&self.buffer, &self.highlighter, &self.folds)
    }

    /// Recomputes fold regions from the current tokens.
    pub fn detect_folds(&mut self) -> Result<()> {
        self.folds.detect_brace_folds(&self.buffer, &self.highlighter)
    }

    /// Registers a background parser.
    pub fn register_parser(&mut self, parser: Box<dyn BackgroundParser>) {
        self.parsers.register(parser);
        self.parsers.restart(Instant::now());
    }

    /// Runs background parsers if the idle delay has elapsed.
    pub fn poll_parsers(&mut self, now: Instant) -> usize {
        let snapshot = DocumentSnapshot::new(&self.buffer, &self.highlighter);
        self.parsers.poll(now, &snapshot)
    }

    /// Runs every background parser now.
    pub fn run_parsers(&mut self) -> usize {
        self.parsers.cancel();
        let snapshot = DocumentSnapshot::new(&self.buffer, &self.highlighter);
        self.parsers.run_all(&snapshot)
    }

    /// Lines that need repainting since the last call.
    pub fn take_damage(&mut self) -> Option<Damage> {
        self.highlighter.take_damage()
    }

    /// Checks the state cache against a full pass, repairing on mismatch.
    pub fn verify(&mut self) -> Result<bool> {
        self.highlighter.verify(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::TokenErrorParser;
    use crate::syntax::TokenKind;
    use std::time::Duration;

    fn java(text: &str) -> Document {
        let config = EngineConfig {
            default_language: "text/java".to_string(),
            parser_delay_ms: 500,
            ..EngineConfig::default()
        };
        Document::from_str(text, config)
    }

    #[test]
    fn test_default_language_from_config() {
        let doc = java("int x;");
        assert_eq!(doc.language_id(), "text/java");
        assert!(!doc.is_modified());
        assert!(doc.file_path().is_none());
    }

    #[test]
    fn test_unknown_default_falls_back() {
        let config = EngineConfig {
            default_language: "text/cobol".to_string(),
            ..EngineConfig::default()
        };
        let doc = Document::from_str("x", config);
        assert_eq!(doc.language_id(), "text/plain");
    }

    #[test]
    fn test_edit_updates_tokens() {
        let mut doc = java("a\nb\nc");
        doc.take_damage();
        let damage = doc.insert(0, "/*").unwrap();
        assert_eq!(damage, Damage::new(0, 2));
        assert!(doc.is_modified());
        let seq = doc.token_sequence_for_line(2).unwrap();
        assert_eq!(seq.tokens()[0].kind, TokenKind::CommentMultiline);

        doc.remove(0, 2).unwrap();
        let seq = doc.token_sequence_for_line(2).unwrap();
        assert_eq!(seq.tokens()[0].kind, TokenKind::Identifier);
        assert!(doc.verify().unwrap());
    }

    #[test]
    fn test_brackets_respect_folds() {
        let mut doc = java("void f() {\n  x();\n}");
        doc.detect_folds().unwrap();
        assert_eq!(doc.match_bracket(9).unwrap().map(|m| m.target), Some(18));
        doc.folds_mut().toggle_fold_at_line(0);
        assert_eq!(doc.match_bracket(9).unwrap(), None);
        assert_eq!(doc.match_near_caret(8).unwrap().map(|m| m.target), Some(6));
    }

    #[test]
    fn test_parsers_run_after_delay() {
        let mut doc = java("char c = 'ab';");
        doc.register_parser(Box::new(TokenErrorParser));
        assert_eq!(doc.poll_parsers(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(2);
        assert_eq!(doc.poll_parsers(later), 1);
        assert_eq!(
            doc.parsers().notices("token-errors").map(|n| n.len()),
            Some(1)
        );
    }

    #[test]
    fn test_open_file_detects_language() {
        let path = std::env::temp_dir().join(format!("cp_lexer_doc_{}.rs", std::process::id()));
        std::fs::write(&path, "fn main() {}\n").unwrap();
        let doc = Document::open_file(&path, EngineConfig::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(doc.language_id(), "text/rust");
        assert_eq!(doc.buffer().len_lines(), 2);
        assert_eq!(doc.file_path(), Some(path.as_path()));
    }
}
