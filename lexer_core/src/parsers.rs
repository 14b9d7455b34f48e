//! Background parser scheduling.
//!
//! Parsers (spell checkers, compilers, linters) run once the document has been
//! idle for the configured delay. Every edit pushes the deadline back, so
//! passes never overlap or queue up. A parser reads a snapshot of the fully
//! retokenized document and never writes to the token state.

use crate::buffer::LineSource;
use crate::error::Result;
use crate::syntax::{SyntaxHighlighter, TokenSequence};
use std::time::{Duration, Instant};

/// Severity of a parser finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoticeLevel {
    Error,
    Warning,
    Information,
    Hint,
}

/// A finding reported by a background parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNotice {
    /// Line of the finding (0-indexed).
    pub line: usize,
    /// Document offset where the finding starts.
    pub offset: usize,
    /// Length in characters.
    pub len: usize,
    pub level: NoticeLevel,
    pub message: String,
}

impl ParseNotice {
    pub fn new(
        line: usize,
        offset: usize,
        len: usize,
        level: NoticeLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            offset,
            len,
            level,
            message: message.into(),
        }
    }

    /// Returns true if the notice covers the given document offset.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.offset + self.len.max(1)
    }
}

/// Read-only view of the whole document handed to parsers.
pub struct DocumentSnapshot<'a> {
    source: &'a dyn LineSource,
    highlighter: &'a SyntaxHighlighter,
}

impl<'a> DocumentSnapshot<'a> {
    pub fn new(source: &'a dyn LineSource, highlighter: &'a SyntaxHighlighter) -> Self {
        Self { source, highlighter }
    }

    pub fn revision(&self) -> u64 {
        self.source.revision()
    }

    pub fn language_id(&self) -> &str {
        self.highlighter.language_id()
    }

    pub fn line_count(&self) -> usize {
        self.source.line_count()
    }

    pub fn line_start(&self, line: usize) -> usize {
        self.source.line_start(line)
    }

    /// Tokens of `line`.
    pub fn tokens(&self, line: usize) -> Result<TokenSequence> {
        self.highlighter.token_sequence_for_line(self.source, line)
    }
}

/// A parser run on the idle timer.
pub trait BackgroundParser {
    /// Name used to key the parser's notices.
    fn name(&self) -> &str;

    /// Whether the parser applies to a language.
    fn supports(&self, _language_id: &str) -> bool {
        true
    }

    /// Parses the whole document.
    fn parse(&mut self, snapshot: &DocumentSnapshot<'_>) -> Result<Vec<ParseNotice>>;
}

struct ParserEntry {
    parser: Box<dyn BackgroundParser>,
    notices: Vec<ParseNotice>,
    /// Revision of the last completed pass.
    parsed_revision: Option<u64>,
}

/// Debounces background parser runs.
pub struct ParserScheduler {
    parsers: Vec<ParserEntry>,
    delay: Duration,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for ParserScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.parsers.iter().map(|e| e.parser.name()).collect();
        f.debug_struct("ParserScheduler")
            .field("parsers", &names)
            .field("delay", &self.delay)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ParserScheduler {
    /// Creates a scheduler that waits `delay` after the last edit.
    pub fn new(delay: Duration) -> Self {
        Self {
            parsers: Vec::new(),
            delay,
            deadline: None,
        }
    }

    /// Registers a parser. It runs at the next deadline.
    pub fn register(&mut self, parser: Box<dyn BackgroundParser>) {
        log::debug!("Registered background parser {}", parser.name());
        self.parsers.push(ParserEntry {
            parser,
            notices: Vec::new(),
            parsed_revision: None,
        });
    }

    /// Number of registered parsers.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// When the pending pass becomes due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Restarts the idle timer. Called on every edit.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drops the pending pass.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Runs every applicable parser once if the deadline has passed.
    /// Returns the number of parsers run.
    pub fn poll(&mut self, now: Instant, snapshot: &DocumentSnapshot<'_>) -> usize {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return 0,
        }
        self.deadline = None;
        self.run_all(snapshot)
    }

    /// Runs every applicable parser immediately.
    pub fn run_all(&mut self, snapshot: &DocumentSnapshot<'_>) -> usize {
        let language_id = snapshot.language_id().to_string();
        let mut ran = 0;
        for entry in &mut self.parsers {
            if !entry.parser.supports(&language_id) {
                entry.notices.clear();
                continue;
            }
            match entry.parser.parse(snapshot) {
                Ok(notices) => {
                    log::debug!(
                        "Parser {} reported {} notice(s) at revision {}",
                        entry.parser.name(),
                        notices.len(),
                        snapshot.revision()
                    );
                    entry.notices = notices;
                    entry.parsed_revision = Some(snapshot.revision());
                }
                Err(err) => {
                    log::warn!("Parser {} failed: {}", entry.parser.name(), err);
                    entry.notices.clear();
                }
            }
            ran += 1;
        }
        ran
    }

    /// Notices from the named parser's last pass.
    pub fn notices(&self, name: &str) -> Option<&[ParseNotice]> {
        self.entry(name).map(|e| e.notices.as_slice())
    }

    /// Revision the named parser last completed a pass on.
    pub fn parsed_revision(&self, name: &str) -> Option<u64> {
        self.entry(name).and_then(|e| e.parsed_revision)
    }

    /// All notices, tagged with the parser name.
    pub fn all_notices(&self) -> impl Iterator<Item = (&str, &ParseNotice)> {
        self.parsers
            .iter()
            .flat_map(|e| e.notices.iter().map(move |n| (e.parser.name(), n)))
    }

    fn entry(&self, name: &str) -> Option<&ParserEntry> {
        self.parsers.iter().find(|e| e.parser.name() == name)
    }
}

/// Reports every error-kind token the scanners produced.
#[derive(Debug, Default)]
pub struct TokenErrorParser;

impl BackgroundParser for TokenErrorParser {
    fn name(&self) -> &str {
        "token-errors"
    }

    fn parse(&mut self, snapshot: &DocumentSnapshot<'_>) -> Result<Vec<ParseNotice>> {
        let mut notices = Vec::new();
        for line in 0..snapshot.line_count() {
            let seq = snapshot.tokens(line)?;
            for token in seq.iter().filter(|t| t.kind.is_error()) {
                notices.push(ParseNotice::new(
                    line,
                    token.doc_offset,
                    token.len,
                    NoticeLevel::Error,
                    format!("invalid {}", token.kind),
                ));
            }
        }
        Ok(notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::error::LexerError;

    struct Counting {
        runs: usize,
    }

    impl BackgroundParser for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn supports(&self, language_id: &str) -> bool {
            language_id == "text/java"
        }

        fn parse(&mut self, snapshot: &DocumentSnapshot<'_>) -> Result<Vec<ParseNotice>> {
            self.runs += 1;
            Ok(vec![ParseNotice::new(
                0,
                0,
                snapshot.line_count(),
                NoticeLevel::Hint,
                format!("run {}", self.runs),
            )])
        }
    }

    struct Failing;

    impl BackgroundParser for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn parse(&mut self, _snapshot: &DocumentSnapshot<'_>) -> Result<Vec<ParseNotice>> {
            Err(LexerError::UnknownLanguage("none".into()))
        }
    }

    fn java(text: &str) -> (TextBuffer, SyntaxHighlighter) {
        let buffer = TextBuffer::from_str(text);
        let mut highlighter = SyntaxHighlighter::default();
        highlighter.set_language("text/java", &buffer).unwrap();
        (buffer, highlighter)
    }

    #[test]
    fn test_debounce() {
        let (buffer, highlighter) = java("a\nb");
        let snapshot = DocumentSnapshot::new(&buffer, &highlighter);
        let mut scheduler = ParserScheduler::new(Duration::from_millis(100));
        scheduler.register(Box::new(Counting { runs: 0 }));

        let start = Instant::now();
        assert_eq!(scheduler.poll(start, &snapshot), 0);

        scheduler.restart(start);
        assert_eq!(
            scheduler.poll(start + Duration::from_millis(50), &snapshot),
            0
        );
        // A second edit pushes the deadline back.
        scheduler.restart(start + Duration::from_millis(60));
        assert_eq!(
            scheduler.poll(start + Duration::from_millis(120), &snapshot),
            0
        );
        assert_eq!(
            scheduler.poll(start + Duration::from_millis(160), &snapshot),
            1
        );
        assert!(scheduler.deadline().is_none());
        assert_eq!(
            scheduler.poll(start + Duration::from_millis(500), &snapshot),
            0
        );

        let notices = scheduler.notices("counting").unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "run 1");
        assert_eq!(notices[0].len, 2);
        assert_eq!(scheduler.parsed_revision("counting"), Some(0));
    }

    #[test]
    fn test_unsupported_language_is_skipped() {
        let buffer = TextBuffer::from_str("a");
        let highlighter = SyntaxHighlighter::default();
        let snapshot = DocumentSnapshot::new(&buffer, &highlighter);
        let mut scheduler = ParserScheduler::new(Duration::ZERO);
        scheduler.register(Box::new(Counting { runs: 0 }));
        assert_eq!(scheduler.run_all(&snapshot), 0);
        assert_eq!(scheduler.parsed_revision("counting"), None);
    }

    #[test]
    fn test_failing_parser_clears_notices() {
        let (buffer, highlighter) = java("a");
        let snapshot = DocumentSnapshot::new(&buffer, &highlighter);
        let mut scheduler = ParserScheduler::new(Duration::ZERO);
        scheduler.register(Box::new(Failing));
        assert_eq!(scheduler.run_all(&snapshot), 1);
        assert_eq!(scheduler.notices("failing"), Some(&[][..]));
        assert!(scheduler.notices("missing").is_none());
    }

    #[test]
    fn test_token_error_parser() {
        let (buffer, highlighter) = java("int a = 1;\nchar c = 'xy';\nint b;");
        let snapshot = DocumentSnapshot::new(&buffer, &highlighter);
        let mut scheduler = ParserScheduler::new(Duration::ZERO);
        scheduler.register(Box::new(TokenErrorParser));
        scheduler.run_all(&snapshot);

        let notices: Vec<_> = scheduler.all_notices().collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, "token-errors");
        assert_eq!(notices[0].1.line, 1);
        assert_eq!(notices[0].1.level, NoticeLevel::Error);
        assert!(notices[0].1.contains(notices[0].1.offset));
    }
}
