//! The contract every language scanner implements.
//!
//! A scanner sees one line at a time (without its newline) together with the
//! state left behind by the previous line. Both operations must be pure
//! functions of their inputs: the driver calls them repeatedly while
//! stabilizing the state cache and relies on getting the same answer.

use super::token::{TokenKind, TokenSequence, TokenSequenceBuilder};

/// Lexer state carried across a line boundary.
///
/// The meaning of each value is private to the scanner that produced it;
/// only [`LexState::NEUTRAL`] is shared by all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct LexState(pub u32);

impl LexState {
    /// State before the first line of every document.
    pub const NEUTRAL: LexState = LexState(0);
}

impl std::fmt::Display for LexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Line comment delimiters of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineComment {
    pub start: &'static str,
    /// Closing delimiter for languages whose "line comment" must be closed
    /// on the same line (markup).
    pub end: Option<&'static str>,
}

/// Receives tokens while a scanner walks a line.
///
/// Scanners are written once against this trait; the full tokenizer feeds a
/// [`TokenSequenceBuilder`] and the state-only pass feeds [`StateOnly`], so
/// both operations share one code path and always agree on the end state.
pub trait TokenSink {
    /// Records a token of the given embedded language.
    fn push_embedded(&mut self, kind: TokenKind, start: usize, end: usize, language_index: u8);

    /// Records a primary-language token.
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.push_embedded(kind, start, end, 0);
    }
}

impl TokenSink for TokenSequenceBuilder {
    fn push_embedded(&mut self, kind: TokenKind, start: usize, end: usize, language_index: u8) {
        TokenSequenceBuilder::push_embedded(self, kind, start, end, language_index);
    }
}

/// A sink that discards tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct StateOnly;

impl TokenSink for StateOnly {
    fn push_embedded(&mut self, _kind: TokenKind, _start: usize, _end: usize, _language: u8) {}
}

/// Re-tags every token passed through it with an embedded language index.
pub struct EmbeddedSink<'a> {
    inner: &'a mut dyn TokenSink,
    language_index: u8,
}

impl<'a> EmbeddedSink<'a> {
    pub fn new(inner: &'a mut dyn TokenSink, language_index: u8) -> Self {
        Self {
            inner,
            language_index,
        }
    }
}

impl TokenSink for EmbeddedSink<'_> {
    fn push_embedded(&mut self, kind: TokenKind, start: usize, end: usize, _language_index: u8) {
        self.inner
            .push_embedded(kind, start, end, self.language_index);
    }
}

/// A language-specific scanner.
pub trait Lexer: Send + Sync {
    /// Human-readable name (e.g., "Java").
    fn name(&self) -> &'static str;

    /// Tokenizes one line starting from `initial`.
    ///
    /// `line_start` is the document offset of the line's first character.
    /// The result covers the whole line and ends with the sentinel.
    fn tokenize(&self, line: &[char], initial: LexState, line_start: usize) -> TokenSequence;

    /// Returns only the state in effect after the line.
    ///
    /// Must equal `tokenize(line, initial, _).end_state()`.
    fn last_state_of_line(&self, line: &[char], initial: LexState) -> LexState {
        self.tokenize(line, initial, 0).end_state()
    }

    /// Whether `c` belongs to a word for identifier and template purposes.
    fn is_word_char(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// Whether the language delimits blocks with curly braces.
    fn uses_curly_braces(&self) -> bool {
        false
    }

    /// Line comment delimiters, if the language has them.
    fn line_comment(&self) -> Option<LineComment> {
        None
    }
}

/// Tokenizes a line, scanning at most `cap` characters.
///
/// Characters past the cap are reported as a single error token so callers
/// still receive a well-formed sequence.
pub fn tokenize_capped(
    lexer: &dyn Lexer,
    line: &[char],
    initial: LexState,
    line_start: usize,
    cap: usize,
) -> TokenSequence {
    if line.len() <= cap {
        return lexer.tokenize(line, initial, line_start);
    }

    log::debug!(
        "line at offset {} has {} chars, scanning only the first {}",
        line_start,
        line.len(),
        cap
    );
    let head = lexer.tokenize(&line[..cap], initial, line_start);
    let mut builder = TokenSequenceBuilder::new(line_start);
    for token in head.tokens() {
        builder.push_embedded(
            token.kind,
            token.start,
            token.start + token.len,
            token.language_index,
        );
    }
    builder.push(TokenKind::ErrorIdentifier, cap, line.len());
    builder.finish(line.len(), head.end_state())
}

/// State-only counterpart of [`tokenize_capped`].
pub fn last_state_capped(
    lexer: &dyn Lexer,
    line: &[char],
    initial: LexState,
    cap: usize,
) -> LexState {
    let end = line.len().min(cap);
    lexer.last_state_of_line(&line[..end], initial)
}
