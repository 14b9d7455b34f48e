//! Token model.
//!
//! A line's tokens are stored as an owned, index-addressed sequence. The
//! element after index `i` plays the role of the "next" link, and the last
//! element is always a [`TokenKind::Null`] sentinel that marks the end of the
//! line's paintable content.

use super::lexer::LexState;

/// Lexical categories produced by scanners.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    /// Sentinel terminating a line's sequence. Never used for real text.
    Null = 0,

    // Comments
    CommentEol,
    CommentMultiline,
    CommentDocumentation,
    /// Marker words such as `TODO` inside comments.
    CommentKeyword,

    // Words
    ReservedWord,
    ReservedWord2,
    Function,
    DataType,
    Identifier,
    Annotation,
    Preprocessor,

    // Literals
    LiteralBoolean,
    LiteralNumberDecimalInt,
    LiteralNumberFloat,
    LiteralNumberHexadecimal,
    LiteralStringDoubleQuote,
    LiteralChar,
    LiteralBacktick,
    /// A `/pattern/flags` regular expression.
    LiteralRegex,

    // Punctuation
    Operator,
    Separator,
    Whitespace,

    // Markup
    MarkupTagDelimiter,
    MarkupTagName,
    MarkupTagAttribute,
    MarkupTagAttributeValue,
    MarkupComment,
    MarkupEntityReference,
    MarkupProcessingInstruction,

    // Errors
    ErrorIdentifier,
    ErrorNumberFormat,
    ErrorString,
    ErrorChar,
}

/// Name table used for configuration and diagnostics.
const KIND_NAMES: &[(TokenKind, &str)] = &[
    (TokenKind::Null, "null"),
    (TokenKind::CommentEol, "comment_eol"),
    (TokenKind::CommentMultiline, "comment_multiline"),
    (TokenKind::CommentDocumentation, "comment_documentation"),
    (TokenKind::CommentKeyword, "comment_keyword"),
    (TokenKind::ReservedWord, "reserved_word"),
    (TokenKind::ReservedWord2, "reserved_word_2"),
    (TokenKind::Function, "function"),
    (TokenKind::DataType, "data_type"),
    (TokenKind::Identifier, "identifier"),
    (TokenKind::Annotation, "annotation"),
    (TokenKind::Preprocessor, "preprocessor"),
    (TokenKind::LiteralBoolean, "literal_boolean"),
    (TokenKind::LiteralNumberDecimalInt, "literal_number_decimal_int"),
    (TokenKind::LiteralNumberFloat, "literal_number_float"),
    (TokenKind::LiteralNumberHexadecimal, "literal_number_hexadecimal"),
    (TokenKind::LiteralStringDoubleQuote, "literal_string_double_quote"),
    (TokenKind::LiteralChar, "literal_char"),
    (TokenKind::LiteralBacktick, "literal_backtick"),
    (TokenKind::LiteralRegex, "literal_regex"),
    (TokenKind::Operator, "operator"),
    (TokenKind::Separator, "separator"),
    (TokenKind::Whitespace, "whitespace"),
    (TokenKind::MarkupTagDelimiter, "markup_tag_delimiter"),
    (TokenKind::MarkupTagName, "markup_tag_name"),
    (TokenKind::MarkupTagAttribute, "markup_tag_attribute"),
    (TokenKind::MarkupTagAttributeValue, "markup_tag_attribute_value"),
    (TokenKind::MarkupComment, "markup_comment"),
    (TokenKind::MarkupEntityReference, "markup_entity_reference"),
    (TokenKind::MarkupProcessingInstruction, "markup_processing_instruction"),
    (TokenKind::ErrorIdentifier, "error_identifier"),
    (TokenKind::ErrorNumberFormat, "error_number_format"),
    (TokenKind::ErrorString, "error_string"),
    (TokenKind::ErrorChar, "error_char"),
];

impl TokenKind {
    /// Every kind, in value order.
    pub const ALL: [TokenKind; 34] = [
        TokenKind::Null,
        TokenKind::CommentEol,
        TokenKind::CommentMultiline,
        TokenKind::CommentDocumentation,
        TokenKind::CommentKeyword,
        TokenKind::ReservedWord,
        TokenKind::ReservedWord2,
        TokenKind::Function,
        TokenKind::DataType,
        TokenKind::Identifier,
        TokenKind::Annotation,
        TokenKind::Preprocessor,
        TokenKind::LiteralBoolean,
        TokenKind::LiteralNumberDecimalInt,
        TokenKind::LiteralNumberFloat,
        TokenKind::LiteralNumberHexadecimal,
        TokenKind::LiteralStringDoubleQuote,
        TokenKind::LiteralChar,
        TokenKind::LiteralBacktick,
        TokenKind::LiteralRegex,
        TokenKind::Operator,
        TokenKind::Separator,
        TokenKind::Whitespace,
        TokenKind::MarkupTagDelimiter,
        TokenKind::MarkupTagName,
        TokenKind::MarkupTagAttribute,
        TokenKind::MarkupTagAttributeValue,
        TokenKind::MarkupComment,
        TokenKind::MarkupEntityReference,
        TokenKind::MarkupProcessingInstruction,
        TokenKind::ErrorIdentifier,
        TokenKind::ErrorNumberFormat,
        TokenKind::ErrorString,
        TokenKind::ErrorChar,
    ];

    /// Returns the stable name of this kind.
    pub fn name(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("null")
    }

    /// Looks up a kind by its stable name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        KIND_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(kind, _)| *kind)
    }

    /// Returns the numeric value of this kind.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Whether this kind is any comment variant.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            Self::CommentEol
                | Self::CommentMultiline
                | Self::CommentDocumentation
                | Self::CommentKeyword
                | Self::MarkupComment
        )
    }

    /// Whether this kind is a string, character or template literal.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            Self::LiteralStringDoubleQuote
                | Self::LiteralChar
                | Self::LiteralBacktick
                | Self::LiteralRegex
                | Self::MarkupTagAttributeValue
                | Self::ErrorString
                | Self::ErrorChar
        )
    }

    /// Whether this kind reports a lexical error.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::ErrorIdentifier | Self::ErrorNumberFormat | Self::ErrorString | Self::ErrorChar
        )
    }

    /// Whether this kind carries text (everything except the sentinel).
    pub fn is_paintable(self) -> bool {
        self != Self::Null
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One classified span of a line.
///
/// `start` and `len` index into the line's character buffer and are only
/// meaningful for the snapshot the token was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Start index into the line's characters.
    pub start: usize,
    /// Length in characters.
    pub len: usize,
    /// Absolute start position in the document.
    pub doc_offset: usize,
    /// 0 for the primary language, >0 for an embedded one.
    pub language_index: u8,
    /// Set by the hyperlink pass, never by scanners.
    pub is_hyperlink: bool,
}

impl Token {
    /// Creates a token for the primary language.
    pub fn new(kind: TokenKind, start: usize, len: usize, doc_offset: usize) -> Self {
        Self {
            kind,
            start,
            len,
            doc_offset,
            language_index: 0,
            is_hyperlink: false,
        }
    }

    /// Absolute end position (exclusive).
    pub fn end_offset(&self) -> usize {
        self.doc_offset + self.len
    }

    /// Whether the document position falls inside this token.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.doc_offset && offset < self.end_offset()
    }

    /// Whether this token is exactly one character long.
    pub fn is_single_char(&self) -> bool {
        self.len == 1
    }

    /// Whether this is the terminating sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.kind == TokenKind::Null
    }

    /// The token's characters within the line it was produced from.
    pub fn text<'a>(&self, line: &'a [char]) -> &'a [char] {
        let start = self.start.min(line.len());
        let end = (self.start + self.len).min(line.len());
        &line[start..end]
    }

    /// The token's text as an owned string.
    pub fn text_string(&self, line: &[char]) -> String {
        self.text(line).iter().collect()
    }
}

/// The tokens of one line, terminated by a sentinel, plus the lexer state in
/// effect after the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
    end_state: LexState,
}

impl TokenSequence {
    /// Real tokens, excluding the sentinel.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens[..self.tokens.len() - 1]
    }

    /// All tokens including the trailing sentinel.
    pub fn all(&self) -> &[Token] {
        &self.tokens
    }

    /// The terminating sentinel.
    pub fn sentinel(&self) -> &Token {
        &self.tokens[self.tokens.len() - 1]
    }

    /// The token linked after `index`, if any.
    pub fn next(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index + 1)
    }

    /// Number of real tokens.
    pub fn len(&self) -> usize {
        self.tokens.len() - 1
    }

    /// Whether the line produced no real tokens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lexer state in effect after this line.
    pub fn end_state(&self) -> LexState {
        self.end_state
    }

    /// Document offset where the line starts.
    pub fn start_offset(&self) -> usize {
        self.tokens[0].doc_offset
    }

    /// Document offset of the line end (the sentinel's offset).
    pub fn end_offset(&self) -> usize {
        self.sentinel().doc_offset
    }

    /// Iterates over real tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens().iter()
    }

    /// Finds the token covering a document position.
    pub fn token_at_offset(&self, offset: usize) -> Option<&Token> {
        let tokens = self.tokens();
        let idx = tokens.partition_point(|t| t.end_offset() <= offset);
        tokens.get(idx).filter(|t| t.contains_offset(offset))
    }

    /// Text of the token at `index` within `line`.
    pub fn text_of(&self, index: usize, line: &[char]) -> String {
        self.tokens
            .get(index)
            .map(|t| t.text_string(line))
            .unwrap_or_default()
    }

    /// Checks the sequence invariants for a line of `line_len` characters.
    pub fn validate(&self, line_len: usize) -> Result<(), String> {
        let start = self.start_offset();
        let mut expected_start = 0;
        let mut expected_offset = start;
        for (i, token) in self.tokens().iter().enumerate() {
            if token.kind == TokenKind::Null {
                return Err(format!("token {} has the sentinel kind", i));
            }
            if token.len == 0 {
                return Err(format!("token {} is empty", i));
            }
            if token.start != expected_start || token.doc_offset != expected_offset {
                return Err(format!(
                    "token {} starts at {} (offset {}), expected {} (offset {})",
                    i, token.start, token.doc_offset, expected_start, expected_offset
                ));
            }
            expected_start += token.len;
            expected_offset += token.len;
        }
        if expected_start != line_len {
            return Err(format!(
                "tokens cover {} of {} characters",
                expected_start, line_len
            ));
        }
        let sentinel = self.sentinel();
        if sentinel.kind != TokenKind::Null || sentinel.doc_offset != start + line_len {
            return Err("sentinel missing or misplaced".to_string());
        }
        Ok(())
    }

    /// Replaces the real tokens, keeping the sentinel and end state.
    pub(crate) fn replace_tokens(&mut self, tokens: Vec<Token>) {
        let sentinel = *self.sentinel();
        self.tokens = tokens;
        self.tokens.push(sentinel);
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Accumulates tokens for one line.
///
/// Positions passed to the builder are line-relative character indices; the
/// builder derives document offsets from the line start.
#[derive(Debug)]
pub struct TokenSequenceBuilder {
    line_start: usize,
    tokens: Vec<Token>,
}

impl TokenSequenceBuilder {
    /// Starts a sequence for a line beginning at `line_start`.
    pub fn new(line_start: usize) -> Self {
        Self {
            line_start,
            tokens: Vec::new(),
        }
    }

    /// Adds a primary-language token covering `start..end`.
    pub fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.push_embedded(kind, start, end, 0);
    }

    /// Adds a token belonging to language `language_index`.
    pub fn push_embedded(&mut self, kind: TokenKind, start: usize, end: usize, language_index: u8) {
        if end <= start {
            return;
        }
        debug_assert!(
            kind != TokenKind::Null,
            "scanners never emit the sentinel kind"
        );
        let mut token = Token::new(kind, start, end - start, self.line_start + start);
        token.language_index = language_index;
        self.tokens.push(token);
    }

    /// Appends tokens produced by another builder for the same line.
    pub fn extend(&mut self, other: TokenSequenceBuilder) {
        self.tokens.extend(other.tokens);
    }

    /// Line-relative end of the last token pushed so far.
    pub fn covered(&self) -> usize {
        self.tokens.last().map(|t| t.start + t.len).unwrap_or(0)
    }

    /// Terminates the sequence with the sentinel at `line_len`.
    pub fn finish(mut self, line_len: usize, end_state: LexState) -> TokenSequence {
        self.tokens.push(Token::new(
            TokenKind::Null,
            line_len,
            0,
            self.line_start + line_len,
        ));
        TokenSequence {
            tokens: self.tokens,
            end_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_name_table_round_trips_every_kind() {
        for kind in TokenKind::ALL {
            assert_eq!(TokenKind::from_name(kind.name()), Some(kind));
            assert_eq!(TokenKind::from_value(kind.value()), Some(kind));
        }
        assert_eq!(
            TokenKind::from_name("SEPARATOR"),
            Some(TokenKind::Separator)
        );
        assert_eq!(TokenKind::from_name("nonsense"), None);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(TokenKind::CommentDocumentation.is_comment());
        assert!(TokenKind::LiteralChar.is_string_like());
        assert!(TokenKind::ErrorString.is_error());
        assert!(!TokenKind::Null.is_paintable());
        assert!(TokenKind::Separator.is_paintable());
    }

    #[test]
    fn test_builder_and_sentinel() {
        let line = chars("a {");
        let mut builder = TokenSequenceBuilder::new(10);
        builder.push(TokenKind::Identifier, 0, 1);
        builder.push(TokenKind::Whitespace, 1, 2);
        builder.push(TokenKind::Separator, 2, 3);
        let seq = builder.finish(line.len(), LexState::NEUTRAL);

        assert_eq!(seq.len(), 3);
        assert_eq!(seq.start_offset(), 10);
        assert_eq!(seq.end_offset(), 13);
        assert!(seq.sentinel().is_sentinel());
        assert_eq!(seq.next(1).map(|t| t.kind), Some(TokenKind::Separator));
        assert_eq!(seq.text_of(2, &line), "{");
        assert!(seq.validate(line.len()).is_ok());
    }

    #[test]
    fn test_empty_line_is_only_sentinel() {
        let seq = TokenSequenceBuilder::new(4).finish(0, LexState::NEUTRAL);
        assert!(seq.is_empty());
        assert_eq!(seq.end_offset(), 4);
        assert!(seq.validate(0).is_ok());
    }

    #[test]
    fn test_token_at_offset() {
        let mut builder = TokenSequenceBuilder::new(5);
        builder.push(TokenKind::Identifier, 0, 3);
        builder.push(TokenKind::Separator, 3, 4);
        let seq = builder.finish(4, LexState::NEUTRAL);

        assert_eq!(
            seq.token_at_offset(5).map(|t| t.kind),
            Some(TokenKind::Identifier)
        );
        assert_eq!(
            seq.token_at_offset(8).map(|t| t.kind),
            Some(TokenKind::Separator)
        );
        assert!(seq.token_at_offset(9).is_none());
        assert!(seq.token_at_offset(4).is_none());
    }

    #[test]
    fn test_validate_detects_gap() {
        let mut builder = TokenSequenceBuilder::new(0);
        builder.push(TokenKind::Identifier, 0, 2);
        builder.push(TokenKind::Identifier, 3, 4);
        let seq = builder.finish(4, LexState::NEUTRAL);
        assert!(seq.validate(4).is_err());
    }
}
