//! Scanner for C-family languages.
//!
//! One configurable scanner covers C, Java, JavaScript and Rust. Besides
//! neutral it carries these states across lines: inside a block comment,
//! inside a documentation comment, inside a double-quoted string, and inside
//! a backtick template string. Languages with nested block comments encode
//! the nesting depth in the state as well.
//!
//! JavaScript regular expression literals are recognised when a `/` follows
//! an operator, an opening bracket, a keyword such as `return`, or the start
//! of the scanned range. A `/` after an identifier or a closing bracket is
//! always division.

use std::ops::ControlFlow;

use crate::syntax::lexer::{LexState, Lexer, LineComment, StateOnly, TokenSink};
use crate::syntax::token::{TokenKind, TokenSequence, TokenSequenceBuilder};

/// Inside `/* ... */`.
pub const STATE_BLOCK_COMMENT: LexState = LexState(1);
/// Inside `/** ... */`.
pub const STATE_DOC_COMMENT: LexState = LexState(2);
/// Inside a `"` string that did not close on the previous line.
pub const STATE_STRING_CONTINUED: LexState = LexState(3);
/// Inside a backtick template string.
pub const STATE_BACKTICK: LexState = LexState(4);

/// Nested comment states are `NESTED_COMMENT_BASE + 2 * depth + doc`.
const NESTED_COMMENT_BASE: u32 = 8;
/// Deepest comment nesting tracked exactly; deeper levels saturate.
pub const MAX_COMMENT_DEPTH: u32 = 11;
const NESTED_COMMENT_MIN: u32 = NESTED_COMMENT_BASE + 4;
const NESTED_COMMENT_MAX: u32 = NESTED_COMMENT_BASE + 2 * MAX_COMMENT_DEPTH + 1;

/// Words after which a `/` starts a regular expression.
const REGEX_PREFIX_WORDS: &[&str] = &[
    "return", "typeof", "case", "else", "in", "of", "new", "delete", "void", "throw", "yield",
    "await",
];

/// Language-specific word lists and switches.
#[derive(Debug, Clone, Copy)]
pub struct CLikeConfig {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub control_keywords: &'static [&'static str],
    pub data_types: &'static [&'static str],
    /// `'x'` is a character literal rather than a string.
    pub char_literals: bool,
    /// `'a` introduces a lifetime/label instead of a character literal.
    pub lifetimes: bool,
    /// Backtick template strings that may span lines.
    pub backtick_strings: bool,
    /// `"` strings may span lines without a trailing backslash.
    pub multiline_strings: bool,
    /// `/*` inside a block comment opens another level.
    pub nested_comments: bool,
    /// `/pattern/flags` regular expression literals.
    pub regex_literals: bool,
    /// `#directive` at the start of a line.
    pub preprocessor: bool,
    /// Character introducing annotations (`@Override`, `#[derive]`).
    pub annotation_char: Option<char>,
    /// `$` may appear in identifiers.
    pub dollar_identifiers: bool,
}

/// A C-family scanner.
#[derive(Debug, Clone, Copy)]
pub struct CLikeLexer {
    config: CLikeConfig,
}

enum StringEnd {
    /// Closing quote found; index just past it.
    Closed(usize),
    /// Line ended with a backslash; the literal continues.
    Continued,
    /// Line ended without a closing quote.
    Unterminated,
}

/// State carried by a block comment still open `depth` levels deep.
fn comment_state(depth: u32, doc: bool) -> LexState {
    match depth {
        0 => LexState::NEUTRAL,
        1 if doc => STATE_DOC_COMMENT,
        1 => STATE_BLOCK_COMMENT,
        depth => {
            let depth = depth.min(MAX_COMMENT_DEPTH);
            LexState(NESTED_COMMENT_BASE + 2 * depth + u32::from(doc))
        }
    }
}

/// Depth and doc flag of an open block comment state.
fn open_comment(state: LexState) -> Option<(u32, bool)> {
    match state {
        STATE_BLOCK_COMMENT => Some((1, false)),
        STATE_DOC_COMMENT => Some((1, true)),
        LexState(s @ NESTED_COMMENT_MIN..=NESTED_COMMENT_MAX) => {
            Some(((s - NESTED_COMMENT_BASE) / 2, s % 2 == 1))
        }
        _ => None,
    }
}

fn comment_kind(doc: bool) -> TokenKind {
    if doc {
        TokenKind::CommentDocumentation
    } else {
        TokenKind::CommentMultiline
    }
}

impl CLikeLexer {
    pub const fn new(config: CLikeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CLikeConfig {
        &self.config
    }

    /// Scans `line[from..to]` starting in `initial`, feeding tokens to `sink`.
    ///
    /// Positions are indices into the whole line so that an embedding
    /// scanner can hand over a sub-range.
    pub fn scan_range(
        &self,
        line: &[char],
        from: usize,
        to: usize,
        initial: LexState,
        sink: &mut dyn TokenSink,
    ) -> LexState {
        let mut pos = from;

        if let Some((depth, doc)) = open_comment(initial) {
            match self.scan_comment(line, pos, to, depth) {
                ControlFlow::Continue(end) => {
                    sink.push(comment_kind(doc), pos, end);
                    pos = end;
                }
                ControlFlow::Break(depth) => {
                    sink.push(comment_kind(doc), pos, to);
                    return comment_state(depth, doc);
                }
            }
        } else if initial == STATE_STRING_CONTINUED {
            match self.scan_string(line, pos, pos, to, sink) {
                ControlFlow::Continue(end) => pos = end,
                ControlFlow::Break(state) => return state,
            }
        } else if initial == STATE_BACKTICK && self.config.backtick_strings {
            match scan_quoted(line, pos, to, '`', false) {
                StringEnd::Closed(end) => {
                    sink.push(TokenKind::LiteralBacktick, pos, end);
                    pos = end;
                }
                _ => {
                    sink.push(TokenKind::LiteralBacktick, pos, to);
                    return STATE_BACKTICK;
                }
            }
        }

        while pos < to {
            let c = line[pos];
            let next = peek(line, pos + 1, to);

            if c.is_whitespace() {
                let end = run(line, pos, to, |c| c.is_whitespace());
                sink.push(TokenKind::Whitespace, pos, end);
                pos = end;
                continue;
            }

            if c == '/' && next == Some('/') {
                sink.push(TokenKind::CommentEol, pos, to);
                return LexState::NEUTRAL;
            }

            if c == '/' && next == Some('*') {
                let doc =
                    peek(line, pos + 2, to) == Some('*') && peek(line, pos + 3, to) != Some('/');
                match self.scan_comment(line, pos + 2, to, 1) {
                    ControlFlow::Continue(end) => {
                        sink.push(comment_kind(doc), pos, end);
                        pos = end;
                        continue;
                    }
                    ControlFlow::Break(depth) => {
                        sink.push(comment_kind(doc), pos, to);
                        return comment_state(depth, doc);
                    }
                }
            }

            if c == '/' && self.config.regex_literals && regex_allowed(line, from, pos) {
                if let Some(end) = scan_regex(line, pos, to) {
                    let end = run(line, end, to, |c| c.is_ascii_alphabetic());
                    sink.push(TokenKind::LiteralRegex, pos, end);
                    pos = end;
                    continue;
                }
            }

            if c == '"' {
                match self.scan_string(line, pos, pos + 1, to, sink) {
                    ControlFlow::Continue(end) => {
                        pos = end;
                        continue;
                    }
                    ControlFlow::Break(state) => return state,
                }
            }

            if c == '`' && self.config.backtick_strings {
                match scan_quoted(line, pos + 1, to, '`', false) {
                    StringEnd::Closed(end) => {
                        sink.push(TokenKind::LiteralBacktick, pos, end);
                        pos = end;
                        continue;
                    }
                    _ => {
                        sink.push(TokenKind::LiteralBacktick, pos, to);
                        return STATE_BACKTICK;
                    }
                }
            }

            if c == '\'' {
                pos = self.scan_single_quote(line, pos, to, sink);
                continue;
            }

            if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
                let (kind, end) = scan_number(line, pos, to, |c| self.is_word_char(c));
                sink.push(kind, pos, end);
                pos = end;
                continue;
            }

            if self.is_word_start(c) {
                let end = run(line, pos, to, |c| self.is_word_char(c));
                let kind = self.classify_word(&line[pos..end], peek(line, end, to));
                sink.push(kind, pos, end);
                pos = end;
                continue;
            }

            if c == '#'
                && self.config.preprocessor
                && line[from..pos].iter().all(|c| c.is_whitespace())
            {
                let word_end = run(line, pos + 1, to, |c| c.is_alphanumeric() || c == '_');
                sink.push(TokenKind::Preprocessor, pos, word_end);
                pos = word_end;
                continue;
            }

            if Some(c) == self.config.annotation_char {
                let end = run(line, pos + 1, to, |c| self.is_word_char(c));
                sink.push(TokenKind::Annotation, pos, end);
                pos = end;
                continue;
            }

            if matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ';' | ',') {
                sink.push(TokenKind::Separator, pos, pos + 1);
                pos += 1;
                continue;
            }

            if is_operator_char(c) {
                let mut end = pos;
                while end < to && is_operator_char(line[end]) {
                    let opens_comment = matches!(peek(line, end + 1, to), Some('/' | '*'));
                    if end > pos && line[end] == '/' && opens_comment {
                        break;
                    }
                    end += 1;
                }
                sink.push(TokenKind::Operator, pos, end);
                pos = end;
                continue;
            }

            // Stray character: report it and keep going.
            sink.push(TokenKind::ErrorIdentifier, pos, pos + 1);
            pos += 1;
        }

        LexState::NEUTRAL
    }

    /// Scans a block comment body from `from`, `depth` levels deep.
    ///
    /// Continues with the index just past the closing `*/`, or breaks with
    /// the depth still open at `to`.
    fn scan_comment(
        &self,
        line: &[char],
        from: usize,
        to: usize,
        mut depth: u32,
    ) -> ControlFlow<u32, usize> {
        if !self.config.nested_comments {
            return match find(line, from, to, &['*', '/']) {
                Some(i) => ControlFlow::Continue(i + 2),
                None => ControlFlow::Break(depth),
            };
        }
        let mut pos = from;
        while pos + 1 < to {
            match (line[pos], line[pos + 1]) {
                ('*', '/') => {
                    depth -= 1;
                    pos += 2;
                    if depth == 0 {
                        return ControlFlow::Continue(pos);
                    }
                }
                ('/', '*') => {
                    depth += 1;
                    pos += 2;
                }
                _ => pos += 1,
            }
        }
        ControlFlow::Break(depth)
    }

    /// Scans a `"` literal whose token starts at `start` and whose body
    /// starts at `from`.
    ///
    /// Continues at the index after the closing quote, or breaks with the
    /// state carried to the next line.
    fn scan_string(
        &self,
        line: &[char],
        start: usize,
        from: usize,
        to: usize,
        sink: &mut dyn TokenSink,
    ) -> ControlFlow<LexState, usize> {
        match scan_quoted(line, from, to, '"', true) {
            StringEnd::Closed(end) => {
                sink.push(TokenKind::LiteralStringDoubleQuote, start, end);
                ControlFlow::Continue(end)
            }
            StringEnd::Continued => {
                sink.push(TokenKind::LiteralStringDoubleQuote, start, to);
                ControlFlow::Break(STATE_STRING_CONTINUED)
            }
            StringEnd::Unterminated if self.config.multiline_strings => {
                sink.push(TokenKind::LiteralStringDoubleQuote, start, to);
                ControlFlow::Break(STATE_STRING_CONTINUED)
            }
            StringEnd::Unterminated => {
                sink.push(TokenKind::ErrorString, start, to);
                ControlFlow::Break(LexState::NEUTRAL)
            }
        }
    }

    fn scan_single_quote(
        &self,
        line: &[char],
        pos: usize,
        to: usize,
        sink: &mut dyn TokenSink,
    ) -> usize {
        if self.config.lifetimes {
            let next = peek(line, pos + 1, to);
            let after = peek(line, pos + 2, to);
            if next.is_some_and(|c| self.is_word_start(c)) && after != Some('\'') {
                let end = run(line, pos + 1, to, |c| self.is_word_char(c));
                sink.push(TokenKind::Identifier, pos, end);
                return end;
            }
        }

        let (ok_kind, err_kind) = if self.config.char_literals {
            (TokenKind::LiteralChar, TokenKind::ErrorChar)
        } else {
            (TokenKind::LiteralStringDoubleQuote, TokenKind::ErrorString)
        };
        match scan_quoted(line, pos + 1, to, '\'', false) {
            StringEnd::Closed(end) => {
                let body = &line[pos + 1..end - 1];
                let kind = if self.config.char_literals && !is_valid_char_literal(body) {
                    err_kind
                } else {
                    ok_kind
                };
                sink.push(kind, pos, end);
                end
            }
            _ => {
                sink.push(err_kind, pos, to);
                to
            }
        }
    }

    fn is_word_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || (self.config.dollar_identifiers && c == '$')
    }

    fn classify_word(&self, word: &[char], next: Option<char>) -> TokenKind {
        let word: String = word.iter().collect();
        let word = word.as_str();
        if word == "true" || word == "false" {
            TokenKind::LiteralBoolean
        } else if self.config.keywords.contains(&word) {
            TokenKind::ReservedWord
        } else if self.config.control_keywords.contains(&word) {
            TokenKind::ReservedWord2
        } else if self.config.data_types.contains(&word) {
            TokenKind::DataType
        } else if next == Some('(') {
            TokenKind::Function
        } else {
            TokenKind::Identifier
        }
    }
}

impl Lexer for CLikeLexer {
    fn name(&self) -> &'static str {
        self.config.name
    }

    fn tokenize(&self, line: &[char], initial: LexState, line_start: usize) -> TokenSequence {
        let mut builder = TokenSequenceBuilder::new(line_start);
        let state = self.scan_range(line, 0, line.len(), initial, &mut builder);
        builder.finish(line.len(), state)
    }

    fn last_state_of_line(&self, line: &[char], initial: LexState) -> LexState {
        self.scan_range(line, 0, line.len(), initial, &mut StateOnly)
    }

    fn is_word_char(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || (self.config.dollar_identifiers && c == '$')
    }

    fn uses_curly_braces(&self) -> bool {
        true
    }

    fn line_comment(&self) -> Option<LineComment> {
        Some(LineComment {
            start: "//",
            end: None,
        })
    }
}

fn peek(line: &[char], pos: usize, to: usize) -> Option<char> {
    if pos < to {
        line.get(pos).copied()
    } else {
        None
    }
}

/// End of the run of characters satisfying `pred` starting at `pos`.
fn run(line: &[char], pos: usize, to: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = pos;
    while end < to && pred(line[end]) {
        end += 1;
    }
    end
}

/// Index of the first occurrence of `pat` in `line[from..to]`.
pub(crate) fn find(line: &[char], from: usize, to: usize, pat: &[char]) -> Option<usize> {
    if pat.is_empty() || to < pat.len() {
        return None;
    }
    (from..=to - pat.len()).find(|&i| line[i..i + pat.len()] == *pat)
}

/// Scans a quoted literal body starting just after the opening quote.
fn scan_quoted(line: &[char], from: usize, to: usize, quote: char, continuable: bool) -> StringEnd {
    let mut pos = from;
    while pos < to {
        let c = line[pos];
        if c == '\\' {
            if pos + 1 == to {
                return if continuable {
                    StringEnd::Continued
                } else {
                    StringEnd::Unterminated
                };
            }
            pos += 2;
        } else if c == quote {
            return StringEnd::Closed(pos + 1);
        } else {
            pos += 1;
        }
    }
    StringEnd::Unterminated
}

/// Whether a `/` at `pos` can open a regular expression, judged by the
/// last non-blank character before it.
fn regex_allowed(line: &[char], from: usize, pos: usize) -> bool {
    let before = &line[from..pos];
    let last = match before.iter().rposition(|c| !c.is_whitespace()) {
        Some(last) => last,
        None => return true,
    };
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let c = before[last];
    if is_word(c) {
        let start = before[..last].iter().rposition(|&c| !is_word(c)).map_or(0, |i| i + 1);
        let word: String = before[start..=last].iter().collect();
        return REGEX_PREFIX_WORDS.contains(&word.as_str());
    }
    matches!(
        c,
        '(' | '[' | '{' | ',' | ';' | ':' | '=' | '!' | '&' | '|' | '?' | '+' | '-' | '*' | '%'
            | '<' | '>' | '~' | '^' | '/'
    )
}

/// Index just past the closing `/` of a regular expression opening at
/// `pos`, if it closes on this line.
fn scan_regex(line: &[char], pos: usize, to: usize) -> Option<usize> {
    let mut i = pos + 1;
    let mut in_class = false;
    while i < to {
        match line[i] {
            '\\' => i += 2,
            '[' => {
                in_class = true;
                i += 1;
            }
            ']' => {
                in_class = false;
                i += 1;
            }
            '/' if !in_class => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn is_valid_char_literal(body: &[char]) -> bool {
    match body {
        [c] => *c != '\\',
        ['\\', _] => true,
        ['\\', 'u', rest @ ..] | ['\\', 'x', rest @ ..] => {
            !rest.is_empty() && rest.iter().all(|c| c.is_ascii_hexdigit() || matches!(c, '{' | '}'))
        }
        ['\\', rest @ ..] => rest.iter().all(|c| c.is_digit(8)),
        _ => false,
    }
}

/// Scans a numeric literal, returning its kind and end.
fn scan_number(
    line: &[char],
    pos: usize,
    to: usize,
    is_word_char: impl Fn(char) -> bool,
) -> (TokenKind, usize) {
    let digits =
        |from: usize, pred: fn(char) -> bool| run(line, from, to, |c| pred(c) || c == '_');
    let mut end = pos;
    let mut kind = TokenKind::LiteralNumberDecimalInt;

    if line[pos] == '0' && matches!(peek(line, pos + 1, to), Some('x' | 'X')) {
        end = digits(pos + 2, |c| c.is_ascii_hexdigit());
        kind = if end == pos + 2 {
            TokenKind::ErrorNumberFormat
        } else {
            TokenKind::LiteralNumberHexadecimal
        };
    } else {
        end = digits(end, |c| c.is_ascii_digit());
        let fraction = match peek(line, end + 1, to) {
            Some('.') => false,
            Some(c) => !c.is_alphabetic() || matches!(c, 'e' | 'E' | 'f' | 'F' | 'd' | 'D'),
            None => true,
        };
        if peek(line, end, to) == Some('.') && fraction {
            kind = TokenKind::LiteralNumberFloat;
            end = digits(end + 1, |c| c.is_ascii_digit());
        }
        if matches!(peek(line, end, to), Some('e' | 'E')) {
            let mut exp = end + 1;
            if matches!(peek(line, exp, to), Some('+' | '-')) {
                exp += 1;
            }
            let exp_end = digits(exp, |c| c.is_ascii_digit());
            if exp_end > exp {
                kind = TokenKind::LiteralNumberFloat;
                end = exp_end;
            }
        }
    }

    // Type suffix: letters from a small set optionally followed by a width.
    if kind != TokenKind::ErrorNumberFormat {
        let suffix_end = run(line, end, to, |c| {
            matches!(c, 'u' | 'U' | 'l' | 'L' | 'f' | 'F' | 'd' | 'D' | 'i')
        });
        let width_end = run(line, suffix_end, to, |c| c.is_ascii_digit());
        let float_suffix = matches!(peek(line, end, to), Some('f' | 'F' | 'd' | 'D'));
        if float_suffix && kind == TokenKind::LiteralNumberDecimalInt {
            kind = TokenKind::LiteralNumberFloat;
        }
        end = width_end;
    }

    // Anything word-like glued to the literal makes the whole run malformed.
    if peek(line, end, to).is_some_and(&is_word_char) {
        end = run(line, end, to, &is_word_char);
        kind = TokenKind::ErrorNumberFormat;
    }
    (kind, end)
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' | '^' | '~' | '?' | ':'
            | '.'
    )
}

pub fn c_lexer() -> CLikeLexer {
    CLikeLexer::new(CLikeConfig {
        name: "C",
        keywords: &[
            "auto", "const", "enum", "extern", "inline", "register", "restrict", "signed", "sizeof",
            "static", "struct", "typedef", "union", "unsigned", "volatile", "NULL",
        ],
        control_keywords: &[
            "break", "case", "continue", "default", "do", "else", "for", "goto", "if", "return",
            "switch", "while",
        ],
        data_types: &["char", "double", "float", "int", "long", "short", "void", "size_t", "bool"],
        char_literals: true,
        lifetimes: false,
        backtick_strings: false,
        multiline_strings: false,
        nested_comments: false,
        regex_literals: false,
        preprocessor: true,
        annotation_char: None,
        dollar_identifiers: false,
    })
}

pub fn java_lexer() -> CLikeLexer {
    CLikeLexer::new(CLikeConfig {
        name: "Java",
        keywords: &[
            "abstract", "class", "enum", "extends", "final", "implements", "import", "instanceof",
            "interface", "native", "new", "package", "private", "protected", "public", "static",
            "super", "synchronized", "this", "throws", "transient", "volatile", "null", "var",
            "record",
        ],
        control_keywords: &[
            "assert", "break", "case", "catch", "continue", "default", "do", "else", "finally",
            "for", "if", "return", "switch", "throw", "try", "while", "yield",
        ],
        data_types: &["boolean", "byte", "char", "double", "float", "int", "long", "short", "void"],
        char_literals: true,
        lifetimes: false,
        backtick_strings: false,
        multiline_strings: false,
        nested_comments: false,
        regex_literals: false,
        preprocessor: false,
        annotation_char: Some('@'),
        dollar_identifiers: true,
    })
}

pub fn javascript_lexer() -> CLikeLexer {
    CLikeLexer::new(CLikeConfig {
        name: "JavaScript",
        keywords: &[
            "async", "await", "class", "const", "delete", "export", "extends", "from", "function",
            "import", "in", "instanceof", "let", "new", "null", "of", "static", "super", "this",
            "typeof", "undefined", "var", "void",
        ],
        control_keywords: &[
            "break", "case", "catch", "continue", "default", "do", "else", "finally", "for", "if",
            "return", "switch", "throw", "try", "while", "yield",
        ],
        data_types: &[],
        char_literals: false,
        lifetimes: false,
        backtick_strings: true,
        multiline_strings: false,
        nested_comments: false,
        regex_literals: true,
        preprocessor: false,
        annotation_char: Some('@'),
        dollar_identifiers: true,
    })
}

pub fn rust_lexer() -> CLikeLexer {
    CLikeLexer::new(CLikeConfig {
        name: "Rust",
        keywords: &[
            "as", "async", "await", "const", "crate", "dyn", "enum", "extern", "fn", "impl", "let",
            "mod", "move", "mut", "pub", "ref", "self", "Self", "static", "struct", "super",
            "trait", "type", "unsafe", "use", "where",
        ],
        control_keywords: &[
            "break", "continue", "else", "for", "if", "in", "loop", "match", "return", "while",
        ],
        data_types: &[
            "bool", "char", "f32", "f64", "i8", "i16", "i32", "i64", "i128", "isize", "str",
            "u8", "u16", "u32", "u64", "u128", "usize", "String",
        ],
        char_literals: true,
        lifetimes: true,
        backtick_strings: false,
        multiline_strings: true,
        nested_comments: true,
        regex_literals: false,
        preprocessor: false,
        annotation_char: Some('#'),
        dollar_identifiers: false,
    })
}
