//! Scanner for HTML-style markup with embedded script.
//!
//! Script between `<script>` and `</script>` is handed to the JavaScript
//! scanner; its tokens carry `language_index` 1 and its carried state is
//! folded into the markup state as `STATE_SCRIPT_BASE + inner`.

use super::c_like::{find, javascript_lexer, CLikeLexer};
use crate::syntax::lexer::{EmbeddedSink, LexState, Lexer, LineComment, StateOnly, TokenSink};
use crate::syntax::token::{TokenKind, TokenSequence, TokenSequenceBuilder};

/// Inside a tag, between the name and the closing `>`.
pub const STATE_IN_TAG: LexState = LexState(1);
/// Inside `<!-- ... -->`.
pub const STATE_COMMENT: LexState = LexState(2);
/// Inside a `"`-quoted attribute value.
pub const STATE_ATTR_DOUBLE: LexState = LexState(3);
/// Inside a `'`-quoted attribute value.
pub const STATE_ATTR_SINGLE: LexState = LexState(4);
/// Set on tag states when the open tag is `<script ...>`.
pub const SCRIPT_TAG_FLAG: u32 = 8;
/// Script body states start here.
pub const STATE_SCRIPT_BASE: u32 = 32;

const SCRIPT_LANGUAGE_INDEX: u8 = 1;

/// Markup scanner.
#[derive(Debug, Clone, Copy)]
pub struct MarkupLexer {
    script: CLikeLexer,
}

impl Default for MarkupLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupLexer {
    pub fn new() -> Self {
        Self {
            script: javascript_lexer(),
        }
    }

    fn scan(&self, line: &[char], initial: LexState, sink: &mut dyn TokenSink) -> LexState {
        let to = line.len();
        let mut pos = 0;
        let mut state = initial.0;

        loop {
            if state >= STATE_SCRIPT_BASE {
                let inner = LexState(state - STATE_SCRIPT_BASE);
                let close = find_ignore_case(line, pos, to, "</script");
                let end = close.unwrap_or(to);
                let mut embedded = EmbeddedSink::new(sink, SCRIPT_LANGUAGE_INDEX);
                let inner = self.script.scan_range(line, pos, end, inner, &mut embedded);
                match close {
                    Some(close) => {
                        pos = close;
                        state = 0;
                    }
                    None => return LexState(STATE_SCRIPT_BASE + inner.0),
                }
            }

            if pos >= to {
                return LexState(state);
            }

            let script_tag = state & SCRIPT_TAG_FLAG != 0;
            state = match LexState(state & !SCRIPT_TAG_FLAG) {
                STATE_COMMENT => match find(line, pos, to, &['-', '-', '>']) {
                    Some(i) => {
                        sink.push(TokenKind::MarkupComment, pos, i + 3);
                        pos = i + 3;
                        0
                    }
                    None => {
                        sink.push(TokenKind::MarkupComment, pos, to);
                        return STATE_COMMENT;
                    }
                },
                STATE_ATTR_DOUBLE | STATE_ATTR_SINGLE => {
                    let quote = if state & !SCRIPT_TAG_FLAG == STATE_ATTR_DOUBLE.0 {
                        '"'
                    } else {
                        '\''
                    };
                    match line[pos..to].iter().position(|&c| c == quote) {
                        Some(i) => {
                            sink.push(TokenKind::MarkupTagAttributeValue, pos, pos + i + 1);
                            pos += i + 1;
                            tag_state(STATE_IN_TAG, script_tag)
                        }
                        None => {
                            sink.push(TokenKind::MarkupTagAttributeValue, pos, to);
                            return LexState(state);
                        }
                    }
                }
                STATE_IN_TAG => {
                    let (next_pos, next_state) = self.scan_tag(line, pos, to, script_tag, sink);
                    pos = next_pos;
                    next_state
                }
                _ => {
                    let (next_pos, next_state) = self.scan_content(line, pos, to, sink);
                    pos = next_pos;
                    next_state
                }
            };
        }
    }

    /// Scans text content until a construct changes the state.
    fn scan_content(
        &self,
        line: &[char],
        mut pos: usize,
        to: usize,
        sink: &mut dyn TokenSink,
    ) -> (usize, u32) {
        while pos < to {
            let c = line[pos];
            if c == '<' {
                if starts_with(line, pos, to, "<!--") {
                    sink.push(TokenKind::MarkupComment, pos, pos + 4);
                    return (pos + 4, STATE_COMMENT.0);
                }
                if starts_with(line, pos, to, "<!") || starts_with(line, pos, to, "<?") {
                    let end = line[pos..to]
                        .iter()
                        .position(|&c| c == '>')
                        .map_or(to, |i| pos + i + 1);
                    sink.push(TokenKind::MarkupProcessingInstruction, pos, end);
                    pos = end;
                    continue;
                }
                let closing = line.get(pos + 1) == Some(&'/') && pos + 1 < to;
                let name_start = if closing { pos + 2 } else { pos + 1 };
                let name_end = run(line, name_start, to, is_name_char);
                if name_end == name_start || !line[name_start].is_alphabetic() {
                    sink.push(TokenKind::ErrorIdentifier, pos, pos + 1);
                    pos += 1;
                    continue;
                }
                sink.push(TokenKind::MarkupTagDelimiter, pos, name_start);
                sink.push(TokenKind::MarkupTagName, name_start, name_end);
                let name: String = line[name_start..name_end].iter().collect();
                let is_script = !closing && name.eq_ignore_ascii_case("script");
                return (name_end, tag_state(STATE_IN_TAG, is_script));
            }
            if c == '&' {
                let end = run(line, pos + 1, to, |c| c.is_alphanumeric() || c == '#');
                if end > pos + 1 && line.get(end) == Some(&';') && end < to {
                    sink.push(TokenKind::MarkupEntityReference, pos, end + 1);
                    pos = end + 1;
                } else {
                    sink.push(TokenKind::Identifier, pos, pos + 1);
                    pos += 1;
                }
                continue;
            }
            if c.is_whitespace() {
                let end = run(line, pos, to, char::is_whitespace);
                sink.push(TokenKind::Whitespace, pos, end);
                pos = end;
                continue;
            }
            let end = run(line, pos, to, |c| {
                !(c.is_whitespace() || c == '<' || c == '&')
            });
            sink.push(TokenKind::Identifier, pos, end);
            pos = end;
        }
        (pos, 0)
    }

    /// Scans inside an open tag until `>` or a multi-line attribute value.
    fn scan_tag(
        &self,
        line: &[char],
        mut pos: usize,
        to: usize,
        script_tag: bool,
        sink: &mut dyn TokenSink,
    ) -> (usize, u32) {
        while pos < to {
            let c = line[pos];
            match c {
                '>' => {
                    sink.push(TokenKind::MarkupTagDelimiter, pos, pos + 1);
                    let next = if script_tag { STATE_SCRIPT_BASE } else { 0 };
                    return (pos + 1, next);
                }
                '/' if line.get(pos + 1) == Some(&'>') && pos + 1 < to => {
                    sink.push(TokenKind::MarkupTagDelimiter, pos, pos + 2);
                    return (pos + 2, 0);
                }
                '"' | '\'' => {
                    let quoted = if c == '"' { STATE_ATTR_DOUBLE } else { STATE_ATTR_SINGLE };
                    match line[pos + 1..to].iter().position(|&q| q == c) {
                        Some(i) => {
                            sink.push(TokenKind::MarkupTagAttributeValue, pos, pos + i + 2);
                            pos += i + 2;
                        }
                        None => {
                            sink.push(TokenKind::MarkupTagAttributeValue, pos, to);
                            return (to, tag_state(quoted, script_tag));
                        }
                    }
                }
                '=' | '/' => {
                    sink.push(TokenKind::Operator, pos, pos + 1);
                    pos += 1;
                }
                '<' => {
                    sink.push(TokenKind::ErrorIdentifier, pos, pos + 1);
                    pos += 1;
                }
                c if c.is_whitespace() => {
                    let end = run(line, pos, to, char::is_whitespace);
                    sink.push(TokenKind::Whitespace, pos, end);
                    pos = end;
                }
                _ => {
                    let end = run(line, pos, to, |c| {
                        !(c.is_whitespace() || matches!(c, '>' | '/' | '=' | '"' | '\'' | '<'))
                    });
                    sink.push(TokenKind::MarkupTagAttribute, pos, end);
                    pos = end;
                }
            }
        }
        (pos, tag_state(STATE_IN_TAG, script_tag))
    }
}

impl Lexer for MarkupLexer {
    fn name(&self) -> &'static str {
        "HTML"
    }

    fn tokenize(&self, line: &[char], initial: LexState, line_start: usize) -> TokenSequence {
        let mut builder = TokenSequenceBuilder::new(line_start);
        let state = self.scan(line, initial, &mut builder);
        builder.finish(line.len(), state)
    }

    fn last_state_of_line(&self, line: &[char], initial: LexState) -> LexState {
        self.scan(line, initial, &mut StateOnly)
    }

    fn is_word_char(&self, c: char) -> bool {
        is_name_char(c)
    }

    fn line_comment(&self) -> Option<LineComment> {
        Some(LineComment {
            start: "<!--",
            end: Some("-->"),
        })
    }
}

fn tag_state(base: LexState, script_tag: bool) -> u32 {
    if script_tag {
        base.0 | SCRIPT_TAG_FLAG
    } else {
        base.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn run(line: &[char], pos: usize, to: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = pos;
    while end < to && pred(line[end]) {
        end += 1;
    }
    end
}

fn starts_with(line: &[char], pos: usize, to: usize, pat: &str) -> bool {
    let mut i = pos;
    for p in pat.chars() {
        if i >= to || line[i] != p {
            return false;
        }
        i += 1;
    }
    true
}

fn find_ignore_case(line: &[char], from: usize, to: usize, pat: &str) -> Option<usize> {
    let pat: Vec<char> = pat.chars().collect();
    if to < pat.len() {
        return None;
    }
    (from..=to - pat.len()).find(|&i| {
        line[i..i + pat.len()]
            .iter()
            .zip(&pat)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str, state: LexState) -> (Vec<(TokenKind, String, u8)>, LexState) {
        let line: Vec<char> = text.chars().collect();
        let seq = MarkupLexer::new().tokenize(&line, state, 0);
        assert!(
            seq.validate(line.len()).is_ok(),
            "invalid tokens for {:?}",
            text
        );
        let tokens = seq
            .tokens()
            .iter()
            .map(|t| (t.kind, t.text_string(&line), t.language_index))
            .collect();
        (tokens, seq.end_state())
    }

    #[test]
    fn test_simple_tag() {
        let (tokens, state) = lex("<a href=\"x\">link</a>", LexState::NEUTRAL);
        assert_eq!(state, LexState::NEUTRAL);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.0).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::MarkupTagDelimiter,
                TokenKind::MarkupTagName,
                TokenKind::Whitespace,
                TokenKind::MarkupTagAttribute,
                TokenKind::Operator,
                TokenKind::MarkupTagAttributeValue,
                TokenKind::MarkupTagDelimiter,
                TokenKind::Identifier,
                TokenKind::MarkupTagDelimiter,
                TokenKind::MarkupTagName,
                TokenKind::MarkupTagDelimiter,
            ]
        );
    }

    #[test]
    fn test_comment_spans_lines() {
        let (_, state) = lex("text <!-- open", LexState::NEUTRAL);
        assert_eq!(state, STATE_COMMENT);
        let (tokens, state) = lex("close --> more", STATE_COMMENT);
        assert_eq!(state, LexState::NEUTRAL);
        assert_eq!(tokens[0].0, TokenKind::MarkupComment);
        assert_eq!(tokens[0].1, "close -->");
    }

    #[test]
    fn test_tag_spans_lines() {
        let (_, state) = lex("<div class=\"a", LexState::NEUTRAL);
        assert_eq!(state, STATE_ATTR_DOUBLE);
        let (tokens, state) = lex("b\" id=x>", STATE_ATTR_DOUBLE);
        assert_eq!(state, LexState::NEUTRAL);
        assert_eq!(tokens[0].0, TokenKind::MarkupTagAttributeValue);
    }

    #[test]
    fn test_embedded_script() {
        let (tokens, state) = lex("<script>if (a) {", LexState::NEUTRAL);
        assert_eq!(state, LexState(STATE_SCRIPT_BASE));
        let brace = tokens.iter().find(|t| t.1 == "{").cloned().unwrap();
        assert_eq!(brace.0, TokenKind::Separator);
        assert_eq!(brace.2, SCRIPT_LANGUAGE_INDEX);

        let (_, state) = lex("/* still script", LexState(STATE_SCRIPT_BASE));
        assert_eq!(state, LexState(STATE_SCRIPT_BASE + 1));

        let (tokens, state) = lex("} </script> <b>", LexState(STATE_SCRIPT_BASE));
        assert_eq!(state, LexState::NEUTRAL);
        assert_eq!(tokens[0].2, SCRIPT_LANGUAGE_INDEX);
        let close = tokens.iter().find(|t| t.1 == "script").cloned().unwrap();
        assert_eq!(close.0, TokenKind::MarkupTagName);
        assert_eq!(close.2, 0);
    }

    #[test]
    fn test_self_closing_script_tag_has_no_body() {
        let (_, state) = lex("<script src=\"a.js\"/>", LexState::NEUTRAL);
        assert_eq!(state, LexState::NEUTRAL);
    }

    #[test]
    fn test_entities_and_stray_lt() {
        let (tokens, _) = lex("a &amp; < b", LexState::NEUTRAL);
        let has = |kind: TokenKind, text: &str| tokens.iter().any(|t| t.0 == kind && t.1 == text);
        assert!(has(TokenKind::MarkupEntityReference, "&amp;"));
        assert!(has(TokenKind::ErrorIdentifier, "<"));
    }

    #[test]
    fn test_state_only_agrees_with_tokenize() {
        let lexer = MarkupLexer::new();
        let lines = ["<script>/* x", "<p a='b", "--> <!-- x", "</script>", "`a", "plain &x"];
        let states = [0, 1, 2, 3, 4, 9, 11, 32, 33, 36];
        for line in lines {
            let chars: Vec<char> = line.chars().collect();
            for state in states {
                let state = LexState(state);
                assert_eq!(
                    lexer.last_state_of_line(&chars, state),
                    lexer.tokenize(&chars, state, 0).end_state()
                );
            }
        }
    }
}
