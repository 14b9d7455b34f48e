//! Plain text: words and whitespace, no carried state.

use crate::syntax::lexer::{LexState, Lexer};
use crate::syntax::token::{TokenKind, TokenSequence, TokenSequenceBuilder};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLexer;

impl Lexer for PlainTextLexer {
    fn name(&self) -> &'static str {
        "Plain Text"
    }

    fn tokenize(&self, line: &[char], _initial: LexState, line_start: usize) -> TokenSequence {
        let mut builder = TokenSequenceBuilder::new(line_start);
        let mut pos = 0;
        while pos < line.len() {
            let ws = line[pos].is_whitespace();
            let mut end = pos + 1;
            while end < line.len() && line[end].is_whitespace() == ws {
                end += 1;
            }
            let kind = if ws {
                TokenKind::Whitespace
            } else {
                TokenKind::Identifier
            };
            builder.push(kind, pos, end);
            pos = end;
        }
        builder.finish(line.len(), LexState::NEUTRAL)
    }

    fn last_state_of_line(&self, _line: &[char], _initial: LexState) -> LexState {
        LexState::NEUTRAL
    }
}
