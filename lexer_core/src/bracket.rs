//! Bracket matching.
//!
//! The search is character driven: a line's tokens are only generated once a
//! candidate bracket is seen on it, and a candidate only counts when the token
//! covering it is a separator. Brackets inside comments, strings, and
//! identifiers are skipped that way.

use crate::buffer::LineSource;
use crate::error::Result;
use crate::fold::FoldQuery;
use crate::syntax::{SyntaxHighlighter, TokenKind, TokenSequence};

/// A bracket and the one it pairs with, as document offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
    pub origin: usize,
    pub target: usize,
}

/// Returns `(partner, searches_forward)` for a bracket character.
pub fn bracket_partner(c: char) -> Option<(char, bool)> {
    match c {
        '(' => Some((')', true)),
        '[' => Some((']', true)),
        '{' => Some(('}', true)),
        ')' => Some(('(', false)),
        ']' => Some(('[', false)),
        '}' => Some(('{', false)),
        _ => None,
    }
}

/// Finds structurally matching brackets in a tokenized document.
pub struct BracketMatcher<'a> {
    source: &'a dyn LineSource,
    highlighter: &'a SyntaxHighlighter,
    folds: &'a dyn FoldQuery,
}

/// Text and lazily generated tokens of the line being scanned.
struct ScanLine {
    line: usize,
    start: usize,
    chars: Vec<char>,
    tokens: Option<TokenSequence>,
}

impl<'a> BracketMatcher<'a> {
    pub fn new(
        source: &'a dyn LineSource,
        highlighter: &'a SyntaxHighlighter,
        folds: &'a dyn FoldQuery,
    ) -> Self {
        Self {
            source,
            highlighter,
            folds,
        }
    }

    /// Matches the bracket at `offset`.
    ///
    /// Returns `None` when there is no structural bracket at `offset`, when
    /// no partner exists, or when the partner sits on a folded-away line.
    pub fn match_bracket(&self, offset: usize) -> Result<Option<BracketMatch>> {
        let line = self.source.line_of_offset(offset);
        let mut scan = self.load(line)?;
        let col = offset - scan.start;
        let Some(&c) = scan.chars.get(col) else {
            return Ok(None);
        };
        let Some((target, forward)) = bracket_partner(c) else {
            return Ok(None);
        };
        if !self.is_separator(&mut scan, col)? {
            return Ok(None);
        }

        let found = if forward {
            self.scan_forward(scan, col, c, target)?
        } else {
            self.scan_backward(scan, col, c, target)?
        };

        let Some((target_line, target_offset)) = found else {
            log::trace!("No partner for {:?} at {}", c, offset);
            return Ok(None);
        };
        if self.folds.is_line_hidden(target_line) {
            log::trace!("Partner of {} is on hidden line {}", offset, target_line);
            return Ok(None);
        }
        Ok(Some(BracketMatch {
            origin: offset,
            target: target_offset,
        }))
    }

    /// Matches the bracket just before `caret`, falling back to the one
    /// right after it.
    pub fn match_near_caret(&self, caret: usize) -> Result<Option<BracketMatch>> {
        if caret > 0 {
            if let Some(found) = self.match_bracket(caret - 1)? {
                return Ok(Some(found));
            }
        }
        self.match_bracket(caret)
    }

    fn scan_forward(
        &self,
        mut scan: ScanLine,
        col: usize,
        same: char,
        target: char,
    ) -> Result<Option<(usize, usize)>> {
        let mut nesting = 0usize;
        let mut from = col + 1;
        loop {
            for i in from..scan.chars.len() {
                let c = scan.chars[i];
                if c != same && c != target {
                    continue;
                }
                if !self.is_separator(&mut scan, i)? {
                    continue;
                }
                if c == same {
                    nesting += 1;
                } else if nesting == 0 {
                    return Ok(Some((scan.line, scan.start + i)));
                } else {
                    nesting -= 1;
                }
            }
            if scan.line + 1 >= self.source.line_count() {
                return Ok(None);
            }
            scan = self.load(scan.line + 1)?;
            from = 0;
        }
    }

    fn scan_backward(
        &self,
        mut scan: ScanLine,
        col: usize,
        same: char,
        target: char,
    ) -> Result<Option<(usize, usize)>> {
        let mut nesting = 0usize;
        let mut to = col;
        loop {
            for i in (0..to).rev() {
                let c = scan.chars[i];
                if c != same && c != target {
                    continue;
                }
                if !self.is_separator(&mut scan, i)? {
                    continue;
                }
                if c == same {
                    nesting += 1;
                } else if nesting == 0 {
                    return Ok(Some((scan.line, scan.start + i)));
                } else {
                    nesting -= 1;
                }
            }
            if scan.line == 0 {
                return Ok(None);
            }
            scan = self.load(scan.line - 1)?;
            to = scan.chars.len();
        }
    }

    fn load(&self, line: usize) -> Result<ScanLine> {
        let chars = self.source.line_chars(line).unwrap_or_default();
        Ok(ScanLine {
            line,
            start: self.source.line_start(line),
            chars,
            tokens: None,
        })
    }

    fn is_separator(&self, scan: &mut ScanLine, col: usize) -> Result<bool> {
        if scan.tokens.is_none() {
            let tokens = self.highlighter.token_sequence_for_line(self.source, scan.line)?;
            scan.tokens = Some(tokens);
        }
        let offset = scan.start + col;
        Ok(scan
            .tokens
            .as_ref()
            .and_then(|seq| seq.token_at_offset(offset))
            .is_some_and(|t| t.kind == TokenKind::Separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::fold::{FoldManager, FoldRegion, NoFolds};

    fn setup(text: &str) -> (TextBuffer, SyntaxHighlighter) {
        let buffer = TextBuffer::from_str(text);
        let mut highlighter = SyntaxHighlighter::default();
        highlighter.set_language("text/java", &buffer).unwrap();
        (buffer, highlighter)
    }

    fn target(text: &str, offset: usize) -> Option<usize> {
        let (buffer, highlighter) = setup(text);
        let matcher = BracketMatcher::new(&buffer, &highlighter, &NoFolds);
        matcher.match_bracket(offset).unwrap().map(|m| m.target)
    }

    #[test]
    fn test_simple_pair() {
        assert_eq!(target("{ }", 0), Some(2));
        assert_eq!(target("{ }", 2), Some(0));
        assert_eq!(target("{ }", 1), None);
    }

    #[test]
    fn test_nested_same_kind() {
        let text = "f(a(b), (c))";
        assert_eq!(target(text, 1), Some(11));
        assert_eq!(target(text, 3), Some(5));
        assert_eq!(target(text, 10), Some(8));
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        assert_eq!(target("( [ ) ]", 0), Some(4));
    }

    #[test]
    fn test_skips_string_and_comment_brackets() {
        let text = "{ \"}\" /* } */ }";
        assert_eq!(target(text, 0), Some(14));
        assert_eq!(target(text, 3), None);
        assert_eq!(target(text, 9), None);
    }

    #[test]
    fn test_across_lines() {
        let text = "class A {\n  // }\n  void f() {\n  }\n}";
        let close = text.rfind('}').unwrap();
        assert_eq!(target(text, 8), Some(close));
        assert_eq!(target(text, close), Some(8));
    }

    #[test]
    fn test_multiline_comment_brackets() {
        let text = "{\n/* {\n } */\n}";
        assert_eq!(target(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn test_unmatched() {
        assert_eq!(target("{ ( }", 2), None);
        assert_eq!(target("((", 0), None);
        assert_eq!(target("x", 5), None);
    }

    #[test]
    fn test_hidden_partner_is_no_match() {
        let (buffer, highlighter) = setup("a {\nb\nc }\nd");
        let mut folds = FoldManager::new();
        folds.add_region(FoldRegion::new(0, 2));
        {
            let matcher = BracketMatcher::new(&buffer, &highlighter, &folds);
            assert_eq!(matcher.match_bracket(2).unwrap().map(|m| m.target), Some(8));
        }
        folds.fold_all();
        let matcher = BracketMatcher::new(&buffer, &highlighter, &folds);
        assert_eq!(matcher.match_bracket(2).unwrap(), None);
    }

    #[test]
    fn test_near_caret() {
        let (buffer, highlighter) = setup("{ }(x)");
        let matcher = BracketMatcher::new(&buffer, &highlighter, &NoFolds);
        assert_eq!(
            matcher.match_near_caret(1).unwrap(),
            Some(BracketMatch { origin: 0, target: 2 })
        );
        // Before the caret wins over after it.
        assert_eq!(
            matcher.match_near_caret(3).unwrap().map(|m| m.origin),
            Some(2)
        );
        assert_eq!(
            matcher.match_near_caret(0).unwrap().map(|m| m.target),
            Some(2)
        );
        assert_eq!(
            matcher.match_near_caret(5).unwrap().map(|m| m.target),
            Some(3)
        );
    }

    #[test]
    fn test_partner_table() {
        assert_eq!(bracket_partner('['), Some((']', true)));
        assert_eq!(bracket_partner('}'), Some(('{', false)));
        assert_eq!(bracket_partner('<'), None);
    }
}
