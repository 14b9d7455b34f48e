//! Hyperlink post-processing.
//!
//! Scanners never look for URLs. This pass runs over a finished sequence and
//! splits comment and string tokens so that each URL becomes its own token of
//! the same kind with `is_hyperlink` set.

use super::token::{Token, TokenSequence};

const URL_PREFIXES: &[&str] = &["https://", "http://", "ftp://", "www."];

/// Splits URLs out of comment and string tokens. Returns the number of links
/// found.
pub fn mark_hyperlinks(seq: &mut TokenSequence, line: &[char]) -> usize {
    let candidates = seq
        .iter()
        .any(|t| t.kind.is_comment() || t.kind.is_string_like());
    if !candidates {
        return 0;
    }

    let mut found = 0;
    let mut tokens = Vec::with_capacity(seq.len());
    for token in seq.iter() {
        if !(token.kind.is_comment() || token.kind.is_string_like()) {
            tokens.push(*token);
            continue;
        }
        found += split_token(token, line, &mut tokens);
    }

    if found > 0 {
        seq.replace_tokens(tokens);
    }
    found
}

fn split_token(token: &Token, line: &[char], out: &mut Vec<Token>) -> usize {
    let end = (token.start + token.len).min(line.len());
    let mut cursor = token.start;
    let mut pos = token.start;
    let mut found = 0;

    while pos < end {
        let Some(prefix_len) = url_prefix_at(line, pos, end) else {
            pos += 1;
            continue;
        };
        if pos > token.start && line[pos - 1].is_alphanumeric() {
            pos += 1;
            continue;
        }

        let mut url_end = pos + prefix_len;
        while url_end < end && is_url_char(line[url_end]) {
            url_end += 1;
        }
        while url_end > pos + prefix_len
            && matches!(line[url_end - 1], '.' | ',' | ';' | ':' | ')' | '!' | '?')
        {
            url_end -= 1;
        }
        if url_end == pos + prefix_len {
            pos += 1;
            continue;
        }

        push_piece(token, cursor, pos, false, out);
        push_piece(token, pos, url_end, true, out);
        cursor = url_end;
        pos = url_end;
        found += 1;
    }

    push_piece(token, cursor, token.start + token.len, false, out);
    found
}

fn push_piece(token: &Token, start: usize, end: usize, is_hyperlink: bool, out: &mut Vec<Token>) {
    if end <= start {
        return;
    }
    let mut piece = *token;
    piece.start = start;
    piece.len = end - start;
    piece.doc_offset = token.doc_offset + (start - token.start);
    piece.is_hyperlink = is_hyperlink;
    out.push(piece);
}

fn url_prefix_at(line: &[char], pos: usize, end: usize) -> Option<usize> {
    URL_PREFIXES.iter().find_map(|prefix| {
        let len = prefix.chars().count();
        let matches = pos + len <= end
            && line[pos..pos + len]
                .iter()
                .zip(prefix.chars())
                .all(|(a, b)| a.to_ascii_lowercase() == b);
        matches.then_some(len)
    })
}

fn is_url_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>' | '`' | '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::{LexState, Lexer};
    use crate::syntax::scanners::java_lexer;
    use crate::syntax::token::TokenKind;

    fn lex(text: &str) -> (TokenSequence, Vec<char>) {
        let line: Vec<char> = text.chars().collect();
        (java_lexer().tokenize(&line, LexState::NEUTRAL, 100), line)
    }

    #[test]
    fn test_url_in_comment_is_split() {
        let (mut seq, line) = lex("x; // see https://example.com/a.");
        assert_eq!(mark_hyperlinks(&mut seq, &line), 1);
        assert!(seq.validate(line.len()).is_ok());

        let link = seq.iter().find(|t| t.is_hyperlink).copied().unwrap();
        assert_eq!(link.kind, TokenKind::CommentEol);
        assert_eq!(link.text_string(&line), "https://example.com/a");
        let trailing = seq.tokens().last().copied().unwrap();
        assert_eq!(trailing.text_string(&line), ".");
        assert!(!trailing.is_hyperlink);
    }

    #[test]
    fn test_url_in_string() {
        let (mut seq, line) = lex("s = \"www.example.org\";");
        assert_eq!(mark_hyperlinks(&mut seq, &line), 1);
        let link = seq.iter().find(|t| t.is_hyperlink).copied().unwrap();
        assert_eq!(link.kind, TokenKind::LiteralStringDoubleQuote);
        assert_eq!(link.text_string(&line), "www.example.org");
        assert_eq!(link.doc_offset, 105);
    }

    #[test]
    fn test_identifiers_are_never_links() {
        let (mut seq, line) = lex("http = 1;");
        assert_eq!(mark_hyperlinks(&mut seq, &line), 0);
        assert!(seq.iter().all(|t| !t.is_hyperlink));
    }

    #[test]
    fn test_bare_prefix_is_not_a_link() {
        let (mut seq, line) = lex("// http:// alone");
        assert_eq!(mark_hyperlinks(&mut seq, &line), 0);
    }
}
