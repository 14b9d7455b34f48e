//! Property-based tests for tokenization, incremental state propagation,
//! and bracket matching.

use cp_lexer_core::{
    Damage, Document, EngineConfig, Language, LexState, Lexer, LineSource, SyntaxHighlighter,
    TextBuffer, TokenKind,
};
use proptest::prelude::*;

/// Single lines rich in delimiters that change lexer state.
const LINE: &str = "[a-c0-9 {}()\\[\\]\"'`/*\\\\<>!=.-]{0,40}";

/// Short multi-line documents.
const DOC: &str = "[a-c {}()\\[\\]\"'`/*\\\\<>!\n]{0,80}";

/// Text inserted by random edits.
const SNIPPET: &str = "[a {}\"`/*\\\\\n]{1,6}";

fn language() -> impl Strategy<Value = Language> {
    prop::sample::select(vec![
        Language::C,
        Language::Java,
        Language::JavaScript,
        Language::Rust,
        Language::Html,
    ])
}

#[derive(Debug, Clone)]
enum Edit {
    Insert(usize, String),
    Remove(usize, usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), SNIPPET).prop_map(|(at, text)| Edit::Insert(at, text)),
        (any::<usize>(), 1usize..12).prop_map(|(at, len)| Edit::Remove(at, len)),
    ]
}

fn document(language: Language, text: &str) -> Document {
    let config = EngineConfig {
        default_language: language.id().to_string(),
        ..EngineConfig::default()
    };
    Document::from_str(text, config)
}

proptest! {
    #[test]
    fn relexing_is_idempotent(lang in language(), prefix in LINE, line in LINE) {
        let lexer = lang.lexer();
        let prefix: Vec<char> = prefix.chars().collect();
        let initial = lexer.last_state_of_line(&prefix, LexState::NEUTRAL);
        let chars: Vec<char> = line.chars().collect();

        let first = lexer.tokenize(&chars, initial, 7);
        let second = lexer.tokenize(&chars, initial, 7);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.validate(chars.len()), Ok(()));
    }

    #[test]
    fn state_only_pass_agrees_with_tokenize(lang in language(), prefix in LINE, line in LINE) {
        let lexer = lang.lexer();
        let prefix: Vec<char> = prefix.chars().collect();
        let initial = lexer.last_state_of_line(&prefix, LexState::NEUTRAL);
        let chars: Vec<char> = line.chars().collect();

        prop_assert_eq!(
            lexer.last_state_of_line(&chars, initial),
            lexer.tokenize(&chars, initial, 0).end_state()
        );
    }

    #[test]
    fn incremental_cache_matches_full_pass(
        lang in language(),
        text in DOC,
        edits in prop::collection::vec(edit_strategy(), 1..12),
    ) {
        let mut doc = document(lang, &text);
        for edit in edits {
            let len = doc.buffer().len_chars();
            let result = match edit {
                Edit::Insert(at, text) => doc.insert(at % (len + 1), &text),
                Edit::Remove(at, n) => {
                    let start = at % (len + 1);
                    doc.remove(start, start + n)
                }
            };
            prop_assert!(result.is_ok());

            let expected = doc.highlighter().full_pass(doc.buffer()).unwrap();
            prop_assert_eq!(doc.highlighter().states().as_slice(), expected.as_slice());
        }

        prop_assert_eq!(doc.highlighter().repairs(), 0);
        for line in 0..doc.buffer().len_lines() {
            let seq = doc.token_sequence_for_line(line).unwrap();
            prop_assert_eq!(seq.validate(doc.buffer().line_len(line)), Ok(()));
        }
    }

    #[test]
    fn stable_single_line_edit_touches_one_line(
        lang in language(),
        text in DOC,
        at in any::<usize>(),
        word in "[a-c]{1,3}",
    ) {
        let mut buffer = TextBuffer::from_str(&text);
        let mut highlighter = SyntaxHighlighter::default();
        highlighter.set_language(lang.id(), &buffer).unwrap();
        let before = highlighter.states().as_slice().to_vec();

        let offset = at % (buffer.len_chars() + 1);
        let edit = buffer.insert(offset, &word);
        let damage = highlighter.on_edit(&buffer, &edit).unwrap();

        let line = edit.start_line;
        if highlighter.state_after(line).unwrap() == before[line] {
            prop_assert_eq!(damage, Damage::new(line, line));
        }
    }

    #[test]
    fn bracket_matches_are_symmetric(lang in language(), text in DOC) {
        let doc = document(lang, &text);
        for offset in 0..doc.buffer().len_chars() {
            if let Some(found) = doc.match_bracket(offset).unwrap() {
                let back = doc.match_bracket(found.target).unwrap();
                prop_assert_eq!(back.map(|m| m.target), Some(offset));
            }
        }
    }

    #[test]
    fn brackets_in_comments_and_strings_never_match(lang in language(), text in DOC) {
        let doc = document(lang, &text);
        for line in 0..doc.buffer().len_lines() {
            let seq = doc.token_sequence_for_line(line).unwrap();
            for token in seq.iter() {
                let literal = token.kind.is_comment() || token.kind.is_string_like();
                for offset in token.doc_offset..token.end_offset() {
                    let found = doc.match_bracket(offset).unwrap();
                    if literal {
                        prop_assert_eq!(found, None);
                    }
                    if let Some(found) = found {
                        let target_line = doc.buffer().line_of_offset(found.target);
                        let target_seq = doc.token_sequence_for_line(target_line).unwrap();
                        let kind = target_seq.token_at_offset(found.target).map(|t| t.kind);
                        prop_assert_eq!(kind, Some(TokenKind::Separator));
                    }
                }
            }
        }
    }

    #[test]
    fn rust_literals_hide_brackets_across_lines(
        body in "[a {}()\n]{0,30}",
        nested in "[a {}\n]{0,20}",
    ) {
        let text = format!(
            "fn f() {{\n    let s = \"{}\";\n    /* x /* {} */ {} */\n}}",
            body, nested, nested
        );
        let doc = document(Language::Rust, &text);
        let last = doc.buffer().len_chars() - 1;

        prop_assert_eq!(doc.match_bracket(7).unwrap().map(|m| m.target), Some(last));
        prop_assert_eq!(doc.match_bracket(last).unwrap().map(|m| m.target), Some(7));
        let states = doc.highlighter().states();
        prop_assert_eq!(states.as_slice().last().copied(), Some(LexState::NEUTRAL));
    }
}
