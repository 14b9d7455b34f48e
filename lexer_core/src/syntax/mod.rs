//! Syntax module.
//!
//! Line-oriented tokenization with a cached end-of-line state per line, kept
//! consistent incrementally as the buffer is edited.

mod highlighter;
mod hyperlink;
mod language;
mod lexer;
pub mod scanners;
mod state_cache;
mod token;

pub use highlighter::{Damage, SyntaxHighlighter};
pub use hyperlink::mark_hyperlinks;
pub use language::{Language, LanguageRegistry};
pub use lexer::{
    last_state_capped, tokenize_capped, EmbeddedSink, LexState, Lexer, LineComment, StateOnly,
    TokenSink,
};
pub use state_cache::{LineStateCache, Propagation};
pub use token::{Token, TokenKind, TokenSequence, TokenSequenceBuilder};
