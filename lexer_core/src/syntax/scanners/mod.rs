//! Hand-written scanners for the built-in languages.

pub mod c_like;
pub mod markup;
pub mod plain;

pub use c_like::{c_lexer, java_lexer, javascript_lexer, rust_lexer, CLikeConfig, CLikeLexer};
pub use markup::MarkupLexer;
pub use plain::PlainTextLexer;
