//! Language detection and the lexer registry.
//!
//! Detects languages from file extensions and maps language identifiers
//! (`text/java`, `text/html`, ...) to scanner implementations.

use super::lexer::Lexer;
use super::scanners::{
    c_lexer, java_lexer, javascript_lexer, rust_lexer, MarkupLexer, PlainTextLexer,
};
use crate::error::{LexerError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Built-in languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Java,
    JavaScript,
    Rust,
    Html,
    PlainText,
}

impl Language {
    /// Returns all built-in languages.
    pub fn all() -> &'static [Language] {
        &[
            Language::C,
            Language::Java,
            Language::JavaScript,
            Language::Rust,
            Language::Html,
            Language::PlainText,
        ]
    }

    /// Detects language from a file path based on extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::PlainText)
    }

    /// Detects language from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "c" | "h" => Self::C,
            "java" => Self::Java,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "rs" => Self::Rust,
            "html" | "htm" | "xhtml" | "xml" => Self::Html,
            _ => Self::PlainText,
        }
    }

    /// Looks up a built-in language by identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|lang| lang.id() == id)
    }

    /// Registry identifier of the language.
    pub fn id(&self) -> &'static str {
        match self {
            Self::C => "text/c",
            Self::Java => "text/java",
            Self::JavaScript => "text/javascript",
            Self::Rust => "text/rust",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
        }
    }

    /// Returns the display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Java => "Java",
            Self::JavaScript => "JavaScript",
            Self::Rust => "Rust",
            Self::Html => "HTML",
            Self::PlainText => "Plain Text",
        }
    }

    /// Creates the scanner for this language.
    pub fn lexer(&self) -> Arc<dyn Lexer> {
        match self {
            Self::C => Arc::new(c_lexer()),
            Self::Java => Arc::new(java_lexer()),
            Self::JavaScript => Arc::new(javascript_lexer()),
            Self::Rust => Arc::new(rust_lexer()),
            Self::Html => Arc::new(MarkupLexer::new()),
            Self::PlainText => Arc::new(PlainTextLexer),
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::PlainText
    }
}

/// Maps language identifiers to scanners.
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    lexers: HashMap<String, Arc<dyn Lexer>>,
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl LanguageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in language.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for language in Language::all() {
            registry.register(language.id(), language.lexer());
        }
        registry
    }

    /// Registers a scanner. A later registration under the same identifier
    /// replaces the earlier one.
    pub fn register(&mut self, id: impl Into<String>, lexer: Arc<dyn Lexer>) {
        self.lexers.insert(id.into(), lexer);
    }

    /// Looks up the scanner for an identifier.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Lexer>> {
        self.lexers
            .get(id)
            .cloned()
            .ok_or_else(|| LexerError::UnknownLanguage(id.to_string()))
    }

    /// Whether an identifier is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.lexers.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.lexers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("c"), Language::C);
        assert_eq!(Language::from_extension("JAVA"), Language::Java);
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("html"), Language::Html);
        assert_eq!(Language::from_extension("txt"), Language::PlainText);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path(Path::new("Main.java")), Language::Java);
        assert_eq!(
            Language::from_path(Path::new("/path/to/index.html")),
            Language::Html
        );
        assert_eq!(
            Language::from_path(Path::new("README")),
            Language::PlainText
        );
    }

    #[test]
    fn test_ids_round_trip() {
        for language in Language::all() {
            assert_eq!(Language::from_id(language.id()), Some(*language));
            assert_eq!(language.lexer().name(), language.name());
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = LanguageRegistry::with_builtin();
        assert_eq!(registry.ids().len(), Language::all().len());
        assert_eq!(
            registry.get("text/java").map(|l| l.name()).ok(),
            Some("Java")
        );
        assert!(matches!(
            registry.get("text/cobol"),
            Err(LexerError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_registry_override() {
        let mut registry = LanguageRegistry::with_builtin();
        registry.register("text/java", Arc::new(PlainTextLexer));
        assert_eq!(
            registry.get("text/java").map(|l| l.name()).ok(),
            Some("Plain Text")
        );
    }
}
