//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to change:
//!
//! ```toml
//! max_line_scan = 4000
//! parser_delay_ms = 800
//! default_language = "text/java"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for tokenization and background parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters scanned per line before the rest is reported as an error
    /// token.
    pub max_line_scan: usize,
    /// Idle time after the last edit before background parsers run.
    pub parser_delay_ms: u64,
    /// Language identifier used when none is detected.
    pub default_language: String,
    /// Split URLs in comments and strings into hyperlink tokens.
    pub detect_hyperlinks: bool,
    /// Validate every produced token sequence (always on in debug builds).
    pub validate_tokens: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_line_scan: 10_000,
            parser_delay_ms: 1_250,
            default_language: "text/plain".to_string(),
            detect_hyperlinks: true,
            validate_tokens: false,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.max_line_scan = config.max_line_scan.max(1);
        Ok(config)
    }

    /// Loads a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Debounce delay for background parsers.
    pub fn parser_delay(&self) -> Duration {
        Duration::from_millis(self.parser_delay_ms)
    }

    /// Whether produced sequences should be validated.
    pub fn should_validate(&self) -> bool {
        self.validate_tokens || cfg!(debug_assertions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_line_scan, 10_000);
        assert_eq!(config.parser_delay(), Duration::from_millis(1_250));
        assert!(config.detect_hyperlinks);
    }

    #[test]
    fn test_partial_toml() {
        let text = "parser_delay_ms = 10\ndefault_language = \"text/java\"";
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.parser_delay_ms, 10);
        assert_eq!(config.default_language, "text/java");
        assert_eq!(config.max_line_scan, 10_000);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let config = EngineConfig::from_toml_str("max_line_scan = 0").unwrap();
        assert_eq!(config.max_line_scan, 1);
    }

    #[test]
    fn test_invalid_toml() {
        let text = "max_line_scan = \"lots\"";
        assert!(EngineConfig::from_toml_str(text).is_err());
    }
}
