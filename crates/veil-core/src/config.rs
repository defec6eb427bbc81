//! Runtime configuration (veil.toml)
//!
//! ```toml
//! max_call_depth = 256
//! private_sigil = "#"
//! strict_modifiers = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum nesting of managed constructor and method calls
    pub max_call_depth: usize,

    /// Reserved key that requests a private view of its target
    pub private_sigil: String,

    /// Reject unknown modifier words in field keys instead of ignoring them
    pub strict_modifiers: bool,
}

fn default_private_sigil() -> String {
    "#".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 512,
            private_sigil: default_private_sigil(),
            strict_modifiers: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_call_depth must be at least 1".to_string(),
            ));
        }
        if self.private_sigil.is_empty() {
            return Err(ConfigError::ValidationError(
                "private_sigil must not be empty".to_string(),
            ));
        }
        if self.private_sigil.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "private_sigil '{}' must not contain whitespace",
                self.private_sigil
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_call_depth, 512);
        assert_eq!(config.private_sigil, "#");
        assert!(config.strict_modifiers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str("max_call_depth = 16").unwrap();
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.private_sigil, "#");
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            max_call_depth = 64
            private_sigil = "@private"
            strict_modifiers = false
        "#;
        let config = RuntimeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.private_sigil, "@private");
        assert!(!config.strict_modifiers);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RuntimeConfig::from_toml_str("max_depth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation() {
        let err = RuntimeConfig::from_toml_str("max_call_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = RuntimeConfig::from_toml_str("private_sigil = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = RuntimeConfig::from_toml_str("private_sigil = \"a b\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
