//! Runtime configuration loading tests
//!
//! # Running Tests
//! ```bash
//! cargo test --test config_loading
//! ```

mod common;

use std::io::Write;

use common::init_tracing;
use tempfile::NamedTempFile;
use veil_core::{ClassDefinition, ConfigError, FieldSet, Runtime, RuntimeConfig, VeilError};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_from_file() {
    init_tracing();
    let file = write_config(
        r#"
max_call_depth = 64
private_sigil = "$"
strict_modifiers = false
"#,
    );

    let config = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.max_call_depth, 64);
    assert_eq!(config.private_sigil, "$");
    assert!(!config.strict_modifiers);

    let rt = Runtime::with_config(config).unwrap();
    assert_eq!(rt.config().max_call_depth, 64);
}

#[test]
fn test_partial_file_keeps_defaults() {
    init_tracing();
    let file = write_config("max_call_depth = 16\n");

    let config = RuntimeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.max_call_depth, 16);
    assert_eq!(config.private_sigil, "#");
    assert!(config.strict_modifiers);
}

#[test]
fn test_missing_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let result = RuntimeConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_unknown_key_rejected() {
    init_tracing();
    let file = write_config("max_depth = 3\n");
    assert!(matches!(
        RuntimeConfig::from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_invalid_values_rejected() {
    init_tracing();
    let file = write_config("private_sigil = \"\"\n");
    assert!(matches!(
        RuntimeConfig::from_file(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_lenient_modifiers_from_config() {
    init_tracing();
    let file = write_config("strict_modifiers = false\n");
    let config = RuntimeConfig::from_file(file.path()).unwrap();
    let mut rt = Runtime::with_config(config).unwrap();

    let class = rt
        .register(
            ClassDefinition::new("Lenient")
                .fields(|| FieldSet::new().field("volatile private x", 1)),
        )
        .unwrap();
    assert!(rt.construct(&class, &[]).is_ok());

    let mut strict = Runtime::new();
    assert!(matches!(
        strict.register(
            ClassDefinition::new("Strict")
                .fields(|| FieldSet::new().field("volatile private x", 1)),
        ),
        Err(VeilError::InvalidFieldSpec { .. })
    ));
}
