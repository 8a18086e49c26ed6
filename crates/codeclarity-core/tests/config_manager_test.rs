// ABOUTME: Exercises config file round-trips through ConfigManager
// ABOUTME: Uses temporary directories so no user configuration is touched

use codeclarity_core::{CodeClarityConfig, ConfigError, ConfigManager};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_create_default_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&path).unwrap();
    assert!(path.exists());

    let loaded = ConfigManager::read_toml_file(&path).unwrap();
    let defaults = CodeClarityConfig::default();
    assert_eq!(loaded.llm.provider, defaults.llm.provider);
    assert_eq!(loaded.llm.max_tokens, defaults.llm.max_tokens);
    assert_eq!(loaded.logging.format, defaults.logging.format);
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[llm]
provider = "lmstudio"
model = "deepseek-coder"
"#,
    )
    .unwrap();

    let config = ConfigManager::read_toml_file(&path).unwrap();
    assert_eq!(config.llm.provider, "lmstudio");
    assert_eq!(config.llm.model.as_deref(), Some("deepseek-coder"));
    assert_eq!(config.llm.lmstudio_url, "http://localhost:1234");
    assert_eq!(config.logging.level, "warn");
    assert!(config.llm.json_schema);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[llm\nprovider = ").unwrap();

    match ConfigManager::read_toml_file(&path) {
        Err(ConfigError::ParseError(_)) => {}
        other => panic!("expected parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_load_from_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        ConfigManager::load_from(&path),
        Err(ConfigError::NotFound(_))
    ));
}
