//! File and `.env` layering tests.

use std::fs;

use keystone_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::TempDir;

#[test]
fn test_toml_file_over_preset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystone.toml");
    fs::write(
        &path,
        r#"
            [app]
            name = "blog"

            [logging]
            level = "keystone_dispatch=trace,info"
        "#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_production()
        .with_file(&path)
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.app.name, "blog");
    assert_eq!(config.app.run_mode, "prod");
    assert_eq!(config.logging.level, "keystone_dispatch=trace,info");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystone.json");
    fs::write(&path, r#"{"dispatch": {"publish_run_mode": false}}"#).unwrap();

    let config = ConfigLoader::new()
        .with_optional_file(&path)
        .unwrap()
        .load()
        .unwrap();

    assert!(!config.dispatch.publish_run_mode);
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystone.yaml");
    fs::write(&path, "app:\n  name: blog\n").unwrap();

    let result = ConfigLoader::new().with_file(&path);
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}

#[test]
fn test_malformed_toml_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keystone.toml");
    fs::write(&path, "[app\nname = ").unwrap();

    let result = ConfigLoader::new().with_file(&path);
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn test_dotenv_file_feeds_env_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    fs::write(
        &path,
        "KEYSTONE_DOTENV_TEST__APP__RUN_MODE=qa\nKEYSTONE_DOTENV_TEST__LOGGING__FORMAT=pretty\n",
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_dotenv_file(&path)
        .unwrap()
        .with_env_prefix("KEYSTONE_DOTENV_TEST")
        .load()
        .unwrap();

    assert_eq!(config.app.run_mode, "qa");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_missing_dotenv_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new().with_dotenv_file(dir.path().join("missing.env"));
    assert!(matches!(result, Err(ConfigError::Dotenv(_))));
}
