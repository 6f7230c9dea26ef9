use std::fs;
use tabq::config::{AppConfig, ConfigManager, LogFormat};
use tabq::CompressionFormat;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

fn write_config(config_manager: &ConfigManager, content: &str) {
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");
    fs::write(config_manager.config_path("config.toml"), content).expect("Failed to write config");
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");

    assert_eq!(config.file_loading.delimiter, None);
    assert_eq!(config.file_loading.has_header, None);
    assert!(!config.file_loading.ignore_errors);

    assert_eq!(config.query.history_limit, 25);
    assert!(!config.query.persist_history);
    assert_eq!(config.query.default_limit, None);

    assert_eq!(config.export.csv_delimiter, b',');
    assert!(config.export.csv_include_header);
    assert_eq!(config.export.compression, None);

    assert_eq!(config.display.max_rows, 50);
    assert_eq!(config.display.max_column_width, 40);
    assert_eq!(config.display.null_display, "");

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager
        .generate_default_config()
        .expect("Failed to generate config");

    for section in ["[file_loading]", "[query]", "[export]", "[display]", "[logging]"] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[display]"));
    assert!(content.contains("version = \"0.1\""));
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let first_path = config_manager
        .write_default_config(false)
        .expect("First write should succeed");
    let second_path = config_manager
        .write_default_config(true)
        .expect("Second write with force should succeed");

    assert_eq!(first_path, second_path);
    assert!(first_path.exists());
}

#[test]
fn test_generated_config_loads_as_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    let config = AppConfig::load_from(&config_manager).expect("Should load generated config");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_config_with_no_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).expect("Should load default config");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_and_parse_minimal_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(
        &config_manager,
        r#"
[query]
history_limit = 10
persist_history = true
"#,
    );

    let config = AppConfig::load_from(&config_manager).expect("Failed to load config");
    assert_eq!(config.query.history_limit, 10);
    assert!(config.query.persist_history);
    // Untouched sections keep their defaults
    assert_eq!(config.display.max_rows, 50);
    assert_eq!(config.export.csv_delimiter, b',');
}

#[test]
fn test_parse_full_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(
        &config_manager,
        r#"
version = "0.1"

[file_loading]
delimiter = 59
has_header = false
skip_rows = 2
infer_schema_length = 500
ignore_errors = true
parse_dates = true

[query]
history_limit = 5
default_limit = 100

[export]
csv_delimiter = 124
csv_include_header = false
compression = "zstd"

[display]
max_rows = 20
max_column_width = 12
null_display = "NULL"

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = AppConfig::load_from(&config_manager).expect("Failed to load config");
    assert_eq!(config.file_loading.delimiter, Some(b';'));
    assert_eq!(config.file_loading.has_header, Some(false));
    assert_eq!(config.file_loading.skip_rows, Some(2));
    assert_eq!(config.file_loading.infer_schema_length, Some(500));
    assert!(config.file_loading.ignore_errors);
    assert!(config.file_loading.parse_dates);
    assert_eq!(config.query.history_limit, 5);
    assert_eq!(config.query.default_limit, Some(100));
    assert_eq!(config.export.csv_delimiter, b'|');
    assert!(!config.export.csv_include_header);
    assert_eq!(config.export.compression, Some(CompressionFormat::Zstd));
    assert_eq!(config.display.max_rows, 20);
    assert_eq!(config.display.max_column_width, 12);
    assert_eq!(config.display.null_display, "NULL");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_invalid_config_is_rejected_on_load() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "[query]\nhistory_limit = 0\n");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("history_limit"));
}

#[test]
fn test_unparseable_config_names_the_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "[display\nmax_rows = ");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_validate_config_invalid_version() {
    let mut config = AppConfig::default();
    config.version = "2.0".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Unsupported config version"));
}

#[test]
fn test_merge_does_not_override_with_defaults() {
    let mut base = AppConfig::default();
    base.display.max_rows = 7;
    base.export.compression = Some(CompressionFormat::Gzip);

    base.merge(AppConfig::default());

    assert_eq!(base.display.max_rows, 7);
    assert_eq!(base.export.compression, Some(CompressionFormat::Gzip));
}
