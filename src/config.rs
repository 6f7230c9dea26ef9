use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::CompressionFormat;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate the default configuration as commented-out TOML.
    ///
    /// Every field is commented so defaults apply; users uncomment what they want to override.
    pub fn generate_default_config(&self) -> Result<String> {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        Ok(Self::comment_all_fields(toml_str, Self::collect_all_comments()))
    }

    /// Collect all field comments from struct constants into a map
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }

        let sections: [(&str, &[(&str, &str)]); 5] = [
            ("file_loading", FILE_LOADING_COMMENTS),
            ("query", QUERY_COMMENTS),
            ("export", EXPORT_COMMENTS),
            ("display", DISPLAY_COMMENTS),
            ("logging", LOGGING_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }

        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Option fields that serialize to nothing are added back as `# field = null`.
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# tabq configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();

                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| s == &section) {
                    result.push_str(header.1);
                    result.push('\n');
                }

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add Option fields that weren't serialized because they're None
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = [
            "file_loading.delimiter",
            "file_loading.has_header",
            "file_loading.skip_rows",
            "file_loading.infer_schema_length",
            "query.default_limit",
            "export.compression",
        ];

        let mut missing_by_section: Vec<(&str, Vec<&str>)> = Vec::new();
        for field_path in option_fields {
            if seen_fields.contains(field_path) || !comments.contains_key(field_path) {
                continue;
            }
            if let Some((section, _)) = field_path.split_once('.') {
                match missing_by_section.iter_mut().find(|(s, _)| *s == section) {
                    Some((_, fields)) => fields.push(field_path),
                    None => missing_by_section.push((section, vec![field_path])),
                }
            }
        }

        for (section, fields) in &missing_by_section {
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            for field_path in fields {
                if let Some(comment) = comments.get(*field_path) {
                    for comment_line in comment.lines() {
                        new_content.push_str("# ");
                        new_content.push_str(comment_line);
                        new_content.push('\n');
                    }
                }
                let field_name = field_path.rsplit('.').next().unwrap_or(field_path);
                new_content.push_str(&format!("# {} = null\n", field_name));
            }

            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[query]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let eq_pos = trimmed.find('=')?;
        let field_name = trimmed[..eq_pos].trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;

        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub query: QueryConfig,
    pub export: ExportConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

pub const CONFIG_VERSION: &str = "0.1";

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "file_loading",
        "# ============================================================================\n# File Loading Defaults\n# ============================================================================\n# Applied to CSV, TSV, PSV and unrecognized files",
    ),
    (
        "query",
        "# ============================================================================\n# Query Execution and History\n# ============================================================================",
    ),
    (
        "export",
        "# ============================================================================\n# Export\n# ============================================================================",
    ),
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================\n# RUST_LOG, when set, overrides level",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub infer_schema_length: Option<usize>,
    pub ignore_errors: bool,
    pub parse_dates: bool,
}

// Format: (field_name, comment_text)
const FILE_LOADING_COMMENTS: &[(&str, &str)] = &[
    (
        "delimiter",
        "Default delimiter for delimited files (as ASCII value, e.g., 59 for ';')\n.tsv and .psv files always use tab and '|'",
    ),
    (
        "has_header",
        "Whether the first row is a header. null = reader default (true)",
    ),
    ("skip_rows", "Number of rows to skip before the header"),
    (
        "infer_schema_length",
        "Number of rows sampled when inferring column types",
    ),
    (
        "ignore_errors",
        "Skip rows that fail to parse instead of failing the load",
    ),
    (
        "parse_dates",
        "Try to parse string columns as dates and datetimes",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub history_limit: usize,
    pub persist_history: bool,
    pub default_limit: Option<usize>,
}

const QUERY_COMMENTS: &[(&str, &str)] = &[
    (
        "history_limit",
        "Maximum number of queries to keep in history",
    ),
    (
        "persist_history",
        "Save query history to the cache directory between runs",
    ),
    (
        "default_limit",
        "Append LIMIT n to the query generated after loading a file",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub csv_delimiter: u8,
    pub csv_include_header: bool,
    pub compression: Option<CompressionFormat>,
}

const EXPORT_COMMENTS: &[(&str, &str)] = &[
    (
        "csv_delimiter",
        "Delimiter for CSV exports (as ASCII value, e.g., 44 for comma)",
    ),
    ("csv_include_header", "Write a header row in CSV and TSV exports"),
    (
        "compression",
        "Compression for CSV, TSV, JSON and NDJSON exports: \"gzip\", \"zstd\", \"bzip2\" or \"xz\"",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_rows: usize,
    pub max_column_width: usize,
    pub null_display: String,
}

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    ("max_rows", "Maximum number of rows printed for a result"),
    (
        "max_column_width",
        "Cells wider than this are truncated when printed",
    ),
    ("null_display", "Text shown for null values"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[
    (
        "level",
        "Minimum level written to stderr: \"error\", \"warn\", \"info\", \"debug\" or \"trace\"",
    ),
    ("format", "Log line format: \"compact\" or \"json\""),
];

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            file_loading: FileLoadingConfig::default(),
            query: QueryConfig::default(),
            export: ExportConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            history_limit: 25,
            persist_history: false,
            default_limit: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            csv_include_header: true,
            compression: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_rows: 50,
            max_column_width: 40,
            null_display: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load using an explicit config directory
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = manager.config_path("config.toml");

        config.merge(Self::load_user_config(&config_path)?);

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.query.merge(other.query);
        self.export.merge(other.export);
        self.display.merge(other.display);
        self.logging.merge(other.logging);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with(CONFIG_VERSION) {
            return Err(eyre!(
                "Unsupported config version: {}. Expected {}.x",
                self.version,
                CONFIG_VERSION
            ));
        }

        if self.query.history_limit == 0 {
            return Err(eyre!("history_limit must be greater than 0"));
        }

        if self.display.max_column_width < 3 {
            return Err(eyre!("max_column_width must be at least 3"));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(eyre!(
                "Invalid log level: {}. Must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.skip_rows.is_some() {
            self.skip_rows = other.skip_rows;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.ignore_errors {
            self.ignore_errors = true;
        }
        if other.parse_dates {
            self.parse_dates = true;
        }
    }
}

impl QueryConfig {
    pub fn merge(&mut self, other: Self) {
        let default = QueryConfig::default();
        if other.history_limit != default.history_limit {
            self.history_limit = other.history_limit;
        }
        if other.persist_history != default.persist_history {
            self.persist_history = other.persist_history;
        }
        if other.default_limit.is_some() {
            self.default_limit = other.default_limit;
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ExportConfig::default();
        if other.csv_delimiter != default.csv_delimiter {
            self.csv_delimiter = other.csv_delimiter;
        }
        if other.csv_include_header != default.csv_include_header {
            self.csv_include_header = other.csv_include_header;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.max_rows != default.max_rows {
            self.max_rows = other.max_rows;
        }
        if other.max_column_width != default.max_column_width {
            self.max_column_width = other.max_column_width;
        }
        if other.null_display != default.null_display {
            self.null_display = other.null_display;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        if other.level != default.level {
            self.level = other.level;
        }
        if other.format != default.format {
            self.format = other.format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.history_limit, 25);
        assert_eq!(config.export.csv_delimiter, b',');
    }

    #[test]
    fn test_generated_template_parses_back_to_defaults() {
        let manager = ConfigManager::with_dir(PathBuf::from("/nonexistent"));
        let template = manager.generate_default_config().unwrap();
        assert!(template.contains("# [query]"));
        assert!(template.contains("# history_limit = 25"));
        assert!(template.contains("# default_limit = null"));
        assert!(template.contains("# compression = null"));
        // Everything is commented out, so parsing yields defaults.
        let parsed: AppConfig = toml::from_str(&template).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_option_fields_land_in_their_section() {
        let manager = ConfigManager::with_dir(PathBuf::from("/nonexistent"));
        let template = manager.generate_default_config().unwrap();
        let export_pos = template.find("# [export]").unwrap();
        let display_pos = template.find("# [display]").unwrap();
        let compression_pos = template.find("# compression = null").unwrap();
        assert!(export_pos < compression_pos && compression_pos < display_pos);
    }

    #[test]
    fn test_merge_prefers_non_default_values() {
        let mut base = AppConfig::default();
        let mut user = AppConfig::default();
        user.query.history_limit = 5;
        user.file_loading.delimiter = Some(b';');
        user.export.compression = Some(CompressionFormat::Zstd);
        base.merge(user);
        assert_eq!(base.query.history_limit, 5);
        assert_eq!(base.file_loading.delimiter, Some(b';'));
        assert_eq!(base.export.compression, Some(CompressionFormat::Zstd));
        assert_eq!(base.display.max_rows, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.query.history_limit = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.version = "9.0".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }
}
