//! Shared CLI definitions for tabq.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output format for exported results.
#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Tab-separated values
    Tsv,
    /// Parquet columnar format
    Parquet,
    /// JSON array of row objects
    Json,
    /// JSON Lines / NDJSON (one JSON object per line)
    Ndjson,
    /// Arrow IPC file, serialized from the last in-memory result
    Arrow,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::Parquet => "Parquet",
            Self::Json => "JSON",
            Self::Ndjson => "NDJSON",
            Self::Arrow => "Arrow IPC",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::Ndjson => "jsonl",
            Self::Arrow => "arrow",
        }
    }

    /// The format a bare extension (no dot) names.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "parquet" | "pq" => Some(Self::Parquet),
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            "arrow" | "ipc" | "feather" => Some(Self::Arrow),
            _ => None,
        }
    }

    pub fn supports_compression(self) -> bool {
        matches!(self, Self::Csv | Self::Tsv | Self::Json | Self::Ndjson)
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    /// Parse a codec name or extension ("gz", "gzip", "zst", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }

    /// Codec name as used in `COMPRESSION` options and the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }
}

/// Command-line arguments for tabq
#[derive(Clone, Parser, Debug)]
#[command(
    name = "tabq",
    version,
    about = "Query tabular files with SQL",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the data file to load (not required with --generate-config or --clear-cache)
    #[arg(required_unless_present_any = ["generate_config", "clear_cache"], value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// SQL to run after loading. Defaults to selecting every column of the loaded relation
    #[arg(short = 'q', long = "query", value_name = "SQL")]
    pub query: Option<String>,

    /// Keep only rows where any column contains this text (case-insensitive)
    #[arg(long = "filter", value_name = "TEXT")]
    pub filter: Option<String>,

    /// Per-column filter as COL=TEXT, where COL is a column name or 0-based index. Repeatable
    #[arg(long = "column-filter", value_name = "COL=TEXT")]
    pub column_filters: Vec<String>,

    /// Sort the result by this column (name or 0-based index)
    #[arg(long = "sort", value_name = "COL")]
    pub sort: Option<String>,

    /// Sort descending instead of ascending (requires --sort)
    #[arg(long = "descending", requires = "sort", action)]
    pub descending: bool,

    /// Export the query result in this format
    #[arg(long = "export", value_enum, value_name = "FORMAT")]
    pub export: Option<ExportFormat>,

    /// Where to write the export (default: suggested name in the current directory)
    #[arg(short = 'o', long = "output", requires = "export", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Compress CSV/TSV/JSON/NDJSON exports (gzip, zstd, bzip2, xz)
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Delimiter to use when reading a delimited text file (ASCII value, e.g. 59 for ';')
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that the file has no header
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Skip this many rows when reading a delimited text file
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<usize>,

    /// Number of rows to use when inferring CSV schema
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Maximum number of rows to print (overrides config [display] max_rows)
    #[arg(long = "max-rows", value_name = "N")]
    pub max_rows: Option<usize>,

    /// Print the query history after running
    #[arg(long = "history", action)]
    pub history: bool,

    /// Start an interactive session after loading
    #[arg(short = 'i', long = "interactive", action)]
    pub interactive: bool,

    /// Log level for diagnostics on stderr (error, warn, info, debug, trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Clear all cache data (including persisted query history) and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at ~/.config/tabq/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if placeholder.is_empty() || !arg.get_action().takes_values() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_detection() {
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.gz")),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.zst")),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.bz2")),
            Some(CompressionFormat::Bzip2)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.xz")),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv")),
            None
        );
        assert_eq!(CompressionFormat::from_extension(Path::new("file")), None);
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(
            CompressionFormat::from_name("GZIP"),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(CompressionFormat::Zstd.as_str(), "zstd");
        assert_eq!(CompressionFormat::Bzip2.extension(), "bz2");
        assert_eq!(CompressionFormat::from_name("lz4"), None);
    }

    #[test]
    fn test_export_format_extensions() {
        for format in ExportFormat::value_variants() {
            assert_eq!(ExportFormat::from_extension(format.extension()), Some(*format));
        }
        assert!(ExportFormat::Csv.supports_compression());
        assert!(!ExportFormat::Parquet.supports_compression());
        assert!(!ExportFormat::Arrow.supports_compression());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "tabq",
            "data.csv",
            "-q",
            "SELECT 1",
            "--sort",
            "a",
            "--descending",
            "--column-filter",
            "b=x",
        ]);
        assert_eq!(args.path, Some(PathBuf::from("data.csv")));
        assert_eq!(args.query.as_deref(), Some("SELECT 1"));
        assert!(args.descending);
        assert_eq!(args.column_filters, vec!["b=x".to_string()]);
    }

    #[test]
    fn test_options_markdown_lists_query() {
        let md = render_options_markdown();
        assert!(md.contains("--query"));
        assert!(md.contains("# Command Line Options"));
    }
}
