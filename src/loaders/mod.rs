//! Format loaders: pick one by file name, then turn bytes into a named relation.

mod arrow;
mod scan;

use polars::prelude::*;

use crate::config::FileLoadingConfig;
use crate::engine::Engine;
use crate::error::LoadError;

use scan::ScanFormat;

/// Column name and engine type of a loaded relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

/// What a successful load hands back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub relation_name: String,
    pub relation_identifier: String,
    pub columns: Vec<String>,
    pub schema: Vec<ColumnSchema>,
    pub loader: Loader,
}

/// Reader options applied to delimited text files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadContext {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub infer_schema_length: Option<usize>,
    pub ignore_errors: bool,
    pub parse_dates: bool,
}

impl From<&FileLoadingConfig> for LoadContext {
    fn from(config: &FileLoadingConfig) -> Self {
        Self {
            delimiter: config.delimiter,
            has_header: config.has_header,
            skip_rows: config.skip_rows,
            infer_schema_length: config.infer_schema_length,
            ignore_errors: config.ignore_errors,
            parse_dates: config.parse_dates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    Parquet,
    Arrow,
    Json,
    Csv,
    /// Anything unrecognized is read as comma-separated text.
    Default,
}

const PARQUET_SUFFIXES: &[&str] = &[".parquet", ".pq"];
const ARROW_SUFFIXES: &[&str] = &[".arrow", ".ipc", ".feather", ".arrows"];
const JSON_SUFFIXES: &[&str] = &[".json", ".jsonl", ".ndjson"];
const CSV_SUFFIXES: &[&str] = &[".csv", ".tsv", ".psv", ".txt"];
const COMPRESSION_SUFFIXES: &[&str] = &[".gz", ".zst", ".bz2", ".xz"];

impl Loader {
    /// Loaders with a suffix test, in selection priority.
    pub const PRIORITY: [Loader; 4] = [Loader::Parquet, Loader::Arrow, Loader::Json, Loader::Csv];

    /// The first loader in [`Loader::PRIORITY`] that accepts `file_name`, else [`Loader::Default`].
    pub fn select(file_name: &str) -> Loader {
        Self::PRIORITY
            .into_iter()
            .find(|loader| loader.can_load(file_name))
            .unwrap_or(Loader::Default)
    }

    pub fn id(self) -> &'static str {
        match self {
            Loader::Parquet => "parquet",
            Loader::Arrow => "arrow",
            Loader::Json => "json",
            Loader::Csv => "csv",
            Loader::Default => "default",
        }
    }

    pub fn can_load(self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        match self {
            Loader::Parquet => has_suffix(&lower, PARQUET_SUFFIXES),
            Loader::Arrow => has_suffix(&lower, ARROW_SUFFIXES),
            Loader::Json => has_suffix(&lower, JSON_SUFFIXES),
            Loader::Csv => has_suffix(strip_compression_suffix(&lower), CSV_SUFFIXES),
            Loader::Default => true,
        }
    }

    pub fn load(
        self,
        engine: &mut dyn Engine,
        file_name: &str,
        bytes: Vec<u8>,
        ctx: &LoadContext,
    ) -> Result<LoadResult, LoadError> {
        let format = match self {
            Loader::Arrow => return arrow::load(engine, file_name, &bytes),
            Loader::Parquet => ScanFormat::Parquet,
            Loader::Json => ScanFormat::Json,
            Loader::Csv | Loader::Default => ScanFormat::Delimited,
        };
        let call = scan::read_call(format, file_name, ctx);
        scan::load(self, engine, file_name, bytes, call)
    }
}

fn has_suffix(lower: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| lower.ends_with(s))
}

/// `"x.csv.gz"` -> `"x.csv"`; other names are returned unchanged.
pub(crate) fn strip_compression_suffix(lower: &str) -> &str {
    COMPRESSION_SUFFIXES
        .iter()
        .find_map(|s| lower.strip_suffix(s))
        .unwrap_or(lower)
}

/// Pull `{name, type}` pairs out of a `DESCRIBE` result.
///
/// Accepts `column_name`/`name` for the name and `column_type`/`type`/`data_type`
/// for the type. A blank name becomes `column_<position>` (1-based) so the column stays
/// addressable; a missing type is `"unknown"`.
pub(crate) fn schema_from_describe(df: &DataFrame) -> Vec<ColumnSchema> {
    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|name| df.column(name).ok())
    };
    let Some(names) = find(&["column_name", "name"]) else {
        return Vec::new();
    };
    let types = find(&["column_type", "type", "data_type"]);

    let mut schema = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let name = match names.get(i) {
            Ok(AnyValue::Null) | Err(_) => String::new(),
            Ok(v) => v.str_value().trim().to_string(),
        };
        let name = if name.is_empty() {
            format!("column_{}", i + 1)
        } else {
            name
        };
        let data_type = types
            .and_then(|t| t.get(i).ok())
            .filter(|v| !matches!(v, AnyValue::Null))
            .map(|v| v.str_value().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        schema.push(ColumnSchema { name, data_type });
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_priority() {
        assert_eq!(Loader::select("a.parquet"), Loader::Parquet);
        assert_eq!(Loader::select("A.PQ"), Loader::Parquet);
        assert_eq!(Loader::select("a.feather"), Loader::Arrow);
        assert_eq!(Loader::select("a.arrows"), Loader::Arrow);
        assert_eq!(Loader::select("a.ndjson"), Loader::Json);
        assert_eq!(Loader::select("a.TSV"), Loader::Csv);
        assert_eq!(Loader::select("a.csv.gz"), Loader::Csv);
        assert_eq!(Loader::select("a.psv.zst"), Loader::Csv);
        assert_eq!(Loader::select("a.dat"), Loader::Default);
        assert_eq!(Loader::select("a.gz"), Loader::Default);
        assert_eq!(Loader::select(""), Loader::Default);
    }

    #[test]
    fn test_can_load_is_suffix_only() {
        assert!(!Loader::Csv.can_load("csv"));
        assert!(!Loader::Parquet.can_load("parquet.csv"));
        assert!(Loader::Default.can_load("anything"));
    }

    #[test]
    fn test_schema_from_describe_fallbacks() {
        let df = df!(
            "name" => [Some("a"), Some(""), None, Some("b")],
            "data_type" => [Some("INTEGER"), Some("X"), Some("Y"), None]
        )
        .unwrap();
        let schema: Vec<(String, String)> = schema_from_describe(&df)
            .into_iter()
            .map(|c| (c.name, c.data_type))
            .collect();
        let expected = [
            ("a", "INTEGER"),
            ("column_2", "X"),
            ("column_3", "Y"),
            ("b", "unknown"),
        ];
        assert_eq!(
            schema,
            expected
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_schema_from_describe_without_name_column() {
        let df = df!("other" => ["a"]).unwrap();
        assert!(schema_from_describe(&df).is_empty());
    }
}
