//! Loaders backed by a `read_*` table function over the registered bytes.

use std::path::Path;

use polars::prelude::PolarsError;
use tracing::{debug, info};

use crate::engine::statement::{create_view_sql, describe_read_sql};
use crate::engine::{Engine, OptionValue, ReadCall, ReadFunction};
use crate::error::{EngineError, LoadError};
use crate::identifier::{derive_relation_name, format_identifier_for_sql};
use crate::CompressionFormat;

use super::{schema_from_describe, strip_compression_suffix, LoadContext, LoadResult, Loader};

/// What a scan loader reads its bytes as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScanFormat {
    Parquet,
    Json,
    /// CSV and friends, including unrecognized files.
    Delimited,
}

/// Build the read function call for `file_name`.
pub(super) fn read_call(format: ScanFormat, file_name: &str, ctx: &LoadContext) -> ReadCall {
    let lower = file_name.to_lowercase();
    match format {
        ScanFormat::Parquet => ReadCall::new(ReadFunction::Parquet, file_name),
        ScanFormat::Json if lower.ends_with(".json") => {
            ReadCall::new(ReadFunction::Json, file_name)
        }
        ScanFormat::Json => ReadCall::new(ReadFunction::Ndjson, file_name),
        ScanFormat::Delimited => csv_call(file_name, &lower, ctx),
    }
}

fn csv_call(file_name: &str, lower: &str, ctx: &LoadContext) -> ReadCall {
    let plain = strip_compression_suffix(lower);
    let delimiter = if plain.ends_with(".tsv") {
        b'\t'
    } else if plain.ends_with(".psv") {
        b'|'
    } else {
        ctx.delimiter.unwrap_or(b',')
    };

    let mut call = ReadCall::new(ReadFunction::Csv, file_name).with_option(
        "delim",
        OptionValue::Str((delimiter as char).to_string()),
    );
    if let Some(has_header) = ctx.has_header {
        call = call.with_option("header", OptionValue::Bool(has_header));
    }
    if let Some(skip) = ctx.skip_rows {
        call = call.with_option("skip", OptionValue::Int(skip as i64));
    }
    if let Some(n) = ctx.infer_schema_length {
        call = call.with_option("sample_size", OptionValue::Int(n as i64));
    }
    if ctx.ignore_errors {
        call = call.with_option("ignore_errors", OptionValue::Bool(true));
    }
    if ctx.parse_dates {
        call = call.with_option("try_parse_dates", OptionValue::Bool(true));
    }
    if let Some(compression) = CompressionFormat::from_extension(Path::new(lower)) {
        call = call.with_option(
            "compression",
            OptionValue::Str(compression.as_str().to_string()),
        );
    }
    call
}

pub(super) fn load(
    loader: Loader,
    engine: &mut dyn Engine,
    file_name: &str,
    bytes: Vec<u8>,
    call: ReadCall,
) -> Result<LoadResult, LoadError> {
    let byte_len = bytes.len();
    engine
        .register_bytes(file_name, bytes)
        .map_err(|e| LoadError::engine(file_name, e))?;

    let described = engine
        .query(&describe_read_sql(&call))
        .map_err(|e| no_columns_or(file_name, e))?;
    let schema = schema_from_describe(&described);
    if schema.is_empty() {
        return Err(LoadError::NoColumns {
            file_name: file_name.to_string(),
        });
    }

    let relation_name = derive_relation_name(file_name);
    let view_sql = create_view_sql(&relation_name, &call);
    debug!(sql = %view_sql, "creating view");
    engine
        .query(&view_sql)
        .map_err(|e| LoadError::engine(file_name, e))?;

    info!(
        file_name,
        relation = %relation_name,
        loader = loader.id(),
        columns = schema.len(),
        bytes = byte_len,
        "loaded file"
    );
    Ok(LoadResult {
        relation_identifier: format_identifier_for_sql(&relation_name),
        columns: schema.iter().map(|c| c.name.clone()).collect(),
        relation_name,
        schema,
        loader,
    })
}

/// An empty input is a file without columns, not a reader failure.
fn no_columns_or(file_name: &str, err: EngineError) -> LoadError {
    match err {
        EngineError::Polars(PolarsError::NoData(_)) => LoadError::NoColumns {
            file_name: file_name.to_string(),
        },
        other => LoadError::engine(file_name, other),
    }
}
