//! Turns the current query into bytes in a requested format.
//!
//! Row-oriented formats go through `COPY ... TO` inside the engine. Arrow IPC is written
//! straight from the executor's cached frame when that frame came from the current query
//! text, and the query is run first otherwise. Nothing here touches the disk.

use polars::prelude::*;
use tracing::info;

use crate::config::ExportConfig;
use crate::engine::statement::strip_terminators;
use crate::engine::{CopyFormat, CopyOptions, CopyStatement, Engine};
use crate::error::ExportError;
use crate::executor::Executor;
use crate::{CompressionFormat, ExportFormat};

/// Base name of the suggested file when no relation is loaded.
pub const DEFAULT_EXPORT_NAME: &str = "query_result";

/// Virtual file `COPY` writes into before the bytes are read back.
const EXPORT_TARGET: &str = "__tabq_export";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub csv_delimiter: u8,
    pub include_header: bool,
    pub compression: Option<CompressionFormat>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            csv_delimiter: config.csv_delimiter,
            include_header: config.csv_include_header,
            compression: config.compression,
        }
    }
}

/// Encoded export, ready for the host to save.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

pub fn export(
    engine: &mut dyn Engine,
    executor: &mut Executor,
    format: ExportFormat,
    query_text: &str,
    relation_name: Option<&str>,
    options: &ExportOptions,
) -> Result<ExportArtifact, ExportError> {
    let query = strip_terminators(query_text);
    if query.is_empty() {
        return Err(ExportError::MissingQuery);
    }
    if let Some(compression) = options.compression {
        if !format.supports_compression() {
            return Err(ExportError::UnsupportedCompression {
                format: format.as_str(),
                compression: compression.as_str(),
            });
        }
    }

    let bytes = match format {
        ExportFormat::Arrow => arrow_bytes(engine, executor, query)?,
        _ => copy_bytes(engine, format, query, options)?,
    };

    let file_name = suggested_file_name(relation_name, format, options.compression);
    info!(
        format = format.as_str(),
        file_name = %file_name,
        bytes = bytes.len(),
        "export ready"
    );
    Ok(ExportArtifact {
        file_name,
        format,
        bytes,
    })
}

/// `<relation or query_result>.<ext>[.<compression ext>]`
pub fn suggested_file_name(
    relation_name: Option<&str>,
    format: ExportFormat,
    compression: Option<CompressionFormat>,
) -> String {
    let base = relation_name
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_EXPORT_NAME);
    match compression.filter(|_| format.supports_compression()) {
        Some(c) => format!("{}.{}.{}", base, format.extension(), c.extension()),
        None => format!("{}.{}", base, format.extension()),
    }
}

fn copy_bytes(
    engine: &mut dyn Engine,
    format: ExportFormat,
    query: &str,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let copy_format = match format {
        ExportFormat::Csv | ExportFormat::Tsv => CopyFormat::Csv,
        ExportFormat::Parquet => CopyFormat::Parquet,
        ExportFormat::Json => CopyFormat::Json,
        ExportFormat::Ndjson | ExportFormat::Arrow => CopyFormat::Ndjson,
    };
    let mut copy_options = CopyOptions::new(copy_format);
    copy_options.header = options.include_header;
    copy_options.delimiter = if format == ExportFormat::Tsv {
        b'\t'
    } else {
        options.csv_delimiter
    };
    copy_options.compression = options.compression;

    let target = format!("{}.{}", EXPORT_TARGET, format.extension());
    let statement = CopyStatement {
        query: query.to_string(),
        target: target.clone(),
        options: copy_options,
    };
    engine.query(&statement.to_sql())?;
    let bytes = engine.copy_bytes_out(&target);
    engine.drop_virtual_file(&target)?;
    Ok(bytes?)
}

fn arrow_bytes(
    engine: &mut dyn Engine,
    executor: &mut Executor,
    query: &str,
) -> Result<Vec<u8>, ExportError> {
    if executor.frame_for(query).is_none() {
        executor
            .execute(engine, query)
            .map_err(|e| ExportError::NoResult(e.to_string()))?;
    }
    let mut frame = executor
        .frame_for(query)
        .cloned()
        .ok_or_else(|| ExportError::NoResult("the query produced no result".to_string()))?;

    let mut buf = Vec::new();
    IpcWriter::new(&mut buf).finish(&mut frame)?;
    Ok(buf)
}
