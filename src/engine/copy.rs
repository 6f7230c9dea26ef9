//! `COPY ... TO` options and the writers behind them.

use std::io::Write;

use polars::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::CompressionFormat;

use super::statement::{NamedOptions, OptionValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyFormat {
    Csv,
    Parquet,
    /// JSON array of row objects
    Json,
    /// One JSON object per line
    Ndjson,
}

impl CopyFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyOptions {
    pub format: CopyFormat,
    pub header: bool,
    pub delimiter: u8,
    pub compression: Option<CompressionFormat>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            format: CopyFormat::Csv,
            header: true,
            delimiter: b',',
            compression: None,
        }
    }
}

impl CopyOptions {
    pub fn new(format: CopyFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub(super) fn from_named(options: &NamedOptions) -> EngineResult<Self> {
        let mut out = Self::default();
        for (key, value) in options {
            match key.as_str() {
                "format" => {
                    let name = value.as_text();
                    out.format = CopyFormat::from_name(&name).ok_or_else(|| {
                        EngineError::InvalidStatement(format!("unsupported COPY format '{}'", name))
                    })?;
                    if name.eq_ignore_ascii_case("tsv") {
                        out.delimiter = b'\t';
                    }
                }
                "header" => {
                    out.header = value.as_bool().ok_or_else(|| {
                        EngineError::InvalidStatement("HEADER expects a boolean".to_string())
                    })?;
                }
                "delimiter" | "delim" | "sep" => out.delimiter = single_byte(value)?,
                "compression" => {
                    let name = value.as_text();
                    out.compression = match name.to_ascii_lowercase().as_str() {
                        "none" | "uncompressed" => None,
                        other => Some(CompressionFormat::from_name(other).ok_or_else(|| {
                            EngineError::InvalidStatement(format!(
                                "unsupported COPY compression '{}'",
                                name
                            ))
                        })?),
                    };
                }
                other => {
                    return Err(EngineError::InvalidStatement(format!(
                        "unknown COPY option '{}'",
                        other
                    )))
                }
            }
        }
        if out.compression.is_some() && out.format == CopyFormat::Parquet {
            return Err(EngineError::InvalidStatement(
                "COMPRESSION is not supported for parquet output".to_string(),
            ));
        }
        Ok(out)
    }

    pub(super) fn to_sql(&self) -> String {
        let mut parts = vec![format!("FORMAT {}", self.format.as_sql())];
        if self.format == CopyFormat::Csv {
            parts.push(format!("HEADER {}", self.header));
            parts.push(format!(
                "DELIMITER {}",
                crate::identifier::escape_sql_string(&(self.delimiter as char).to_string())
            ));
        }
        if let Some(c) = self.compression {
            parts.push(format!("COMPRESSION {}", c.as_str()));
        }
        parts.join(", ")
    }
}

pub(super) fn single_byte(value: &OptionValue) -> EngineResult<u8> {
    let text = value.as_text();
    let bytes = text.as_bytes();
    if bytes.len() == 1 {
        Ok(bytes[0])
    } else {
        Err(EngineError::InvalidStatement(format!(
            "delimiter must be a single byte, got '{}'",
            text
        )))
    }
}

/// Serialize `df` according to `options`.
pub(super) fn encode(df: &mut DataFrame, options: &CopyOptions) -> EngineResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    match options.format {
        CopyFormat::Csv => {
            CsvWriter::new(&mut buf)
                .include_header(options.header)
                .with_separator(options.delimiter)
                .finish(df)?;
        }
        CopyFormat::Parquet => {
            ParquetWriter::new(&mut buf).finish(df)?;
        }
        CopyFormat::Json => {
            JsonWriter::new(&mut buf)
                .with_json_format(JsonFormat::Json)
                .finish(df)?;
        }
        CopyFormat::Ndjson => {
            JsonWriter::new(&mut buf)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?;
        }
    }
    match options.compression {
        Some(codec) => Ok(compress(&buf, codec)?),
        None => Ok(buf),
    }
}

fn compress(bytes: &[u8], codec: CompressionFormat) -> std::io::Result<Vec<u8>> {
    match codec {
        CompressionFormat::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        CompressionFormat::Zstd => zstd::stream::encode_all(bytes, 0),
        CompressionFormat::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        CompressionFormat::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(bytes)?;
            encoder.finish()
        }
    }
}
