//! Decoding registered file bytes for the `read_*` table functions.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;

use polars::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::CompressionFormat;

use super::copy::single_byte;
use super::statement::{ReadCall, ReadFunction};

/// Decode `bytes` as described by `call`.
pub(super) fn read_frame(call: &ReadCall, bytes: &[u8]) -> EngineResult<DataFrame> {
    match call.function {
        ReadFunction::Csv => read_csv(call, bytes),
        ReadFunction::Parquet => Ok(ParquetReader::new(Cursor::new(bytes.to_vec())).finish()?),
        ReadFunction::Json => read_json(call, bytes, JsonFormat::Json),
        ReadFunction::Ndjson => read_json(call, bytes, JsonFormat::JsonLines),
    }
}

fn read_csv(call: &ReadCall, bytes: &[u8]) -> EngineResult<DataFrame> {
    let decompressed = decompress(bytes, compression_for(call)?)?;

    let mut read_options = CsvReadOptions::default();
    let mut separator = b',';
    let mut parse_dates = false;
    for (key, value) in &call.options {
        match key.as_str() {
            "header" => read_options.has_header = expect_bool(key, value.as_bool())?,
            "delim" | "delimiter" | "sep" | "separator" => separator = single_byte(value)?,
            "skip" | "skip_rows" => read_options.skip_rows = expect_usize(key, value.as_usize())?,
            "sample_size" | "infer_schema_length" => {
                read_options.infer_schema_length = Some(expect_usize(key, value.as_usize())?)
            }
            "ignore_errors" => read_options.ignore_errors = expect_bool(key, value.as_bool())?,
            "try_parse_dates" | "dateformat" | "auto_detect" => {
                parse_dates = value.as_bool().unwrap_or(true)
            }
            "compression" => {}
            other => {
                return Err(EngineError::InvalidStatement(format!(
                    "unknown read_csv option '{}'",
                    other
                )))
            }
        }
    }
    read_options = read_options
        .map_parse_options(|opts| opts.with_separator(separator).with_try_parse_dates(parse_dates));

    let mut df = CsvReader::new(Cursor::new(decompressed))
        .with_options(read_options)
        .finish()?;
    trim_column_names(&mut df)?;
    Ok(df)
}

fn read_json(call: &ReadCall, bytes: &[u8], format: JsonFormat) -> EngineResult<DataFrame> {
    let decompressed = decompress(bytes, compression_for(call)?)?;
    Ok(JsonReader::new(Cursor::new(decompressed))
        .with_json_format(format)
        .finish()?)
}

/// Decode Arrow IPC bytes, accepting both the file and the streaming layout.
pub(super) fn read_ipc(bytes: &[u8]) -> EngineResult<DataFrame> {
    const FILE_MAGIC: &[u8] = b"ARROW1";
    if bytes.starts_with(FILE_MAGIC) {
        Ok(IpcReader::new(Cursor::new(bytes.to_vec())).finish()?)
    } else {
        Ok(IpcStreamReader::new(Cursor::new(bytes.to_vec())).finish()?)
    }
}

/// Explicit `compression = '...'` wins, otherwise the file suffix decides.
fn compression_for(call: &ReadCall) -> EngineResult<Option<CompressionFormat>> {
    match call.option("compression") {
        Some(value) => {
            let name = value.as_text();
            match name.to_ascii_lowercase().as_str() {
                "auto" => Ok(CompressionFormat::from_extension(Path::new(&call.path))),
                "none" | "uncompressed" => Ok(None),
                other => CompressionFormat::from_name(other).map(Some).ok_or_else(|| {
                    EngineError::InvalidStatement(format!("unsupported compression '{}'", name))
                }),
            }
        }
        None => Ok(CompressionFormat::from_extension(Path::new(&call.path))),
    }
}

fn decompress(bytes: &[u8], compression: Option<CompressionFormat>) -> std::io::Result<Vec<u8>> {
    let mut reader: Box<dyn Read + '_> = match compression {
        None => return Ok(bytes.to_vec()),
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(bytes)),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(bytes)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(bytes)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(bytes)),
    };
    let mut decompressed = Vec::new();
    reader.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Header cells often carry stray padding (`"a, b"`) or are blank (`"a,,b"`).
///
/// Names are trimmed, a blank name becomes `column_<position>` (1-based) and a name
/// that repeats an earlier one gets a `_<n>` suffix.
fn trim_column_names(df: &mut DataFrame) -> PolarsResult<()> {
    let mut seen = HashSet::new();
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let trimmed = n.trim();
            let base = if trimmed.is_empty() {
                format!("column_{}", i + 1)
            } else {
                trimmed.to_string()
            };
            let mut name = base.clone();
            let mut k = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}_{}", base, k);
                k += 1;
            }
            name
        })
        .collect();
    if names
        .iter()
        .zip(df.get_column_names())
        .all(|(new, old)| new.as_str() == old.as_str())
    {
        return Ok(());
    }
    df.set_column_names(names.iter().map(|s| s.as_str()))
}

fn expect_bool(key: &str, value: Option<bool>) -> EngineResult<bool> {
    value.ok_or_else(|| EngineError::InvalidStatement(format!("{} expects a boolean", key)))
}

fn expect_usize(key: &str, value: Option<usize>) -> EngineResult<usize> {
    value.ok_or_else(|| {
        EngineError::InvalidStatement(format!("{} expects a non-negative integer", key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::statement::OptionValue;
    use std::io::Write;

    #[test]
    fn test_read_csv_options() {
        let call = ReadCall::new(ReadFunction::Csv, "x.psv")
            .with_option("delim", OptionValue::Str("|".to_string()))
            .with_option("skip", OptionValue::Int(1));
        let df = read_frame(&call, b"junk line\na| b\n1|2\n3|4\n").unwrap();
        assert_eq!(df.shape(), (2, 2));
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_blank_and_repeated_headers_get_names() {
        let call = ReadCall::new(ReadFunction::Csv, "x.csv");
        let df = read_frame(&call, b"a,,b\n1,2,3\n").unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "column_2", "b"]);

        let mut padded = df!("a" => [1i64], " a" => [2i64], " " => [3i64]).unwrap();
        trim_column_names(&mut padded).unwrap();
        let names: Vec<&str> = padded
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, vec!["a", "a_1", "column_3"]);
    }

    #[test]
    fn test_read_csv_without_header() {
        let call = ReadCall::new(ReadFunction::Csv, "x.csv")
            .with_option("header", OptionValue::Bool(false));
        let df = read_frame(&call, b"1,2\n3,4\n").unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_read_gzip_csv_by_suffix() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"a,b\n1,2\n").unwrap();
        let bytes = encoder.finish().unwrap();
        let df = read_frame(&ReadCall::new(ReadFunction::Csv, "x.csv.gz"), &bytes).unwrap();
        assert_eq!(df.shape(), (1, 2));
    }

    #[test]
    fn test_read_ndjson() {
        let df = read_frame(
            &ReadCall::new(ReadFunction::Ndjson, "x.jsonl"),
            b"{\"a\":1}\n{\"a\":2}\n",
        )
        .unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let call = ReadCall::new(ReadFunction::Csv, "x.csv")
            .with_option("flavour", OptionValue::Word("salty".to_string()));
        assert!(matches!(
            read_frame(&call, b"a\n1\n"),
            Err(EngineError::InvalidStatement(_))
        ));
    }

    #[test]
    fn test_read_ipc_file_and_stream() {
        let mut df = df!("x" => [1i32, 2, 3]).unwrap();
        let mut file_bytes = Vec::new();
        IpcWriter::new(&mut file_bytes).finish(&mut df).unwrap();
        assert_eq!(read_ipc(&file_bytes).unwrap().height(), 3);

        let mut stream_bytes = Vec::new();
        IpcStreamWriter::new(&mut stream_bytes)
            .finish(&mut df)
            .unwrap();
        assert_eq!(read_ipc(&stream_bytes).unwrap().height(), 3);
    }
}
