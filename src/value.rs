//! Materialized query results: typed cells plus their display text.

use polars::prelude::*;

/// One cell of a result, typed enough to sort on.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Date, datetime or time as nanoseconds (since the epoch, or since midnight for times).
    Temporal(i64),
    /// Anything else, carried as its rendered text.
    Other(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric value for `Int` and `Float` cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub raw: Vec<CellValue>,
    pub display: Vec<String>,
}

/// Column names and rows of an executed query, in engine order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Convert a frame, rendering nulls as `null_display`.
    pub fn from_frame(df: &DataFrame, null_display: &str) -> PolarsResult<Self> {
        let height = df.height();
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let mut raw_columns = Vec::with_capacity(df.width());
        let mut display_columns = Vec::with_capacity(df.width());
        for col in df.get_columns() {
            raw_columns.push(raw_values(col)?);
            display_columns.push(display_values(col, null_display)?);
        }

        let mut rows = Vec::with_capacity(height);
        for row_index in 0..height {
            rows.push(Row {
                raw: raw_columns.iter().map(|c| c[row_index].clone()).collect(),
                display: display_columns
                    .iter()
                    .map(|c| c[row_index].clone())
                    .collect(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn display_values(col: &Column, null_display: &str) -> PolarsResult<Vec<String>> {
    let mut out = Vec::with_capacity(col.len());
    for i in 0..col.len() {
        let value = col.get(i)?;
        if matches!(value, AnyValue::Null) {
            out.push(null_display.to_string());
        } else {
            out.push(value.str_value().to_string());
        }
    }
    Ok(out)
}

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

fn raw_values(col: &Column) -> PolarsResult<Vec<CellValue>> {
    let values = match col.dtype() {
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Bool))
            .collect(),
        DataType::UInt64 => col
            .u64()?
            .into_iter()
            .map(|v| match v {
                None => CellValue::Null,
                Some(u) => i64::try_from(u)
                    .map(CellValue::Int)
                    .unwrap_or(CellValue::Float(u as f64)),
            })
            .collect(),
        dtype if dtype.is_integer() => col
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Int))
            .collect(),
        dtype if dtype.is_float() => col
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Float))
            .collect(),
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, |s| CellValue::Text(s.to_string())))
            .collect(),
        DataType::Date => temporal(col, &DataType::Int32, NANOS_PER_DAY)?,
        DataType::Datetime(unit, _) => {
            let scale = match unit {
                TimeUnit::Nanoseconds => 1,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Milliseconds => 1_000_000,
            };
            temporal(col, &DataType::Int64, scale)?
        }
        DataType::Time => temporal(col, &DataType::Int64, 1)?,
        _ => {
            let mut out = Vec::with_capacity(col.len());
            for i in 0..col.len() {
                let value = col.get(i)?;
                out.push(if matches!(value, AnyValue::Null) {
                    CellValue::Null
                } else {
                    CellValue::Other(value.str_value().to_string())
                });
            }
            out
        }
    };
    Ok(values)
}

/// Physical integer representation scaled to nanoseconds.
fn temporal(col: &Column, physical: &DataType, scale: i64) -> PolarsResult<Vec<CellValue>> {
    let ints = col.cast(physical)?.cast(&DataType::Int64)?;
    Ok(ints
        .i64()?
        .into_iter()
        .map(|v| v.map_or(CellValue::Null, |n| CellValue::Temporal(n.saturating_mul(scale))))
        .collect())
}
