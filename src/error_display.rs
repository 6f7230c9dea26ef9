//! User-facing error message formatting.
//!
//! Uses typed error matching (PolarsError variants, io::ErrorKind, the crate's own error
//! enums) rather than string parsing to produce actionable messages.

use polars::prelude::PolarsError;
use sqlparser::parser::ParserError;
use std::io;

use crate::error::{EngineError, ExportError, LoadError, SessionError};

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::Duplicate(msg) => format!(
            "Duplicate column in result: {}. Use aliases to rename columns, e.g. `SELECT a AS a2`",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::SchemaFieldNotFound(msg) => format!("Schema field not found: {}", msg),
        PE::StructFieldNotFound(msg) => format!("Struct field not found: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::AssertionError(msg) => format!("Assertion failed: {}", msg),
        PE::SQLInterface(msg) | PE::SQLSyntax(msg) => msg.to_string(),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

pub fn user_message_from_engine(err: &EngineError) -> String {
    match err {
        EngineError::Polars(pe) => user_message_from_polars(pe),
        EngineError::Io(io_err) => user_message_from_io(io_err, None),
        EngineError::FileNotFound(name) => format!("No file named '{}' has been loaded.", name),
        EngineError::RelationNotFound(name) => format!("Table or view '{}' does not exist.", name),
        EngineError::RelationExists(name) => format!("Table or view '{}' already exists.", name),
        EngineError::Parse(err) => format!("SQL syntax error: {}", simplify_parse_message(err)),
        EngineError::InvalidStatement(msg) => format!("Invalid statement: {}", msg),
    }
}

/// Message shown in the status line for a failed session action.
pub fn user_message(err: &SessionError) -> String {
    match err {
        SessionError::Load(LoadError::NoColumns { file_name }) => {
            format!("Failed to load {}: no columns detected.", file_name)
        }
        SessionError::Load(LoadError::Engine { file_name, source }) => {
            format!("Failed to load {}: {}", file_name, user_message_from_engine(source))
        }
        SessionError::Query(e) => match &e.source {
            Some(source) => user_message_from_engine(source),
            None => e.message.clone(),
        },
        SessionError::Export(ExportError::Engine(e)) => {
            format!("Export failed: {}", user_message_from_engine(e))
        }
        SessionError::Export(ExportError::Encode(e)) => {
            format!("Export failed: {}", user_message_from_polars(e))
        }
        SessionError::Export(e) => format!("Export failed: {}", e),
        SessionError::Engine(e) => user_message_from_engine(e),
        other => other.to_string(),
    }
}

/// sqlparser prefixes every message with "sql parser error:"; keep only the detail.
fn simplify_parse_message(err: &ParserError) -> String {
    match err {
        ParserError::TokenizerError(msg) | ParserError::ParserError(msg) => msg.clone(),
        ParserError::RecursionLimitExceeded => "the statement is nested too deeply".to_string(),
    }
}

/// Light cleanup for ComputeError messages: strip Polars-internal phrasing.
fn simplify_compute_message(msg: &str) -> String {
    let msg_lower = msg.to_lowercase();
    if msg_lower.contains("duplicate")
        && (msg_lower.contains("output name") || msg_lower.contains("projection"))
    {
        let name = msg
            .split('\'')
            .nth(1)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "column".to_string());
        return format!(
            "Duplicate column name '{}' in result. Use aliases to rename columns, e.g. `SELECT a AS a2`",
            name
        );
    }
    if msg_lower.contains(".alias(") || msg_lower.contains("try renaming") {
        return "Duplicate column names in result. Use aliases to rename columns, e.g. `SELECT a AS a2`"
            .to_string();
    }
    msg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use std::time::Duration;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("foo"), "expected 'foo', got: {}", msg);
        assert!(
            msg.contains("Column not found"),
            "expected column not found, got: {}",
            msg
        );
    }

    #[test]
    fn test_simplify_compute_message_alias_hint() {
        let raw = "projections contained duplicate: 'x'. Try renaming with .alias(\"name\")";
        let msg = simplify_compute_message(raw);
        assert!(!msg.contains(".alias("), "should strip .alias( hint: {}", msg);
        assert!(msg.contains("Use aliases"), "expected alias suggestion: {}", msg);
    }

    #[test]
    fn test_session_messages() {
        let err = SessionError::Load(LoadError::NoColumns {
            file_name: "empty.csv".to_string(),
        });
        assert_eq!(
            user_message(&err),
            "Failed to load empty.csv: no columns detected."
        );

        let err = SessionError::Query(QueryError {
            message: "raw".to_string(),
            duration: Duration::ZERO,
            source: Some(EngineError::RelationNotFound("t".to_string())),
        });
        assert_eq!(user_message(&err), "Table or view 't' does not exist.");

        let err = EngineError::Parse(ParserError::ParserError(
            "Expected: an SQL statement, found: created_at".to_string(),
        ));
        assert_eq!(
            user_message_from_engine(&err),
            "SQL syntax error: Expected: an SQL statement, found: created_at"
        );

        assert_eq!(
            user_message(&SessionError::Export(ExportError::MissingQuery)),
            "Export failed: there is no query to export"
        );
    }
}
