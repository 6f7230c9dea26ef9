//! Error taxonomy for the query session.
//!
//! Every failure is local and recoverable; [`crate::Session::event`] turns them into a
//! [`crate::Status`] instead of propagating.

use polars::prelude::PolarsError;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("no virtual file named '{0}'")]
    FileNotFound(String),

    #[error("relation '{0}' does not exist")]
    RelationNotFound(String),

    #[error("relation '{0}' already exists")]
    RelationExists(String),

    #[error("SQL parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no columns detected in '{file_name}'")]
    NoColumns { file_name: String },

    #[error("could not load '{file_name}': {source}")]
    Engine {
        file_name: String,
        #[source]
        source: EngineError,
    },
}

impl LoadError {
    pub(crate) fn engine(file_name: &str, source: EngineError) -> Self {
        Self::Engine {
            file_name: file_name.to_string(),
            source,
        }
    }
}

/// The engine rejected a statement. Carries the time spent on the attempt.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
    pub duration: Duration,
    #[source]
    pub source: Option<EngineError>,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("query text is empty")]
    EmptyInput,

    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there is no query to export")]
    MissingQuery,

    #[error("no result available to export: {0}")]
    NoResult(String),

    #[error("{format} export does not support {compression} compression")]
    UnsupportedCompression {
        format: &'static str,
        compression: &'static str,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("could not encode export: {0}")]
    Encode(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("column index {index} is out of range for {width} columns")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("no column named '{0}'")]
    UnknownColumn(String),
}

/// Top-level error for session actions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("enter a query to run")]
    EmptyInput,

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no history entry with id {0}")]
    HistoryNotFound(u64),

    #[error("no file has been loaded")]
    NoRelation,

    #[error("another action is still running")]
    Busy,

    #[error("the host is no longer accepting exports")]
    HostUnavailable,
}

impl From<ExecuteError> for SessionError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::EmptyInput => SessionError::EmptyInput,
            ExecuteError::Query(e) => SessionError::Query(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
