//! Runs query text against the engine and times it.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use crate::engine::statement::strip_terminators;
use crate::engine::Engine;
use crate::error::{EngineError, ExecuteError, QueryError};
use crate::error_display::user_message_from_engine;
use crate::value::QueryResult;

/// A successful run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub sql: String,
    pub result: QueryResult,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
}

/// The frame of a successful run, keyed by the statement that produced it.
struct CachedFrame {
    sql: String,
    frame: DataFrame,
}

/// Executes statements and keeps the frame of the last one while it is still current.
///
/// A failed run clears the cache, so nothing stale outlives the error.
#[derive(Default)]
pub struct Executor {
    cached: Option<CachedFrame>,
    null_display: String,
}

impl Executor {
    pub fn new(null_display: impl Into<String>) -> Self {
        Self {
            cached: None,
            null_display: null_display.into(),
        }
    }

    pub fn execute(
        &mut self,
        engine: &mut dyn Engine,
        sql: &str,
    ) -> Result<Execution, ExecuteError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ExecuteError::EmptyInput);
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = engine.query(sql).and_then(|df| {
            let result = QueryResult::from_frame(&df, &self.null_display)?;
            Ok((df, result))
        });
        let duration = start.elapsed();

        match outcome {
            Ok((df, result)) => {
                debug!(
                    rows = result.row_count(),
                    duration_ms = duration.as_millis() as u64,
                    "query succeeded"
                );
                self.cached = Some(CachedFrame {
                    sql: strip_terminators(sql).to_string(),
                    frame: df,
                });
                Ok(Execution {
                    sql: sql.to_string(),
                    result,
                    duration,
                    started_at,
                })
            }
            Err(err) => {
                warn!(error = %err, duration_ms = duration.as_millis() as u64, "query failed");
                self.clear_cache();
                Err(ExecuteError::Query(query_error(err, duration)))
            }
        }
    }

    /// The cached frame, but only when it was produced by `sql`.
    ///
    /// Whitespace around the statement and trailing `;` are ignored when comparing.
    pub fn frame_for(&self, sql: &str) -> Option<&DataFrame> {
        let sql = strip_terminators(sql);
        self.cached
            .as_ref()
            .filter(|c| c.sql == sql)
            .map(|c| &c.frame)
    }

    pub fn clear_cache(&mut self) {
        self.cached = None;
    }
}

fn query_error(err: EngineError, duration: Duration) -> QueryError {
    QueryError {
        message: user_message_from_engine(&err),
        duration,
        source: Some(err),
    }
}
