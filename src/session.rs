//! The query session: one loaded relation, its query, results, history and exports.
//!
//! Hosts drive a [`Session`] with [`SessionEvent`]s. Every event produces a [`Status`];
//! failures are reported there and never escape [`Session::event`].

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, TryLockError};

use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::error::{ExecuteError, Result, SessionError};
use crate::error_display::user_message;
use crate::executor::Executor;
use crate::export::{export, ExportArtifact, ExportOptions};
use crate::grid::{ResultGrid, SortDirection};
use crate::history::HistoryLedger;
use crate::identifier::format_identifier_for_sql;
use crate::loaders::{schema_from_describe, ColumnSchema, LoadContext, LoadResult, Loader};
use crate::ExportFormat;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A file picked or dropped by the user.
    Load { file_name: String, bytes: Vec<u8> },
    /// Files the host can see; informational only.
    WorkspaceFiles(Vec<String>),
    SetQueryText(String),
    /// Run the current query text.
    Run,
    /// Replace the query text and run it.
    RunSql(String),
    /// Re-run a history entry by id.
    Replay(u64),
    SetGlobalFilter(String),
    SetColumnFilter { column: usize, text: String },
    ToggleSort(usize),
    ClearFilters,
    Export(ExportFormat),
}

/// Messages the session sends back to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// Bytes for the host to save, e.g. via a save dialog.
    Export(ExportArtifact),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::info("Load a file to start querying.")
    }
}

pub struct Session {
    engine: Box<dyn Engine>,
    config: AppConfig,
    load_context: LoadContext,
    relation: Option<LoadResult>,
    executor: Executor,
    grid: ResultGrid,
    history: HistoryLedger,
    query_text: String,
    status: Status,
    host: Sender<HostMessage>,
    cache: Option<CacheManager>,
    workspace_files: Vec<String>,
}

impl Session {
    pub fn new(engine: Box<dyn Engine>, config: AppConfig, host: Sender<HostMessage>) -> Self {
        Self {
            engine,
            load_context: LoadContext::from(&config.file_loading),
            executor: Executor::new(config.display.null_display.clone()),
            grid: ResultGrid::new(),
            history: HistoryLedger::new(config.query.history_limit),
            config,
            relation: None,
            query_text: String::new(),
            status: Status::default(),
            host,
            cache: None,
            workspace_files: Vec::new(),
        }
    }

    /// Persist history through `cache` when `query.persist_history` is on, restoring what is stored.
    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        if self.config.query.persist_history {
            match cache.load_history() {
                Ok(stored) => {
                    self.history = HistoryLedger::restore(self.config.query.history_limit, stored)
                }
                Err(e) => warn!(error = %e, "could not load query history"),
            }
        }
        self.cache = Some(cache);
        self
    }

    /// Handle one event. The returned status is also kept as [`Session::status`].
    pub fn event(&mut self, event: SessionEvent) -> Status {
        let status = match self.handle(event) {
            Ok(status) => status,
            Err(SessionError::EmptyInput) => Status::warning(SessionError::EmptyInput.to_string()),
            Err(err) => {
                debug!(error = ?err, "session action failed");
                Status::error(user_message(&err))
            }
        };
        self.status = status.clone();
        status
    }

    fn handle(&mut self, event: SessionEvent) -> Result<Status> {
        match event {
            SessionEvent::Load { file_name, bytes } => self.load(&file_name, bytes),
            SessionEvent::WorkspaceFiles(files) => {
                let count = files.len();
                self.workspace_files = files;
                Ok(Status::info(format!(
                    "{} {} in workspace",
                    count,
                    if count == 1 { "file" } else { "files" }
                )))
            }
            SessionEvent::SetQueryText(text) => {
                self.query_text = text;
                Ok(self.status.clone())
            }
            SessionEvent::Run => {
                let sql = self.query_text.clone();
                self.run(&sql)
            }
            SessionEvent::RunSql(sql) => {
                self.query_text = sql.clone();
                self.run(&sql)
            }
            SessionEvent::Replay(id) => {
                let sql = self
                    .history
                    .replay(id)
                    .ok_or(SessionError::HistoryNotFound(id))?
                    .to_string();
                self.query_text = sql.clone();
                self.run(&sql)
            }
            SessionEvent::SetGlobalFilter(text) => {
                self.grid.set_global_filter(&text);
                Ok(self.view_status())
            }
            SessionEvent::SetColumnFilter { column, text } => {
                self.grid.set_column_filter(column, &text)?;
                Ok(self.view_status())
            }
            SessionEvent::ToggleSort(column) => {
                let sort = self.grid.toggle_sort(column)?;
                let name = &self.grid.columns()[column];
                let message = match sort.direction {
                    SortDirection::Ascending => format!("Sorted by {} ascending", name),
                    SortDirection::Descending => format!("Sorted by {} descending", name),
                    SortDirection::None => "Sort cleared".to_string(),
                };
                Ok(Status::info(message))
            }
            SessionEvent::ClearFilters => {
                self.grid.clear_filters();
                Ok(self.view_status())
            }
            SessionEvent::Export(format) => self.export(format),
        }
    }

    fn load(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<Status> {
        let loader = Loader::select(file_name);
        debug!(file_name, loader = loader.id(), "selected loader");
        let loaded = loader.load(self.engine.as_mut(), file_name, bytes, &self.load_context)?;

        let sql = self.default_query(&loaded);
        let summary = format!(
            "Loaded {} as {} ({} {})",
            file_name,
            loaded.relation_identifier,
            loaded.columns.len(),
            if loaded.columns.len() == 1 {
                "column"
            } else {
                "columns"
            }
        );
        self.relation = Some(loaded);
        self.query_text = sql.clone();
        let ran = self.run(&sql)?;
        Ok(Status::success(format!("{}: {}", summary, ran.message)))
    }

    /// `SELECT <every column> FROM <relation>[ LIMIT n];`
    fn default_query(&self, loaded: &LoadResult) -> String {
        let columns: Vec<String> = loaded
            .columns
            .iter()
            .map(|c| format_identifier_for_sql(c))
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            loaded.relation_identifier
        );
        if let Some(limit) = self.config.query.default_limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql.push(';');
        sql
    }

    fn run(&mut self, sql: &str) -> Result<Status> {
        let outcome = self.executor.execute(self.engine.as_mut(), sql);
        let result = match outcome {
            Ok(execution) => {
                let rows = execution.result.row_count();
                self.history
                    .record(&execution.sql, execution.duration, rows, None);
                self.grid.ingest(execution.result);
                info!(
                    rows,
                    duration_ms = execution.duration.as_millis() as u64,
                    "query finished"
                );
                Ok(Status::success(format!(
                    "{} in {} ms",
                    self.grid.row_count_label(),
                    execution.duration.as_millis()
                )))
            }
            Err(ExecuteError::EmptyInput) => return Err(SessionError::EmptyInput),
            Err(ExecuteError::Query(err)) => {
                self.history
                    .record(sql, err.duration, 0, Some(err.message.clone()));
                Err(SessionError::Query(err))
            }
        };
        self.persist_history();
        result
    }

    fn export(&mut self, format: ExportFormat) -> Result<Status> {
        let mut options = ExportOptions::from(&self.config.export);
        if !format.supports_compression() {
            options.compression = None;
        }
        let relation_name = self.relation.as_ref().map(|r| r.relation_name.as_str());
        let artifact = export(
            self.engine.as_mut(),
            &mut self.executor,
            format,
            &self.query_text,
            relation_name,
            &options,
        )?;
        let message = format!(
            "Exported {} ({} bytes) as {}",
            format.as_str(),
            artifact.bytes.len(),
            artifact.file_name
        );
        self.host
            .send(HostMessage::Export(artifact))
            .map_err(|_| SessionError::HostUnavailable)?;
        Ok(Status::success(message))
    }

    fn view_status(&self) -> Status {
        match self.grid.empty_message() {
            Some(message) => Status::info(message),
            None => Status::info(self.grid.row_count_label()),
        }
    }

    fn persist_history(&self) {
        if !self.config.query.persist_history {
            return;
        }
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_history(self.history.entries()) {
                warn!(error = %e, "could not save query history");
            }
        }
    }

    /// Column schema of the current relation, read fresh from the engine.
    pub fn schema(&mut self) -> Result<Vec<ColumnSchema>> {
        let identifier = self
            .relation
            .as_ref()
            .map(|r| r.relation_identifier.clone())
            .ok_or(SessionError::NoRelation)?;
        let described = self.engine.query(&format!("DESCRIBE {}", identifier))?;
        Ok(schema_from_describe(&described))
    }

    /// Every relation registered in the engine, including ones from earlier loads.
    pub fn relations(&self) -> Vec<String> {
        self.engine.relations()
    }

    pub fn relation(&self) -> Option<&LoadResult> {
        self.relation.as_ref()
    }

    pub fn grid(&self) -> &ResultGrid {
        &self.grid
    }

    /// For hosts that set a sort direction directly rather than cycling it.
    pub fn grid_mut(&mut self) -> &mut ResultGrid {
        &mut self.grid
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn workspace_files(&self) -> &[String] {
        &self.workspace_files
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// A session shared between handles, admitting one action at a time.
///
/// An action issued while another holds the session is rejected with
/// [`SessionError::Busy`] instead of waiting.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn event(&self, event: SessionEvent) -> Result<Status> {
        self.with(|session| session.event(event))
    }

    /// Run `f` with exclusive access, or fail with `Busy`.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        match self.inner.try_lock() {
            Ok(mut session) => Ok(f(&mut session)),
            Err(TryLockError::WouldBlock) => Err(SessionError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => Ok(f(&mut poisoned.into_inner())),
        }
    }
}
