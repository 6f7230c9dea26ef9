//! Load a tabular file, query it with SQL, and explore the results.
//!
//! A [`Session`] owns the engine and everything derived from it. Hosts feed it
//! [`SessionEvent`]s and receive exports over a [`HostMessage`] channel.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod error_display;
pub mod executor;
pub mod export;
pub mod grid;
pub mod history;
pub mod identifier;
pub mod loaders;
pub mod logging;
pub mod render;
pub mod session;
pub mod value;

/// Application name used for config and cache directories
pub const APP_NAME: &str = "tabq";

pub use cache::CacheManager;
pub use config::{AppConfig, ConfigManager};
pub use engine::{Engine, PolarsEngine};
pub use error::{Result, SessionError};
pub use export::ExportArtifact;
pub use grid::{ResultGrid, SortDirection};
pub use history::{HistoryEntry, HistoryLedger};
pub use loaders::{ColumnSchema, LoadResult, Loader};
pub use session::{HostMessage, Session, SessionEvent, SharedSession, Status, StatusLevel};
pub use tabq_cli::{Args, CompressionFormat, ExportFormat};
pub use value::{CellValue, QueryResult};
