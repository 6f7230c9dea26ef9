//! The SQL engine boundary.
//!
//! [`Engine`] is the narrow surface the rest of the crate talks to. [`PolarsEngine`] implements
//! it on top of `polars_sql::SQLContext`, with an in-memory map of registered files standing in
//! for a filesystem. Statements are classified with `sqlparser` first: `CREATE VIEW ... AS`,
//! `DESCRIBE`, `DROP` and `COPY ... TO` are handled here, and `read_*` table functions are
//! resolved against the registered files wherever they appear in a query.

pub mod copy;
mod read;
pub mod statement;

use std::collections::HashMap;

use polars::prelude::*;
use polars_sql::SQLContext;
use sqlparser::ast::Query;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::identifier::format_identifier_for_sql;

pub use copy::{CopyFormat, CopyOptions};
pub use statement::{CopyStatement, OptionValue, ReadCall, ReadFunction};
use statement::{DescribeTarget, Statement};

/// Column names of a `DESCRIBE` result.
pub const DESCRIBE_NAME_COLUMN: &str = "column_name";
pub const DESCRIBE_TYPE_COLUMN: &str = "column_type";

/// Options for [`Engine::insert_ipc`].
#[derive(Debug, Clone, Copy)]
pub struct IpcInsert<'a> {
    pub name: &'a str,
    /// Create a new relation; when false, rows are appended to an existing one.
    pub create: bool,
}

pub trait Engine {
    /// Make `bytes` readable by SQL under `name`, replacing any previous file with that name.
    fn register_bytes(&mut self, name: &str, bytes: Vec<u8>) -> EngineResult<()>;

    /// Execute one statement and materialize its result.
    fn query(&mut self, sql: &str) -> EngineResult<DataFrame>;

    /// Decode Arrow IPC bytes into a relation.
    fn insert_ipc(&mut self, bytes: &[u8], options: IpcInsert<'_>) -> EngineResult<()>;

    /// Bytes of a file previously written by `COPY ... TO`.
    fn copy_bytes_out(&self, path: &str) -> EngineResult<Vec<u8>>;

    /// Forget a registered or written file. Missing files are not an error.
    fn drop_virtual_file(&mut self, path: &str) -> EngineResult<()>;

    /// Names of every relation currently registered, sorted.
    fn relations(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct PolarsEngine {
    ctx: SQLContext,
    files: HashMap<String, Vec<u8>>,
}

impl PolarsEngine {
    pub fn new() -> Self {
        Self {
            ctx: SQLContext::new(),
            files: HashMap::new(),
        }
    }

    fn has_relation(&self, name: &str) -> bool {
        self.ctx.get_tables().iter().any(|t| t == name)
    }

    fn relation_frame(&mut self, name: &str) -> EngineResult<LazyFrame> {
        if !self.has_relation(name) {
            return Err(EngineError::RelationNotFound(name.to_string()));
        }
        Ok(self
            .ctx
            .execute(&format!("SELECT * FROM {}", format_identifier_for_sql(name)))?)
    }

    fn file_bytes(&self, path: &str) -> EngineResult<&[u8]> {
        self.files
            .get(path)
            .map(|b| b.as_slice())
            .ok_or_else(|| EngineError::FileNotFound(path.to_string()))
    }

    fn read_call_frame(&self, call: &ReadCall) -> EngineResult<DataFrame> {
        read::read_frame(call, self.file_bytes(&call.path)?)
    }

    /// Plan `query` lazily, reading every `read_*` call in it from the virtual files.
    ///
    /// The read results are registered under generated names for the duration of planning
    /// only; the returned plan holds their frames.
    fn plan_query(&mut self, mut query: Query) -> EngineResult<LazyFrame> {
        let reads = statement::rewrite_reads(&mut query)?;
        let sql = query.to_string();
        let mut registered = Vec::with_capacity(reads.len());
        let planned = self
            .register_reads(&reads, &mut registered)
            .and_then(|()| Ok(self.ctx.execute(&sql)?));
        for name in registered {
            self.ctx.unregister(&name);
        }
        planned
    }

    fn register_reads(
        &mut self,
        reads: &[(String, ReadCall)],
        registered: &mut Vec<String>,
    ) -> EngineResult<()> {
        for (name, call) in reads {
            let df = self.read_call_frame(call)?;
            debug!(relation = %name, file = %call.path, rows = df.height(), "read function");
            self.ctx.register(name, df.lazy());
            registered.push(name.clone());
        }
        Ok(())
    }

    fn create_view(
        &mut self,
        name: String,
        or_replace: bool,
        if_not_exists: bool,
        query: Query,
    ) -> EngineResult<DataFrame> {
        if self.has_relation(&name) && !or_replace {
            if if_not_exists {
                return Ok(DataFrame::empty());
            }
            return Err(EngineError::RelationExists(name));
        }
        let lf = self.plan_query(query)?;
        debug!(relation = %name, "registering relation");
        self.ctx.register(&name, lf);
        Ok(DataFrame::empty())
    }

    fn describe(&mut self, target: DescribeTarget) -> EngineResult<DataFrame> {
        let mut lf = match target {
            DescribeTarget::Relation(name) => self.relation_frame(&name)?,
            DescribeTarget::Query(query) => self.plan_query(*query)?,
        };
        let schema = lf.collect_schema()?;
        let names: Vec<String> = schema.iter_names().map(|n| n.to_string()).collect();
        let types: Vec<String> = schema.iter().map(|(_, dtype)| sql_type_name(dtype)).collect();
        Ok(df!(
            DESCRIBE_NAME_COLUMN => names,
            DESCRIBE_TYPE_COLUMN => types
        )?)
    }

    fn drop_relation(&mut self, name: &str, if_exists: bool) -> EngineResult<DataFrame> {
        if !self.has_relation(name) {
            if if_exists {
                return Ok(DataFrame::empty());
            }
            return Err(EngineError::RelationNotFound(name.to_string()));
        }
        self.ctx.unregister(name);
        Ok(DataFrame::empty())
    }

    fn copy_to(&mut self, copy: CopyStatement) -> EngineResult<DataFrame> {
        let mut df = self.query(&copy.query)?;
        let bytes = copy::encode(&mut df, &copy.options)?;
        debug!(target_file = %copy.target, bytes = bytes.len(), "COPY wrote virtual file");
        self.files.insert(copy.target, bytes);
        Ok(df!("Count" => [df.height() as u64])?)
    }
}

impl Engine for PolarsEngine {
    fn register_bytes(&mut self, name: &str, bytes: Vec<u8>) -> EngineResult<()> {
        debug!(file = name, bytes = bytes.len(), "registering file");
        self.files.insert(name.to_string(), bytes);
        Ok(())
    }

    fn query(&mut self, sql: &str) -> EngineResult<DataFrame> {
        match statement::parse(sql)? {
            Statement::CreateView {
                name,
                or_replace,
                if_not_exists,
                query,
            } => self.create_view(name, or_replace, if_not_exists, *query),
            Statement::Describe(target) => self.describe(target),
            Statement::Drop { name, if_exists } => self.drop_relation(&name, if_exists),
            Statement::Copy(copy) => self.copy_to(copy),
            Statement::Query(query) => Ok(self.plan_query(*query)?.collect()?),
            Statement::Other(sql) => Ok(self.ctx.execute(&sql)?.collect()?),
        }
    }

    fn insert_ipc(&mut self, bytes: &[u8], options: IpcInsert<'_>) -> EngineResult<()> {
        let exists = self.has_relation(options.name);
        if options.create && exists {
            return Err(EngineError::RelationExists(options.name.to_string()));
        }
        let incoming = read::read_ipc(bytes)?;
        let df = if options.create {
            incoming
        } else {
            let existing = self.relation_frame(options.name)?.collect()?;
            existing.vstack(&incoming)?
        };
        debug!(relation = options.name, rows = df.height(), "inserted Arrow IPC");
        self.ctx.register(options.name, df.lazy());
        Ok(())
    }

    fn copy_bytes_out(&self, path: &str) -> EngineResult<Vec<u8>> {
        self.file_bytes(path).map(|b| b.to_vec())
    }

    fn drop_virtual_file(&mut self, path: &str) -> EngineResult<()> {
        self.files.remove(path);
        Ok(())
    }

    fn relations(&self) -> Vec<String> {
        let mut tables = self.ctx.get_tables();
        tables.sort();
        tables
    }
}

/// SQL-style name for a column type as reported by `DESCRIBE`.
pub fn sql_type_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::String => "VARCHAR".to_string(),
        DataType::Binary => "BLOB".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Datetime(_, None) => "TIMESTAMP".to_string(),
        DataType::Datetime(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Time => "TIME".to_string(),
        DataType::Null => "NULL".to_string(),
        other => other.to_string().to_uppercase(),
    }
}
