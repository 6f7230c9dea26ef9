//! Arrow IPC loader. Bytes are decoded straight into a table instead of a view.

use tracing::info;

use crate::engine::{Engine, IpcInsert};
use crate::error::LoadError;
use crate::identifier::{derive_relation_name, format_identifier_for_sql};

use super::{schema_from_describe, LoadResult, Loader};

pub(super) fn load(
    engine: &mut dyn Engine,
    file_name: &str,
    bytes: &[u8],
) -> Result<LoadResult, LoadError> {
    let relation_name = derive_relation_name(file_name);
    let relation_identifier = format_identifier_for_sql(&relation_name);
    let wrap = |e| LoadError::engine(file_name, e);

    engine
        .query(&format!("DROP TABLE IF EXISTS {}", relation_identifier))
        .map_err(wrap)?;
    engine
        .insert_ipc(
            bytes,
            IpcInsert {
                name: &relation_name,
                create: true,
            },
        )
        .map_err(wrap)?;
    let described = engine
        .query(&format!("DESCRIBE {}", relation_identifier))
        .map_err(wrap)?;

    let schema = schema_from_describe(&described);
    if schema.is_empty() {
        return Err(LoadError::NoColumns {
            file_name: file_name.to_string(),
        });
    }
    info!(
        file_name,
        relation = %relation_name,
        loader = Loader::Arrow.id(),
        columns = schema.len(),
        "loaded file"
    );
    Ok(LoadResult {
        relation_name,
        relation_identifier,
        columns: schema.iter().map(|c| c.name.clone()).collect(),
        schema,
        loader: Loader::Arrow,
    })
}
