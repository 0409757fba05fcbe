//! LanceDB connection helpers.

use arrow_array::RecordBatchIterator;
use arrow_schema::SchemaRef;
use lancedb::{connect, Connection};

use catalog_core::error::{Error, Result};

pub(crate) fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::IndexUnavailable(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(unavailable)
}

/// Create an empty table named `name` unless one exists. Returns whether it
/// was created.
pub async fn ensure_table(conn: &Connection, name: &str, schema: SchemaRef) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(unavailable)?;
    if names.iter().any(|n| n == name) {
        return Ok(false);
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await.map_err(unavailable)?;
    Ok(true)
}
