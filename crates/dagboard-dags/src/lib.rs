//! Saved DAG documents.
//!
//! A DAG record is an externally identified, named blob of graph JSON. The
//! payload is stored and returned verbatim; nothing here parses it. Writes
//! are upserts keyed by `id`, and every call goes straight to the database.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during DAG record operations.
#[derive(Debug, Error)]
pub enum DagError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A saved DAG document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DagRecord {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Serialized graph, opaque to the store.
    pub data: String,
}

/// List-view projection of a [`DagRecord`] without its payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DagSummary {
    pub id: String,
    pub name: String,
}

/// Result of [`delete_dag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    NotFound,
}

impl DeleteOutcome {
    /// Status string reported to API clients.
    pub fn as_status(&self) -> &'static str {
        match self {
            DeleteOutcome::Removed => "ok",
            DeleteOutcome::NotFound => "not found",
        }
    }
}

fn row_to_record(row: &Row) -> rusqlite::Result<DagRecord> {
    Ok(DagRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        data: row.get(2)?,
    })
}

/// Lists every saved DAG as `{id, name}`, oldest first.
///
/// Replacing a record through [`upsert_dag`] keeps its original position.
pub fn list_dags(conn: &Connection) -> Result<Vec<DagSummary>, DagError> {
    let mut stmt = conn.prepare("SELECT id, name FROM dag_graphs ORDER BY rowid ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(DagSummary {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut dags = Vec::new();
    for row in rows {
        dags.push(row?);
    }
    Ok(dags)
}

/// Loads the full record for `id`, or `None` if nothing is saved under it.
pub fn get_dag(conn: &Connection, id: &str) -> Result<Option<DagRecord>, DagError> {
    let record = conn
        .query_row(
            "SELECT id, name, data FROM dag_graphs WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Creates the record, or replaces the name and data of an existing one with
/// the same id.
pub fn upsert_dag(conn: &Connection, record: &DagRecord) -> Result<(), DagError> {
    conn.execute(
        "INSERT INTO dag_graphs (id, name, data) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, data = excluded.data",
        params![record.id, record.name, record.data],
    )?;
    tracing::debug!(dag_id = %record.id, bytes = record.data.len(), "dag saved");
    Ok(())
}

/// Deletes the record for `id` if present.
pub fn delete_dag(conn: &Connection, id: &str) -> Result<DeleteOutcome, DagError> {
    let deleted = conn.execute("DELETE FROM dag_graphs WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Ok(DeleteOutcome::NotFound);
    }
    tracing::debug!(dag_id = %id, "dag deleted");
    Ok(DeleteOutcome::Removed)
}
