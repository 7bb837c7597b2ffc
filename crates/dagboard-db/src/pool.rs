//! Opening the DAG store.
//!
//! [`open`] is the one entry point the server needs: it makes sure the
//! database file can be created, tunes every pooled connection, and brings
//! the schema up to date before any request is served.

use crate::migrations::{run_migrations, MigrationError};
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on concurrently checked-out connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Pool of connections to the DAG store, shared by all request handlers.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors raised while opening the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The directory holding the database file could not be created.
    #[error("failed to prepare database directory {path}: {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    /// The pool could not open its connections.
    #[error("failed to open database pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// The schema could not be brought up to date.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Per-connection setup applied when the pool opens a connection.
#[derive(Debug)]
struct ConnectionTuning {
    busy_timeout: Duration,
}

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionTuning {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        // Private in-memory databases cannot use WAL and report "memory".
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") && journal_mode != "memory" {
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("journal_mode stayed {journal_mode}, expected wal")),
            ));
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(self.busy_timeout)
    }
}

/// Builds a connection pool for `db_path` without touching the schema.
///
/// `:memory:` gives each pooled connection its own private database, so a
/// shared in-memory store needs `pool_max_size` of 1.
///
/// # Errors
///
/// Returns `StoreError::Pool` if the initial connections cannot be opened.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, StoreError> {
    let manager = SqliteConnectionManager::file(db_path).with_flags(
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    );

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_customizer(Box::new(ConnectionTuning {
            busy_timeout: Duration::from_millis(settings.busy_timeout_ms),
        }))
        .build(manager)?;

    Ok(pool)
}

/// Opens the DAG store at `db_path`: creates the parent directory if it is
/// missing, builds the pool, and applies pending migrations.
///
/// # Errors
///
/// Returns `StoreError` if the directory, the pool or a migration fails.
pub fn open(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, StoreError> {
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
    }

    let pool = create_pool(db_path, settings)?;
    let applied = run_migrations(&*pool.get()?)?;

    tracing::info!(
        path = db_path,
        migrations_applied = applied,
        max_connections = settings.pool_max_size,
        "dag store open"
    );

    Ok(pool)
}
