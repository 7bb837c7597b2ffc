//! Database layer for dagboard.
//!
//! [`open`] turns a database path into a ready-to-use connection pool with
//! the schema migrated. The pool is created once at startup and handed to
//! request handlers explicitly; there is no process-global engine.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open, DbPool, DbRuntimeSettings, StoreError};
