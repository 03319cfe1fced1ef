//! SQLite storage engine for the relay.
//!
//! Provides connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and [`SqliteEventStore`], the storage
//! collaborator the writer commits accepted events through.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: readers proceed concurrently with the single
//!   writer, which is the only access pattern the write path needs.
//! - **One dedicated writer connection**: [`SqliteEventStore`] owns a pooled
//!   connection for its whole life, so every read-write transaction is
//!   opened on the writer thread and never shared.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and applied once each.

mod error;
mod migrations;
mod pool;
mod store;

pub use error::DbError;
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use store::{count_events, get_event_json, SqliteEventStore, SqliteWriteTxn};
