//! Backend administration: privileged access to the database server that
//! holds the per-project databases.
//!
//! All access goes through a single fixed admin identity; isolation between
//! projects is by database name, not backend-level authorization. Connections
//! are opened per call and dropped afterwards; pooling can be added behind
//! [`Backend`] without touching the gateway or executor.

mod mysql;
mod sqlite;

pub use mysql::MySqlBackend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// One statement's fetched result set: ordered column names and rows as
/// JSON objects keyed by column name.
#[derive(Debug, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Idempotently creates a backend database. Succeeds if it already exists.
    async fn ensure_database(&self, name: &str) -> Result<()>;

    /// Removes a backend database. Used only to compensate a failed
    /// provisioning step; succeeds if the database is already absent.
    async fn drop_database(&self, name: &str) -> Result<()>;

    /// Ordered table names visible in the database; empty for a database
    /// with no tables.
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;

    /// Opens a connection bound to exactly one database. Cross-database
    /// access is never exposed through the returned handle.
    async fn connect(&self, database: &str) -> Result<Box<dyn BackendConnection>>;
}

#[async_trait]
pub trait BackendConnection: Send {
    /// Runs one statement and fetches its full result set.
    async fn query(&mut self, statement: &str) -> Result<QueryRows>;

    /// Runs one statement without fetching rows; returns the affected count.
    async fn execute(&mut self, statement: &str) -> Result<u64>;
}
