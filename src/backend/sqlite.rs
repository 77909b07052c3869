use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};

use super::{Backend, BackendConnection, QueryRows};
use crate::error::{Error, Result};

/// Embedded backend: each project database is a single SQLite file under the
/// root directory. The zero-config mode for self-hosted deployments, and the
/// backend the integration tests run against.
pub struct SqliteBackend {
    root: PathBuf,
}

impl SqliteBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn db_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.db"))
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::BadRequest(format!("invalid database name: {name}")));
    }
    Ok(())
}

fn open(path: &Path) -> Result<Connection> {
    Connection::open(path).map_err(|e| Error::BackendUnavailable(e.to_string()))
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn ensure_database(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        fs::create_dir_all(&self.root)?;
        // A zero-length file is a valid empty SQLite database; touching it is
        // enough and is idempotent.
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.db_path(name))?;
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        match fs::remove_file(self.db_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        validate_identifier(database)?;
        let path = self.db_path(database);
        if !path.exists() {
            return Err(Error::DatabaseNotFound(database.to_string()));
        }
        let conn = open(&path)?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    async fn connect(&self, database: &str) -> Result<Box<dyn BackendConnection>> {
        validate_identifier(database)?;
        let path = self.db_path(database);
        if !path.exists() {
            return Err(Error::DatabaseNotFound(database.to_string()));
        }
        let conn = open(&path)?;
        Ok(Box::new(SqliteBackendConn { conn }))
    }
}

struct SqliteBackendConn {
    conn: Connection,
}

fn statement_error(e: rusqlite::Error) -> Error {
    Error::Execution(e.to_string())
}

fn cell_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(BASE64.encode(b)),
    }
}

#[async_trait]
impl BackendConnection for SqliteBackendConn {
    async fn query(&mut self, statement: &str) -> Result<QueryRows> {
        let mut stmt = self.conn.prepare(statement).map_err(statement_error)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query([]).map_err(statement_error)?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(statement_error)? {
            let mut object = Map::new();
            for (idx, column) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(statement_error)?;
                object.insert(column.clone(), cell_to_json(value));
            }
            collected.push(object);
        }

        Ok(QueryRows {
            columns,
            rows: collected,
        })
    }

    async fn execute(&mut self, statement: &str) -> Result<u64> {
        self.conn
            .execute(statement, [])
            .map(|n| n as u64)
            .map_err(statement_error)
    }
}
