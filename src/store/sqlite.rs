use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        password: row.get(2)?,
        privacy: Privacy::from_db(&row.get::<_, String>(3)?),
        backend_db: row.get(4)?,
        api_key: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        expires_at: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_datetime(&s)),
        last_used_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
    })
}

const PROJECT_COLUMNS: &str =
    "id, name, password, privacy, backend_db, api_key, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, token_hash, token_lookup, created_at, expires_at, last_used_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Project operations

    fn create_project(&self, project: &Project) -> Result<()> {
        self.conn().execute(
            "INSERT INTO projects (id, name, password, privacy, backend_db, api_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project.id,
                project.name,
                project.password,
                project.privacy.as_str(),
                project.backend_db,
                project.api_key,
                format_datetime(&project.created_at),
                format_datetime(&project.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"),
            params![name],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_backend_db(&self, backend_db: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE backend_db = ?1"),
            params![backend_db],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self, cursor: &str, limit: i32) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], project_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn resolve_published(&self, name: &str, api_key: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PROJECT_COLUMNS} FROM projects
                 WHERE name = ?1 AND api_key = ?2 AND privacy = 'Publish'"
            ),
            params![name, api_key],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_api_key(&self, id: &str, api_key: &str) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE projects SET api_key = ?1, updated_at = ?2 WHERE id = ?3",
            params![api_key, format_datetime(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_privacy(&self, id: &str, privacy: Privacy) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE projects SET privacy = ?1, updated_at = ?2 WHERE id = ?3",
            params![privacy.as_str(), format_datetime(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_operator_token(&self) -> Result<bool> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::new(":memory:").unwrap();
        store.initialize().unwrap();
        store
    }

    fn test_project(name: &str, privacy: Privacy) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            password: "pw1".to_string(),
            privacy,
            backend_db: crate::store::dbname::derive_db_name(name),
            api_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_project_round_trip() {
        let store = test_store();
        let project = test_project("Sales", Privacy::Private);
        store.create_project(&project).unwrap();

        let loaded = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Sales");
        assert_eq!(loaded.password, "pw1");
        assert_eq!(loaded.privacy, Privacy::Private);
        assert_eq!(loaded.backend_db, "proj_Sales");
        assert!(loaded.api_key.is_none());

        let by_name = store.get_project_by_name("Sales").unwrap().unwrap();
        assert_eq!(by_name.id, project.id);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = test_store();
        store.create_project(&test_project("Sales", Privacy::Private)).unwrap();
        assert!(store.create_project(&test_project("Sales", Privacy::Private)).is_err());
    }

    #[test]
    fn test_backend_db_collision_rejected() {
        let store = test_store();
        store.create_project(&test_project("My Proj!", Privacy::Private)).unwrap();
        // Different name, identical sanitized backend_db.
        assert!(store.create_project(&test_project("My_Proj_", Privacy::Private)).is_err());
    }

    #[test]
    fn test_resolve_published_requires_all_three() {
        let store = test_store();
        let mut project = test_project("Sales", Privacy::Publish);
        project.api_key = Some("k1".to_string());
        store.create_project(&project).unwrap();

        assert!(store.resolve_published("Sales", "k1").unwrap().is_some());
        assert!(store.resolve_published("Sales", "wrong").unwrap().is_none());
        assert!(store.resolve_published("Nope", "k1").unwrap().is_none());

        let private = test_project("Hidden", Privacy::Private);
        store.create_project(&private).unwrap();
        store.set_api_key(&private.id, "k2").unwrap();
        assert!(store.resolve_published("Hidden", "k2").unwrap().is_none());
    }

    #[test]
    fn test_resolve_published_without_key_never_matches() {
        let store = test_store();
        let project = test_project("Sales", Privacy::Publish);
        store.create_project(&project).unwrap();
        // api_key is NULL; no given key can match it.
        assert!(store.resolve_published("Sales", "").unwrap().is_none());
    }

    #[test]
    fn test_set_api_key_overwrites() {
        let store = test_store();
        let project = test_project("Sales", Privacy::Publish);
        store.create_project(&project).unwrap();

        store.set_api_key(&project.id, "first").unwrap();
        store.set_api_key(&project.id, "second").unwrap();

        assert!(store.resolve_published("Sales", "first").unwrap().is_none());
        assert!(store.resolve_published("Sales", "second").unwrap().is_some());
    }

    #[test]
    fn test_set_privacy_flips_public_reachability() {
        let store = test_store();
        let project = test_project("Sales", Privacy::Private);
        store.create_project(&project).unwrap();
        store.set_api_key(&project.id, "k1").unwrap();

        assert!(store.resolve_published("Sales", "k1").unwrap().is_none());
        store.set_privacy(&project.id, Privacy::Publish).unwrap();
        assert!(store.resolve_published("Sales", "k1").unwrap().is_some());
    }

    #[test]
    fn test_set_on_missing_project() {
        let store = test_store();
        assert!(matches!(store.set_api_key("nope", "k"), Err(Error::NotFound)));
        assert!(matches!(
            store.set_privacy("nope", Privacy::Publish),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_token_round_trip() {
        let store = test_store();
        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: "$argon2id$fake".to_string(),
            token_lookup: "abcd1234".to_string(),
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };

        assert!(!store.has_operator_token().unwrap());
        store.create_token(&token).unwrap();
        assert!(store.has_operator_token().unwrap());

        let loaded = store.get_token_by_lookup("abcd1234").unwrap().unwrap();
        assert_eq!(loaded.id, token.id);

        store.update_token_last_used(&token.id).unwrap();
        let touched = store.get_token_by_id(&token.id).unwrap().unwrap();
        assert!(touched.last_used_at.is_some());

        assert!(store.delete_token(&token.id).unwrap());
        assert!(!store.delete_token(&token.id).unwrap());
    }
}
