pub mod dbname;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the metadata database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Project operations
    fn create_project(&self, project: &Project) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>>;
    fn get_project_by_backend_db(&self, backend_db: &str) -> Result<Option<Project>>;
    fn list_projects(&self, cursor: &str, limit: i32) -> Result<Vec<Project>>;

    /// Joint public-path resolution: name, api_key, and published state must
    /// all match in a single lookup. Any mismatch returns `None` with no
    /// indication of which condition failed.
    fn resolve_published(&self, name: &str, api_key: &str) -> Result<Option<Project>>;

    fn set_api_key(&self, id: &str, api_key: &str) -> Result<()>;
    fn set_privacy(&self, id: &str, privacy: Privacy) -> Result<()>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    /// Whether any operator token exists (used by `admin init` guard).
    fn has_operator_token(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
