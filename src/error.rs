use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata store error: {0}")]
    Meta(#[from] rusqlite::Error),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend permission denied: {0}")]
    PermissionDenied(String),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("{0}")]
    Execution(String),

    #[error("statement timed out")]
    QueryTimeout,

    #[error("Invalid key or project not published")]
    AccessDenied,

    #[error("{0}")]
    InvalidQuery(String),

    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
