use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Privacy, Project};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub privacy: Option<Privacy>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub privacy: Privacy,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteSqlRequest {
    pub sql: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: crate::types::Token,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Project metadata plus the tables currently visible in its backend database.
#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: Project,
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// Body of the public query endpoint. Fields are optional so missing input
/// maps to the documented 400 instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct PublicQueryRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
}

/// Success shape of the public query endpoint: the single statement's
/// columns and rows, flattened.
#[derive(Debug, Serialize)]
pub struct PublicQueryResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}
