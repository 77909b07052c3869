use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::query::ExecuteOptions;
use crate::server::AppState;
use crate::server::dto::{PublicQueryRequest, PublicQueryResponse};
use crate::sql::{is_read_only, split_statements};

/// Hard cap on rows served per public call.
pub const PUBLIC_ROW_CAP: u32 = 500;

/// Public-path errors carry a bare `{"error": ...}` body; the wire contract
/// has no data envelope.
pub struct PublicError {
    status: StatusCode,
    message: String,
}

impl PublicError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for PublicError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<Error> for PublicError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::QueryTimeout => StatusCode::GATEWAY_TIMEOUT,
            // Metadata store failures are masked; execution failures surface
            // the raw backend message (accepted tradeoff, see DESIGN.md).
            Error::Meta(_) | Error::Io(_) | Error::Config(_) => {
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                };
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// `POST /api/public/{project_name}/query`
///
/// Key-authenticated, read-only, row-capped. Resolution of name, key, and
/// published state happens in one joint lookup; every mismatch produces the
/// same 403 body so callers cannot probe which condition failed.
pub async fn public_query(
    State(state): State<Arc<AppState>>,
    Path(project_name): Path<String>,
    Json(req): Json<PublicQueryRequest>,
) -> Result<Json<PublicQueryResponse>, PublicError> {
    let api_key = req.api_key.as_deref().unwrap_or("").trim();
    let sql = req.sql.as_deref().unwrap_or("").trim();
    if api_key.is_empty() || sql.is_empty() {
        return Err(PublicError::bad_request("api_key and sql (SELECT) required"));
    }

    let project = state
        .store
        .resolve_published(&project_name, api_key)
        .map_err(PublicError::from)?
        .ok_or(Error::AccessDenied)?;

    if !is_read_only(sql) {
        return Err(
            Error::InvalidQuery("Only SELECT statements allowed on public API".to_string()).into(),
        );
    }

    // One statement per call: the public contract serves exactly one result
    // set, so multi-statement scripts are rejected instead of silently
    // dropping all but the first result.
    if split_statements(sql).len() > 1 {
        return Err(
            Error::InvalidQuery("Public API accepts a single SELECT statement".to_string()).into(),
        );
    }

    let results = state
        .executor
        .execute(
            &project.backend_db,
            sql,
            ExecuteOptions::read_only_capped(PUBLIC_ROW_CAP),
        )
        .await
        .map_err(PublicError::from)?;

    // Columns mirror the first row's keys: an empty result set reports no
    // columns even when the backend knows them.
    let (columns, rows) = match results.into_iter().next() {
        Some(result) if !result.rows.is_empty() => (result.columns, result.rows),
        _ => (Vec::new(), Vec::new()),
    };

    Ok(Json(PublicQueryResponse { columns, rows }))
}
