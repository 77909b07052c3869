use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

use quarry::auth::TokenGenerator;
use quarry::backend::SqliteBackend;
use quarry::server::{AppState, create_router};
use quarry::store::{SqliteStore, Store};
use quarry::types::Token;

pub struct TestGateway {
    pub router: Router,
    pub operator_token: String,
    pub projects_dir: PathBuf,
    _temp_dir: TempDir,
}

/// In-process gateway over a tempfile metadata store and the embedded
/// SQLite backend.
pub fn start() -> TestGateway {
    let temp_dir = TempDir::new().expect("create temp dir");
    let projects_dir = temp_dir.path().join("projects");

    let store = SqliteStore::new(temp_dir.path().join("quarry.db")).expect("open meta store");
    store.initialize().expect("initialize meta store");

    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator.generate().expect("generate token");
    store
        .create_token(&Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        })
        .expect("store operator token");

    let backend = Arc::new(SqliteBackend::new(projects_dir.clone()));
    let state = Arc::new(AppState::new(
        Arc::new(store),
        backend,
        Duration::from_secs(30),
    ));

    TestGateway {
        router: create_router(state),
        operator_token: raw_token,
        projects_dir,
        _temp_dir: temp_dir,
    }
}

/// Sends one request through the router and returns (status, parsed body).
/// Non-JSON and empty bodies come back as `Value::Null`.
pub async fn request(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = router.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

impl TestGateway {
    pub async fn operator(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        request(&self.router, method, path, Some(&self.operator_token), body).await
    }

    /// Creates a project and returns its id.
    pub async fn create_project(&self, name: &str, password: &str, privacy: &str) -> String {
        let (status, body) = self
            .operator(
                "POST",
                "/api/v1/projects",
                Some(serde_json::json!({
                    "name": name,
                    "password": password,
                    "privacy": privacy,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project: {body}");
        body["data"]["id"].as_str().expect("project id").to_string()
    }

    /// Generates an API key for the project and returns it.
    pub async fn generate_api_key(&self, project_id: &str) -> String {
        let (status, body) = self
            .operator("POST", &format!("/api/v1/projects/{project_id}/api-key"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "generate api key: {body}");
        body["data"]["api_key"]
            .as_str()
            .expect("api key")
            .to_string()
    }

    /// Runs SQL through the operator query endpoint, asserting success.
    pub async fn run_sql(&self, project_id: &str, sql: &str) -> Value {
        let (status, body) = self
            .operator(
                "POST",
                &format!("/api/v1/projects/{project_id}/query"),
                Some(serde_json::json!({ "sql": sql })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "run sql: {body}");
        body["data"].clone()
    }

    pub async fn public_query(
        &self,
        project_name: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        request(
            &self.router,
            "POST",
            &format!("/api/public/{project_name}/query"),
            None,
            Some(body),
        )
        .await
    }
}
