use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::{projects, public, tokens};
use crate::backend::Backend;
use crate::query::QueryExecutor;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub backend: Arc<dyn Backend>,
    pub executor: QueryExecutor,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn Backend>,
        statement_timeout: Duration,
    ) -> Self {
        let executor = QueryExecutor::new(backend.clone(), statement_timeout);
        Self {
            store,
            backend,
            executor,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Operator surface
        .route("/api/v1/projects", get(projects::list_projects))
        .route("/api/v1/projects", post(projects::create_project))
        .route("/api/v1/projects/{id}", get(projects::get_project))
        .route("/api/v1/projects/{id}", patch(projects::update_project))
        .route("/api/v1/projects/{id}/query", post(projects::execute_sql))
        .route(
            "/api/v1/projects/{id}/api-key",
            post(projects::generate_api_key_handler),
        )
        .route(
            "/api/v1/projects/{id}/tables/{table}",
            get(projects::table_view),
        )
        .route("/api/v1/tokens", get(tokens::list_tokens))
        .route("/api/v1/tokens", post(tokens::create_token))
        .route("/api/v1/tokens/{id}", delete(tokens::delete_token))
        // Public surface
        .route(
            "/api/public/{project_name}/query",
            post(public::public_query),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
