use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::auth::RequireOperator;
use crate::query::ExecuteOptions;
use crate::server::AppState;
use crate::server::dto::{
    ApiKeyResponse, CreateProjectRequest, ExecuteSqlRequest, PaginationParams,
    ProjectDetailResponse, UpdateProjectRequest,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::store::dbname::{derive_db_name, validate_project_name};
use crate::types::{Privacy, Project};

const API_KEY_BYTES: usize = 28;

fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub async fn list_projects(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let projects = state
        .store
        .list_projects(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list projects")?;

    let (projects, next_cursor, has_more) =
        paginate(projects, DEFAULT_PAGE_SIZE as usize, |p| p.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(projects, next_cursor, has_more)))
}

/// Provisions a project: validate, derive the backend database name, check
/// both name and derived-name collisions, create the backend database, then
/// persist metadata. A failed metadata insert drops the database again so a
/// half-provisioned project is not left behind.
pub async fn create_project(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    validate_project_name(&req.name).map_err(ApiError::from)?;
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Project password cannot be empty"));
    }

    let backend_db = derive_db_name(&req.name);

    if state
        .store
        .get_project_by_name(&req.name)
        .api_err("Failed to check existing project")?
        .is_some()
    {
        return Err(ApiError::conflict("Project already exists"));
    }

    if let Some(existing) = state
        .store
        .get_project_by_backend_db(&backend_db)
        .api_err("Failed to check database name")?
    {
        return Err(ApiError::conflict(format!(
            "Project name sanitizes to the same database as '{}'",
            existing.name
        )));
    }

    state
        .backend
        .ensure_database(&backend_db)
        .await
        .map_err(ApiError::from)?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        password: req.password,
        privacy: req.privacy.unwrap_or(Privacy::Private),
        backend_db: backend_db.clone(),
        api_key: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.store.create_project(&project) {
        // Creation order is database-then-metadata; compensate so the
        // backend database does not outlive a failed insert.
        if let Err(drop_err) = state.backend.drop_database(&backend_db).await {
            tracing::warn!(
                "Failed to drop backend database '{}' after metadata failure: {}",
                backend_db,
                drop_err
            );
        }
        tracing::error!("Failed to save project metadata: {e}");
        return Err(ApiError::internal("Failed to save project metadata"));
    }

    tracing::info!("Created project '{}' (database: {})", project.name, backend_db);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    // A table-listing failure degrades to an empty list rather than hiding
    // the project metadata.
    let tables = match state.backend.list_tables(&project.backend_db).await {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("Could not list tables for '{}': {}", project.backend_db, e);
            Vec::new()
        }
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(ProjectDetailResponse {
        project,
        tables,
    })))
}

/// Runs arbitrary SQL against the project's backend database. Operator only;
/// no statement-kind restriction and no row cap.
pub async fn execute_sql(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ExecuteSqlRequest>,
) -> impl IntoResponse {
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(ApiError::bad_request("No SQL provided"));
    }

    let project = state
        .store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let results = state
        .executor
        .execute(&project.backend_db, sql, ExecuteOptions::unrestricted())
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(results)))
}

/// Generates a fresh API key for the project, overwriting any previous one.
/// The previous key stops working immediately; there is no rollback.
pub async fn generate_api_key_handler(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let api_key = generate_api_key();
    state
        .store
        .set_api_key(&project.id, &api_key)
        .api_err("Failed to save API key")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

pub async fn update_project(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    state
        .store
        .set_privacy(&project.id, req.privacy)
        .api_err("Failed to update project")?;

    let updated = state
        .store
        .get_project(&project.id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(updated)))
}

/// First rows of one table, capped. The table must be one the backend
/// reports; that check stands in for identifier escaping.
pub async fn table_view(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path((id, table_name)): Path<(String, String)>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let tables = state
        .backend
        .list_tables(&project.backend_db)
        .await
        .map_err(ApiError::from)?;
    if !tables.contains(&table_name) {
        return Err(ApiError::not_found("Table not found"));
    }

    let results = state
        .executor
        .execute(
            &project.backend_db,
            &format!("SELECT * FROM `{table_name}` LIMIT 500"),
            ExecuteOptions::unrestricted(),
        )
        .await
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(results)))
}
