use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireOperator, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{CreateTokenRequest, CreateTokenResponse, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, paginate,
};
use crate::types::Token;

pub async fn list_tokens(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let tokens = state
        .store
        .list_tokens(cursor, DEFAULT_PAGE_SIZE + 1)
        .map_err(|_| ApiError::internal("Failed to list tokens"))?;

    let (tokens, next_cursor, has_more) =
        paginate(tokens, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(tokens, next_cursor, has_more)))
}

pub async fn create_token(
    _operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTokenRequest>,
) -> impl IntoResponse {
    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator
        .generate()
        .map_err(|_| ApiError::internal("Failed to generate token"))?;

    let expires_at = req
        .expires_in_seconds
        .map(|secs| Utc::now() + Duration::seconds(secs));

    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        created_at: Utc::now(),
        expires_at,
        last_used_at: None,
    };

    state
        .store
        .create_token(&token)
        .map_err(|_| ApiError::internal("Failed to create token"))?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: token,
        })),
    ))
}

pub async fn delete_token(
    operator: RequireOperator,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = state
        .store
        .get_token_by_id(&id)
        .map_err(|_| ApiError::internal("Failed to get token"))?
        .ok_or_else(|| ApiError::not_found("Token not found"))?;

    if token.id == operator.0.id {
        return Err(ApiError::bad_request("Cannot delete current token"));
    }

    state
        .store
        .delete_token(&token.id)
        .map_err(|_| ApiError::internal("Failed to delete token"))?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
