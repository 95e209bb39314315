use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::TenantContext,
    errors::ApiError,
    handlers::AppState,
    services::users::{CreateUserCommand, UpdateUserCommand},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct BusinessesByUsernameQuery {
    pub username: String,
}

/// Users of the acting business
pub async fn list_users(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list(&ctx)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(users))
}

/// Create a user; the initial password is returned exactly once
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserCommand,
    responses(
        (status = 201, description = "User created; response carries the initial password"),
        (status = 403, description = "Caller may not manage users", body = crate::errors::ErrorResponse),
        (status = 409, description = "Seat cap reached or username taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateUserCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .users
        .create(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    info!(user_id = %created.user.id, "User created");

    Ok(created_response(created))
}

/// Patch a user; the owner row is immutable for role/status
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    request_body = UpdateUserCommand,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated"),
        (status = 403, description = "Owner immutability or role restriction", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .update(&ctx, user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(user))
}

/// Delete a user; deleting the owner is always forbidden
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Owner cannot be deleted", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .users
        .delete(&ctx, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Reset a user's password to the configured default
pub async fn reset_password(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reset = state
        .services
        .users
        .reset_password(&ctx, user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(reset))
}

/// Businesses owned by a username; feeds the workspace picker
pub async fn businesses_by_username(
    State(state): State<AppState>,
    Query(query): Query<BusinessesByUsernameQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let businesses = state
        .services
        .users
        .businesses_by_username(&query.username)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(businesses))
}

/// Branches of one business; feeds branch pickers
pub async fn business_branches(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let branches = state
        .services
        .users
        .branches(business_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(branches))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", axum::routing::patch(update_user).delete(delete_user))
        .route("/:id/reset-password", post(reset_password))
}

pub fn directory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/owners/businesses-by-username",
            get(businesses_by_username),
        )
        .route("/businesses/:id/branches", get(business_branches))
}
