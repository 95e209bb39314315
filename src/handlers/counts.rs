use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::TenantContext,
    entities::inventory_count::CountStatus,
    errors::ApiError,
    handlers::AppState,
    services::counts::{CreateCountCommand, RecordCountLineInput},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CountListQuery {
    pub status: Option<CountStatus>,
}

/// Start a count session: generates the sheet from the current ledger
#[utoipa::path(
    post,
    path = "/api/v1/inventory/counts",
    request_body = CreateCountCommand,
    responses(
        (status = 201, description = "Count sheet generated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-counts"
)]
pub async fn create_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateCountCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let count = state
        .services
        .counts
        .create(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    info!(count_id = %count.count.id, "Inventory count created");

    Ok(created_response(count))
}

/// Count sessions for the acting branch
pub async fn list_counts(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<CountListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let counts = state
        .services
        .counts
        .list(&ctx, query.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(counts))
}

/// One count session with lines and variances
pub async fn get_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(count_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .counts
        .get(&ctx, count_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(count))
}

/// Record counted quantities onto the sheet
pub async fn record_count_lines(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(count_id): Path<Uuid>,
    Json(payload): Json<Vec<RecordCountLineInput>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .counts
        .record_lines(&ctx, count_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(count))
}

/// Complete the session: posts adjustment ledger rows for every variance
#[utoipa::path(
    post,
    path = "/api/v1/inventory/counts/{id}/complete",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 200, description = "Count completed, adjustments posted"),
        (status = 400, description = "Uncounted lines remain", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-counts"
)]
pub async fn complete_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(count_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .counts
        .complete(&ctx, count_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(count))
}

/// Abandon a draft or in-progress session
pub async fn cancel_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(count_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .counts
        .cancel(&ctx, count_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(count))
}

pub fn count_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_counts).post(create_count))
        .route("/:id", get(get_count))
        .route("/:id/lines", put(record_count_lines))
        .route("/:id/complete", post(complete_count))
        .route("/:id/cancel", post(cancel_count))
}
