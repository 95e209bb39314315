use super::common::{created_response, map_service_error, success_response, validate_input, Paginated};
use crate::{
    auth::{AuthenticatedUser, TenantContext},
    errors::ApiError,
    handlers::AppState,
    services::transfers::{CreateTransferCommand, TransferListQuery},
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
pub struct CancelTransferRequest {
    pub reason: Option<String>,
}

/// Create a transfer; source stock is deducted immediately
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferCommand,
    responses(
        (status = 201, description = "Transfer created"),
        (status = 400, description = "Same source and destination branch", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at source", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateTransferCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let transfer = state
        .services
        .transfers
        .create(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    info!(transfer_id = %transfer.transfer.id, "Transfer created");

    Ok(created_response(transfer))
}

/// Transfers touching the acting branch
pub async fn list_transfers(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<TransferListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (transfers, total) = state
        .services
        .transfers
        .list(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        transfers,
        total,
        query.page,
        query.limit,
    )))
}

/// Branches reachable from the acting context
pub async fn transfer_destinations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let destinations = state
        .services
        .transfers
        .destinations(&ctx, &user.username)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(destinations))
}

/// Fetch one transfer with lines and action flags
pub async fn get_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transfer_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let transfer = state
        .services
        .transfers
        .get(&ctx, transfer_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(transfer))
}

/// Receive a pending transfer (receiving branch only)
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/receive",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer received"),
        (status = 403, description = "Acting branch is not the destination", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn receive_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transfer_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let transfer = state
        .services
        .transfers
        .receive(&ctx, transfer_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(transfer))
}

/// Cancel a pending transfer (sending branch only)
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/cancel",
    request_body = CancelTransferRequest,
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer cancelled"),
        (status = 403, description = "Acting branch is not the source", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transfer_id): Path<Uuid>,
    Json(payload): Json<CancelTransferRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let transfer = state
        .services
        .transfers
        .cancel(&ctx, transfer_id, payload.reason)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(transfer))
}

pub fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/destinations", get(transfer_destinations))
        .route("/:id", get(get_transfer))
        .route("/:id/receive", post(receive_transfer))
        .route("/:id/cancel", post(cancel_transfer))
}
