use super::common::{map_service_error, success_response, validate_input, Paginated};
use crate::{
    auth::TenantContext,
    errors::ApiError,
    handlers::AppState,
    services::stock::{AdjustStockCommand, StockListQuery, UpdateLimitsCommand},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

/// Per-branch stock list with health classification
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name/sku/category"),
        ("low_stock" = Option<bool>, Query, description = "Only low and out-of-stock rows")
    ),
    responses((status = 200, description = "Stock fetched")),
    tag = "stock"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<StockListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .stock
        .list_stock(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        rows,
        total,
        query.page,
        query.limit,
    )))
}

/// Aggregated stock health counts for the acting branch
pub async fn stock_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .stock
        .stats(&ctx)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// Set min/max thresholds for one item at the acting branch
#[utoipa::path(
    patch,
    path = "/api/v1/stock/{item_id}/limits",
    request_body = UpdateLimitsCommand,
    params(("item_id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Limits updated"),
        (status = 400, description = "max must exceed min", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn update_limits(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateLimitsCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let level = state
        .services
        .stock
        .update_limits(&ctx, item_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(level))
}

/// Manual stock adjustment; deductions require a reason
#[utoipa::path(
    post,
    path = "/api/v1/stock/{item_id}/adjust",
    request_body = AdjustStockCommand,
    params(("item_id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Adjustment posted"),
        (status = 422, description = "Would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<AdjustStockCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let row = state
        .services
        .stock
        .adjust(&ctx, item_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(row))
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock))
        .route("/stats", get(stock_stats))
        .route("/:item_id/limits", patch(update_limits))
        .route("/:item_id/adjust", post(adjust_stock))
}
