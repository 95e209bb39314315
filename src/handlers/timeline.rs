use super::common::{map_service_error, success_response, Paginated};
use crate::{
    auth::TenantContext, errors::ApiError, handlers::AppState, services::timeline::TimelineQuery,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Paginated ledger feed with type/reason filters
#[utoipa::path(
    get,
    path = "/api/v1/inventory/timeline",
    params(
        ("transaction_type" = Option<String>, Query, description = "Filter by transaction type"),
        ("deduction_reason" = Option<String>, Query, description = "Filter by deduction reason")
    ),
    responses((status = 200, description = "Timeline fetched")),
    tag = "timeline"
)]
pub async fn list_timeline(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<TimelineQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .timeline
        .list(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        rows,
        total,
        query.page,
        query.limit,
    )))
}

/// Today/week feed stats, server-aggregated
pub async fn timeline_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .timeline
        .stats(&ctx)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// One item's ledger history at the acting branch
pub async fn item_timeline(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (rows, total) = state
        .services
        .timeline
        .item_timeline(&ctx, item_id, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        rows,
        total,
        query.page,
        query.limit,
    )))
}

pub fn timeline_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_timeline))
        .route("/stats", get(timeline_stats))
        .route("/item/:id", get(item_timeline))
}
