use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    Paginated,
};
use crate::{
    auth::TenantContext,
    errors::ApiError,
    handlers::AppState,
    services::catalog::{ComponentInput, CreateItemCommand, ItemListQuery, UpdateItemCommand},
    services::production::ProduceCommand,
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
pub struct CompositeListQuery {
    /// `components` expands recipes for the whole page in one batch.
    pub expand: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

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

/// List items for the acting business
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("item_type" = Option<String>, Query, description = "Filter by item type"),
        ("search" = Option<String>, Query, description = "Substring match on name/sku")
    ),
    responses(
        (status = 200, description = "Items fetched"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<ItemListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .catalog
        .list_items(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        items,
        total,
        query.page,
        query.limit,
    )))
}

/// Create an item
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemCommand,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateItemCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .catalog
        .create_item(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(item))
}

/// Fetch one item
pub async fn get_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .get_item(&ctx, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Patch an item
#[utoipa::path(
    patch,
    path = "/api/v1/items/{id}",
    request_body = UpdateItemCommand,
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item updated"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .update_item(&ctx, item_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_item(&ctx, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// List composite items, optionally expanding recipes in one batch
#[utoipa::path(
    get,
    path = "/api/v1/inventory/composite-items",
    params(
        ("expand" = Option<String>, Query, description = "Set to `components` to expand recipes")
    ),
    responses((status = 200, description = "Composite items fetched")),
    tag = "items"
)]
pub async fn list_composite_items(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<CompositeListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let expand = query.expand.as_deref() == Some("components");
    let (items, total) = state
        .services
        .catalog
        .list_composite_items(&ctx, expand, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        items,
        total,
        query.page,
        query.limit,
    )))
}

/// Fetch one composite item with its recipe
pub async fn get_composite_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .get_composite_item(&ctx, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Replace a composite item's recipe
pub async fn replace_components(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<Vec<ComponentInput>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .replace_components(&ctx, item_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Run production batches for a composite item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/composite-items/{id}/produce",
    request_body = ProduceCommand,
    params(("id" = Uuid, Path, description = "Composite item ID")),
    responses(
        (status = 201, description = "Production run completed"),
        (status = 422, description = "Insufficient component stock", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn produce(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<ProduceCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let run = state
        .services
        .production
        .produce(&ctx, item_id, payload)
        .await
        .map_err(map_service_error)?;

    info!(production_id = %run.id, "Production run posted");

    Ok(created_response(run))
}

/// Production run history for the acting branch
pub async fn list_production_runs(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (runs, total) = state
        .services
        .production
        .list_runs(&ctx, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        runs,
        total,
        query.page,
        query.limit,
    )))
}

/// Today/week production stats, server-aggregated
pub async fn production_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .production
        .stats(&ctx)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/:id/components", put(replace_components))
}

pub fn composite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_composite_items))
        .route("/:id", get(get_composite_item))
        .route("/:id/produce", post(produce))
}

pub fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_production_runs))
        .route("/stats", get(production_stats))
}
