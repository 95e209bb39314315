use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    Paginated,
};
use crate::{
    auth::TenantContext,
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::{
        CreatePurchaseOrderCommand, PurchaseOrderListQuery, TemplateCommand,
        UpdatePurchaseOrderCommand, UpdateStatusCommand,
    },
    services::receiving::ReceivePurchaseOrderCommand,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, patch, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a purchase order (quantities only; costs arrive at receiving)
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderCommand,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreatePurchaseOrderCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .create(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    info!(purchase_order_id = %order.order.id, "Purchase order created");

    Ok(created_response(order))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    responses((status = 200, description = "Purchase orders fetched")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<PurchaseOrderListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .purchase_orders
        .list(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(
        orders,
        total,
        query.page,
        query.limit,
    )))
}

/// Fetch one purchase order with lines
pub async fn get_purchase_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .get(&ctx, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Edit a draft or pending purchase order
pub async fn update_purchase_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrderCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .update(&ctx, order_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Drive the status state machine (submit/approve/order/cancel)
#[utoipa::path(
    patch,
    path = "/api/v1/purchase-orders/{id}/status",
    request_body = UpdateStatusCommand,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .update_status(&ctx, order_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Post a receipt against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    request_body = ReceivePurchaseOrderCommand,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Receipt posted"),
        (status = 400, description = "Missing variance justification or invoice", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseOrderCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let result = state
        .services
        .receiving
        .receive(&ctx, order_id, payload)
        .await
        .map_err(map_service_error)?;

    info!(purchase_order_id = %result.purchase_order_id, "Purchase order received");

    Ok(success_response(result))
}

/// Append-only audit log for one purchase order
pub async fn purchase_order_activity(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let activity = state
        .services
        .purchase_orders
        .activity(&ctx, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(activity))
}

// Templates

/// Saved (vendor, items) shapes for recurring orders
pub async fn list_templates(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let templates = state
        .services
        .purchase_orders
        .list_templates(&ctx)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<TemplateCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let template = state
        .services
        .purchase_orders
        .create_template(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(template))
}

pub async fn get_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let template = state
        .services
        .purchase_orders
        .get_template(&ctx, template_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(template))
}

pub async fn update_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
    Json(payload): Json<TemplateCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let template = state
        .services
        .purchase_orders
        .update_template(&ctx, template_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_template(&ctx, template_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route("/:id", get(get_purchase_order).patch(update_purchase_order))
        .route("/:id/status", patch(update_purchase_order_status))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/activity", get(purchase_order_activity))
}

pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/:id",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
}
