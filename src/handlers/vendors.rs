use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::TenantContext,
    errors::ApiError,
    handlers::AppState,
    services::vendors::{CreateVendorCommand, UpdateVendorCommand, VendorListQuery},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Vendors visible to the acting branch
#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name/code")
    ),
    responses((status = 200, description = "Vendors fetched")),
    tag = "vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<VendorListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendors = state
        .services
        .vendors
        .list_vendors(&ctx, &query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendors))
}

/// Create a vendor
#[utoipa::path(
    post,
    path = "/api/v1/vendors",
    request_body = CreateVendorCommand,
    responses(
        (status = 201, description = "Vendor created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateVendorCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let vendor = state
        .services
        .vendors
        .create_vendor(&ctx, payload)
        .await
        .map_err(map_service_error)?;

    info!(vendor_id = %vendor.id, "Vendor created");

    Ok(created_response(vendor))
}

/// Fetch one vendor
pub async fn get_vendor(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(vendor_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .get_vendor(&ctx, vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

/// Patch a vendor
pub async fn update_vendor(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(vendor_id): Path<Uuid>,
    Json(payload): Json<UpdateVendorCommand>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .update_vendor(&ctx, vendor_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(vendor))
}

/// Delete a vendor (rejected while it has open purchase orders)
#[utoipa::path(
    delete,
    path = "/api/v1/vendors/{id}",
    params(("id" = Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 204, description = "Vendor deleted"),
        (status = 409, description = "Vendor has open purchase orders", body = crate::errors::ErrorResponse)
    ),
    tag = "vendors"
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(vendor_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .vendors
        .delete_vendor(&ctx, vendor_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vendors).post(create_vendor))
        .route(
            "/:id",
            get(get_vendor).patch(update_vendor).delete(delete_vendor),
        )
}
