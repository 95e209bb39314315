use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Silo Operations API",
        version = "0.3.0",
        description = r#"
# Silo Operations API

Backend for the Silo restaurant and retail operations platform: catalog and
composite production, vendors and purchasing, receiving with variance
handling, branch transfers, the stock ledger and timeline, inventory counts,
and workspace user management.

## Authentication

All endpoints except `/auth/login` require a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Branch-scoped endpoints additionally require the acting branch:

```
X-Branch-Id: <branch-uuid>
```

Owners may act on another of their businesses with `X-Business-Id`.

## Errors

Failures return a consistent body with the request id for support:

```json
{
  "error": "Bad Request",
  "message": "line 7f.. under-received: variance_reason is required",
  "request_id": "req-abc123",
  "timestamp": "2026-08-07T00:00:00Z"
}
```
        "#,
        contact(
            name = "Silo Engineering",
            email = "engineering@getsilo.app"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login and session tokens"),
        (name = "items", description = "Catalog and composite items"),
        (name = "production", description = "Composite production runs"),
        (name = "vendors", description = "Vendor management"),
        (name = "purchase-orders", description = "Purchase order lifecycle and receiving"),
        (name = "transfers", description = "Branch-to-branch stock transfers"),
        (name = "stock", description = "Stock levels, limits, adjustments"),
        (name = "timeline", description = "Stock ledger feed"),
        (name = "inventory-counts", description = "Stock count sessions"),
        (name = "users", description = "Workspace user management")
    ),
    paths(
        crate::auth::login,
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::update_item,
        crate::handlers::items::list_composite_items,
        crate::handlers::items::produce,
        crate::handlers::vendors::list_vendors,
        crate::handlers::vendors::create_vendor,
        crate::handlers::vendors::delete_vendor,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::update_purchase_order_status,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::transfers::create_transfer,
        crate::handlers::transfers::receive_transfer,
        crate::handlers::transfers::cancel_transfer,
        crate::handlers::stock::list_stock,
        crate::handlers::stock::update_limits,
        crate::handlers::stock::adjust_stock,
        crate::handlers::timeline::list_timeline,
        crate::handlers::counts::create_count,
        crate::handlers::counts::complete_count,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::auth::LoginRequest,
            crate::services::catalog::CreateItemCommand,
            crate::services::catalog::UpdateItemCommand,
            crate::services::production::ProduceCommand,
            crate::services::vendors::CreateVendorCommand,
            crate::services::purchase_orders::CreatePurchaseOrderCommand,
            crate::services::purchase_orders::UpdateStatusCommand,
            crate::services::receiving::ReceivePurchaseOrderCommand,
            crate::services::transfers::CreateTransferCommand,
            crate::services::stock::UpdateLimitsCommand,
            crate::services::stock::AdjustStockCommand,
            crate::services::counts::CreateCountCommand,
            crate::services::users::CreateUserCommand,
            crate::services::users::UpdateUserCommand,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Silo Operations API"));
        assert!(json.contains("/api/v1/purchase-orders/{id}/receive"));
    }
}
