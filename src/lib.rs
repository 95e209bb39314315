//! Silo Operations API
//!
//! Backend for the Silo restaurant and retail operations platform.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppServices so binaries and tests build the service layer the
// same way the router does.
pub use handlers::AppServices;

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

/// The full v1 API surface (everything except `/auth`, which carries its
/// own state).
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::health::api_status))
        .route("/health", get(handlers::health::health_check))
        .nest("/items", handlers::items::item_routes())
        .nest(
            "/inventory/composite-items",
            handlers::items::composite_routes(),
        )
        .nest("/inventory/production", handlers::items::production_routes())
        .nest("/inventory/timeline", handlers::timeline::timeline_routes())
        .nest("/inventory/counts", handlers::counts::count_routes())
        .nest("/vendors", handlers::vendors::vendor_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/po-templates", handlers::purchase_orders::template_routes())
        .nest("/transfers", handlers::transfers::transfer_routes())
        .nest("/stock", handlers::stock::stock_routes())
        .nest("/users", handlers::users::user_routes())
        .merge(handlers::users::directory_routes())
}
