pub mod common;
pub mod counts;
pub mod health;
pub mod items;
pub mod purchase_orders;
pub mod stock;
pub mod timeline;
pub mod transfers;
pub mod users;
pub mod vendors;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<services::CatalogService>,
    pub production: Arc<services::ProductionService>,
    pub vendors: Arc<services::VendorService>,
    pub purchase_orders: Arc<services::PurchaseOrderService>,
    pub receiving: Arc<services::ReceivingService>,
    pub transfers: Arc<services::TransferService>,
    pub stock: Arc<services::StockService>,
    pub timeline: Arc<services::TimelineService>,
    pub counts: Arc<services::InventoryCountService>,
    pub users: Arc<services::UserService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let purchase_orders = services::PurchaseOrderService::new(db.clone(), event_sender.clone());
        let receiving = Arc::new(services::ReceivingService::new(
            db.clone(),
            event_sender.clone(),
            purchase_orders.clone(),
        ));

        Self {
            catalog: Arc::new(services::CatalogService::new(db.clone(), event_sender.clone())),
            production: Arc::new(services::ProductionService::new(
                db.clone(),
                event_sender.clone(),
            )),
            vendors: Arc::new(services::VendorService::new(db.clone(), event_sender.clone())),
            purchase_orders: Arc::new(purchase_orders),
            receiving,
            transfers: Arc::new(services::TransferService::new(
                db.clone(),
                event_sender.clone(),
            )),
            stock: Arc::new(services::StockService::new(db.clone(), event_sender.clone())),
            timeline: Arc::new(services::TimelineService::new(db.clone())),
            counts: Arc::new(services::InventoryCountService::new(
                db.clone(),
                event_sender.clone(),
            )),
            users: Arc::new(services::UserService::new(
                db,
                event_sender,
                config.default_user_password.clone(),
            )),
        }
    }
}
