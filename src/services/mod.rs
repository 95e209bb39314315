pub mod catalog;
pub mod counts;
pub mod production;
pub mod purchase_orders;
pub mod receiving;
pub mod stock;
pub mod timeline;
pub mod transfers;
pub mod users;
pub mod vendors;

pub use catalog::CatalogService;
pub use counts::InventoryCountService;
pub use production::ProductionService;
pub use purchase_orders::PurchaseOrderService;
pub use receiving::ReceivingService;
pub use stock::StockService;
pub use timeline::TimelineService;
pub use transfers::TransferService;
pub use users::UserService;
pub use vendors::VendorService;
