#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use silo_api::{
    auth::{AuthService, TenantContext},
    db::{establish_connection, run_migrations, DbPool},
    entities::{
        branch::{self, BranchStatus},
        business,
        business_user::{self, UserRole, UserStatus},
        item::{self, ItemStatus},
        item_component,
        stock_level::{self, Entity as StockLevel},
        vendor::{self, VendorStatus},
    },
    events::EventSender,
    handlers::AppServices,
};

pub const DEFAULT_PASSWORD: &str = "Silo@123456";

/// Everything a service-level test needs: a migrated database, the service
/// aggregate, and a seeded workspace with two branches.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub event_sender: EventSender,
    pub business_id: Uuid,
    pub main_branch: Uuid,
    pub second_branch: Uuid,
    pub owner: business_user::Model,
    pub manager: business_user::Model,
    // Keep the receiver alive so publishes do not log drop warnings
    _event_rx: mpsc::Receiver<silo_api::events::Event>,
}

impl TestApp {
    /// Context acting as the manager at the main branch.
    pub fn ctx(&self) -> TenantContext {
        TenantContext {
            user_id: self.manager.id,
            business_id: self.business_id,
            branch_id: self.main_branch,
            role: UserRole::Manager,
        }
    }

    /// Context acting at the second branch.
    pub fn ctx_second_branch(&self) -> TenantContext {
        TenantContext {
            branch_id: self.second_branch,
            ..self.ctx()
        }
    }

    /// Context acting as the owner at the main branch.
    pub fn owner_ctx(&self) -> TenantContext {
        TenantContext {
            user_id: self.owner.id,
            business_id: self.business_id,
            branch_id: self.main_branch,
            role: UserRole::Owner,
        }
    }
}

/// Each test gets its own named shared-cache in-memory database so tests
/// in one binary can run in parallel without colliding.
pub async fn setup(db_name: &str) -> TestApp {
    let url = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);
    let db = Arc::new(
        establish_connection(&url)
            .await
            .expect("in-memory sqlite should connect"),
    );
    run_migrations(db.as_ref())
        .await
        .expect("migrations should apply");

    let (tx, rx) = mpsc::channel(256);
    let event_sender = EventSender::new(tx);

    let config = test_config();
    let services = AppServices::new(db.clone(), event_sender.clone(), &config);

    let business_id = create_business(db.as_ref(), "Silo Test Kitchen", 4).await;
    let main_branch = create_branch(db.as_ref(), business_id, "Downtown").await;
    let second_branch = create_branch(db.as_ref(), business_id, "Harbor").await;
    let owner = create_user(db.as_ref(), business_id, "olive", UserRole::Owner).await;
    let manager = create_user(db.as_ref(), business_id, "morgan", UserRole::Manager).await;

    TestApp {
        db,
        services,
        event_sender,
        business_id,
        main_branch,
        second_branch,
        owner,
        manager,
        _event_rx: rx,
    }
}

// Built-in defaults are enough for tests; the database handle is created
// directly, so the configured database_url is never dialed.
pub fn test_config() -> silo_api::config::AppConfig {
    silo_api::config::load_config().expect("test config should load")
}

pub async fn create_business(db: &DbPool, name: &str, max_users: i32) -> Uuid {
    let id = Uuid::new_v4();
    business::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        max_users: Set(max_users),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("business insert");
    id
}

pub async fn create_branch(db: &DbPool, business_id: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    branch::ActiveModel {
        id: Set(id),
        business_id: Set(business_id),
        name: Set(name.to_string()),
        status: Set(BranchStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("branch insert");
    id
}

pub async fn create_user(
    db: &DbPool,
    business_id: Uuid,
    username: &str,
    role: UserRole,
) -> business_user::Model {
    business_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(business_id),
        username: Set(username.to_string()),
        password_hash: Set(AuthService::hash_password(DEFAULT_PASSWORD).expect("hash")),
        role: Set(role),
        status: Set(UserStatus::Active),
        display_name: Set(None),
        email: Set(None),
        phone: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("user insert")
}

pub async fn create_item(db: &DbPool, business_id: Uuid, name: &str, sku: &str) -> item::Model {
    item::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(business_id),
        name: Set(name.to_string()),
        name_ar: Set(None),
        category: Set(Some("Pantry".to_string())),
        item_type: Set(None),
        unit: Set("kg".to_string()),
        storage_unit: Set(None),
        sku: Set(sku.to_string()),
        cost_per_unit: Set(Decimal::ZERO),
        default_price: Set(Decimal::ZERO),
        business_price: Set(None),
        is_composite: Set(false),
        batch_quantity: Set(None),
        batch_unit: Set(None),
        status: Set(ItemStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("item insert")
}

pub async fn create_composite_item(
    db: &DbPool,
    business_id: Uuid,
    name: &str,
    sku: &str,
    batch_quantity: Decimal,
) -> item::Model {
    item::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(business_id),
        name: Set(name.to_string()),
        name_ar: Set(None),
        category: Set(Some("Prepared".to_string())),
        item_type: Set(None),
        unit: Set("portion".to_string()),
        storage_unit: Set(None),
        sku: Set(sku.to_string()),
        cost_per_unit: Set(Decimal::ZERO),
        default_price: Set(Decimal::ZERO),
        business_price: Set(None),
        is_composite: Set(true),
        batch_quantity: Set(Some(batch_quantity)),
        batch_unit: Set(Some("portion".to_string())),
        status: Set(ItemStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("composite item insert")
}

pub async fn add_component(db: &DbPool, composite_id: Uuid, component_id: Uuid, quantity: Decimal) {
    item_component::ActiveModel {
        id: Set(Uuid::new_v4()),
        composite_item_id: Set(composite_id),
        component_item_id: Set(component_id),
        quantity: Set(quantity),
    }
    .insert(db)
    .await
    .expect("component insert");
}

pub async fn create_vendor(db: &DbPool, business_id: Uuid, name: &str) -> vendor::Model {
    vendor::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(business_id),
        branch_id: Set(None),
        name: Set(name.to_string()),
        name_ar: Set(None),
        code: Set(Some("V-001".to_string())),
        contact_name: Set(None),
        email: Set(None),
        phone: Set(None),
        country: Set(Some("SA".to_string())),
        tax_number: Set(None),
        payment_terms: Set(30),
        status: Set(VendorStatus::Active),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("vendor insert")
}

/// Seeds a stock level directly, bypassing the ledger.
pub async fn seed_stock(db: &DbPool, item_id: Uuid, branch_id: Uuid, quantity: Decimal) {
    stock_level::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item_id),
        branch_id: Set(branch_id),
        quantity: Set(quantity),
        min_quantity: Set(None),
        max_quantity: Set(None),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("stock insert");
}

pub async fn stock_quantity(db: &DbPool, item_id: Uuid, branch_id: Uuid) -> Decimal {
    StockLevel::find()
        .filter(stock_level::Column::ItemId.eq(item_id))
        .filter(stock_level::Column::BranchId.eq(branch_id))
        .one(db)
        .await
        .expect("stock query")
        .map(|l| l.quantity)
        .unwrap_or(Decimal::ZERO)
}
