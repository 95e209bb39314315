pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_tenancy_tables;
mod m20240101_000002_create_catalog_tables;
mod m20240101_000003_create_vendors_table;
mod m20240101_000004_create_purchase_order_tables;
mod m20240101_000005_create_transfer_tables;
mod m20240101_000006_create_stock_tables;
mod m20240101_000007_create_production_runs_table;
mod m20240101_000008_create_inventory_count_tables;
mod m20240315_000009_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tenancy_tables::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_vendors_table::Migration),
            Box::new(m20240101_000004_create_purchase_order_tables::Migration),
            Box::new(m20240101_000005_create_transfer_tables::Migration),
            Box::new(m20240101_000006_create_stock_tables::Migration),
            Box::new(m20240101_000007_create_production_runs_table::Migration),
            Box::new(m20240101_000008_create_inventory_count_tables::Migration),
            Box::new(m20240315_000009_add_lookup_indexes::Migration),
        ]
    }
}
