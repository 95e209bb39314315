use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Hot-path lookups observed in production query plans: the timeline feed,
// per-branch stock listing, and status-filtered PO/transfer lists.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transactions_branch_created")
                    .table(StockTransactions::Table)
                    .col(StockTransactions::BranchId)
                    .col(StockTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transactions_item")
                    .table(StockTransactions::Table)
                    .col(StockTransactions::ItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_status")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::BusinessId)
                    .col(PurchaseOrders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_from_branch")
                    .table(Transfers::Table)
                    .col(Transfers::FromBranchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_to_branch")
                    .table(Transfers::Table)
                    .col(Transfers::ToBranchId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_stock_transactions_branch_created",
            "idx_stock_transactions_item",
            "idx_purchase_orders_status",
            "idx_transfers_from_branch",
            "idx_transfers_to_branch",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum StockTransactions {
    Table,
    ItemId,
    BranchId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    BusinessId,
    Status,
}

#[derive(DeriveIden)]
enum Transfers {
    Table,
    FromBranchId,
    ToBranchId,
}
