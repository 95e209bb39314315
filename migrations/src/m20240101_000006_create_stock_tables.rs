use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockLevels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockLevels::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockLevels::ItemId).uuid().not_null())
                    .col(ColumnDef::new(StockLevels::BranchId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockLevels::Quantity)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StockLevels::MinQuantity)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockLevels::MaxQuantity)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockLevels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One stock row per item per branch
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_levels_item_branch")
                    .table(StockLevels::Table)
                    .col(StockLevels::ItemId)
                    .col(StockLevels::BranchId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransactions::ItemId).uuid().not_null())
                    .col(ColumnDef::new(StockTransactions::BranchId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockTransactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::DeductionReason)
                            .string_len(16)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::Quantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::QuantityBefore)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::QuantityAfter)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransactions::ReferenceId).uuid().null())
                    .col(
                        ColumnDef::new(StockTransactions::ReferenceType)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(StockTransactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(StockTransactions::Notes).string().null())
                    .col(
                        ColumnDef::new(StockTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockLevels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StockLevels {
    Table,
    Id,
    ItemId,
    BranchId,
    Quantity,
    MinQuantity,
    MaxQuantity,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StockTransactions {
    Table,
    Id,
    ItemId,
    BranchId,
    TransactionType,
    DeductionReason,
    Quantity,
    QuantityBefore,
    QuantityAfter,
    ReferenceId,
    ReferenceType,
    UserId,
    Notes,
    CreatedAt,
}
