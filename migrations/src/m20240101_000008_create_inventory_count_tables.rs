use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryCounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryCounts::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCounts::CountNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(InventoryCounts::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(InventoryCounts::BranchId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryCounts::CountType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCounts::CountDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCounts::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(InventoryCounts::Notes).string().null())
                    .col(ColumnDef::new(InventoryCounts::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryCounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryCountLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryCountLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryCountLines::CountId).uuid().not_null())
                    .col(ColumnDef::new(InventoryCountLines::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryCountLines::ExpectedQuantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCountLines::CountedQuantity)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCountLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_count_lines_count")
                            .from(InventoryCountLines::Table, InventoryCountLines::CountId)
                            .to(InventoryCounts::Table, InventoryCounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_count_lines_count_item")
                    .table(InventoryCountLines::Table)
                    .col(InventoryCountLines::CountId)
                    .col(InventoryCountLines::ItemId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryCountLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryCounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryCounts {
    Table,
    Id,
    CountNumber,
    BusinessId,
    BranchId,
    CountType,
    CountDate,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryCountLines {
    Table,
    Id,
    CountId,
    ItemId,
    ExpectedQuantity,
    CountedQuantity,
    UpdatedAt,
}
