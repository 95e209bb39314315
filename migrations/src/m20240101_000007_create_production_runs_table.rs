use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductionRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductionRuns::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionRuns::CompositeItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductionRuns::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(ProductionRuns::BranchId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProductionRuns::BatchCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionRuns::TotalYield)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductionRuns::YieldUnit).string().not_null())
                    .col(
                        ColumnDef::new(ProductionRuns::ProductionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionRuns::Status)
                            .string_len(16)
                            .not_null()
                            .default("completed"),
                    )
                    .col(ColumnDef::new(ProductionRuns::Notes).string().null())
                    .col(ColumnDef::new(ProductionRuns::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(ProductionRuns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductionRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductionRuns {
    Table,
    Id,
    CompositeItemId,
    BusinessId,
    BranchId,
    BatchCount,
    TotalYield,
    YieldUnit,
    ProductionDate,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
}
