use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transfers::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Transfers::TransferNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Transfers::FromBusinessId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::FromBranchId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::ToBusinessId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::ToBranchId).uuid().not_null())
                    .col(
                        ColumnDef::new(Transfers::TransferDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transfers::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Transfers::Notes).string().null())
                    .col(ColumnDef::new(Transfers::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Transfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transfers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransferLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransferLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransferLines::TransferId).uuid().not_null())
                    .col(ColumnDef::new(TransferLines::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(TransferLines::Quantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfer_lines_transfer")
                            .from(TransferLines::Table, TransferLines::TransferId)
                            .to(Transfers::Table, Transfers::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransferLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transfers {
    Table,
    Id,
    TransferNumber,
    FromBusinessId,
    FromBranchId,
    ToBusinessId,
    ToBranchId,
    TransferDate,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TransferLines {
    Table,
    Id,
    TransferId,
    ItemId,
    Quantity,
}
