use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vendors::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Vendors::BusinessId).uuid().not_null())
                    // NULL branch means the vendor serves every branch
                    .col(ColumnDef::new(Vendors::BranchId).uuid().null())
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(ColumnDef::new(Vendors::NameAr).string().null())
                    .col(ColumnDef::new(Vendors::Code).string().null())
                    .col(ColumnDef::new(Vendors::ContactName).string().null())
                    .col(ColumnDef::new(Vendors::Email).string().null())
                    .col(ColumnDef::new(Vendors::Phone).string().null())
                    .col(ColumnDef::new(Vendors::Country).string().null())
                    .col(ColumnDef::new(Vendors::TaxNumber).string().null())
                    .col(
                        ColumnDef::new(Vendors::PaymentTerms)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(Vendors::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Vendors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vendors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
    BusinessId,
    BranchId,
    Name,
    NameAr,
    Code,
    ContactName,
    Email,
    Phone,
    Country,
    TaxNumber,
    PaymentTerms,
    Status,
    CreatedAt,
    UpdatedAt,
}
