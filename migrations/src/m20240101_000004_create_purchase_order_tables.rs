use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::BranchId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::VendorId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::OrderDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::ExpectedDate).date().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::Subtotal)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TaxAmount)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalAmount)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::InvoiceImage).string().null())
                    .col(ColumnDef::new(PurchaseOrders::Notes).string().null())
                    .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_vendor")
                            .from(PurchaseOrders::Table, PurchaseOrders::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::Quantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::UnitCost)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::TotalCost)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::ReceivedQuantity)
                            .decimal_len(18, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::VarianceReason)
                            .string_len(16)
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::VarianceNote).string().null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_po_lines_order")
                            .from(PurchaseOrderLines::Table, PurchaseOrderLines::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoActivities::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PoActivities::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoActivities::Action).string().not_null())
                    .col(ColumnDef::new(PoActivities::OldStatus).string_len(16).null())
                    .col(ColumnDef::new(PoActivities::NewStatus).string_len(16).null())
                    .col(ColumnDef::new(PoActivities::Notes).string().null())
                    .col(ColumnDef::new(PoActivities::Changes).text().null())
                    .col(ColumnDef::new(PoActivities::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(PoActivities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_po_activities_order")
                            .from(PoActivities::Table, PoActivities::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoTemplates::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoTemplates::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(PoTemplates::VendorId).uuid().not_null())
                    .col(ColumnDef::new(PoTemplates::Name).string().not_null())
                    .col(ColumnDef::new(PoTemplates::NameAr).string().null())
                    .col(ColumnDef::new(PoTemplates::Notes).string().null())
                    .col(ColumnDef::new(PoTemplates::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(PoTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PoTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_po_templates_vendor")
                            .from(PoTemplates::Table, PoTemplates::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoTemplateLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoTemplateLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoTemplateLines::TemplateId).uuid().not_null())
                    .col(ColumnDef::new(PoTemplateLines::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(PoTemplateLines::Quantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_po_template_lines_template")
                            .from(PoTemplateLines::Table, PoTemplateLines::TemplateId)
                            .to(PoTemplates::Table, PoTemplates::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PoTemplateLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoActivities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    OrderNumber,
    BusinessId,
    BranchId,
    VendorId,
    OrderDate,
    ExpectedDate,
    Status,
    Subtotal,
    TaxAmount,
    TotalAmount,
    InvoiceImage,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrderLines {
    Table,
    Id,
    PurchaseOrderId,
    ItemId,
    Quantity,
    UnitCost,
    TotalCost,
    ReceivedQuantity,
    VarianceReason,
    VarianceNote,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PoActivities {
    Table,
    Id,
    PurchaseOrderId,
    Action,
    OldStatus,
    NewStatus,
    Notes,
    Changes,
    UserId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PoTemplates {
    Table,
    Id,
    BusinessId,
    VendorId,
    Name,
    NameAr,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PoTemplateLines {
    Table,
    Id,
    TemplateId,
    ItemId,
    Quantity,
}
