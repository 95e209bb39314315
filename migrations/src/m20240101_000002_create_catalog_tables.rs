use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Items::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(ColumnDef::new(Items::NameAr).string().null())
                    .col(ColumnDef::new(Items::Category).string().null())
                    .col(ColumnDef::new(Items::ItemType).string().null())
                    .col(ColumnDef::new(Items::Unit).string().not_null())
                    .col(ColumnDef::new(Items::StorageUnit).string().null())
                    .col(ColumnDef::new(Items::Sku).string().not_null())
                    .col(
                        ColumnDef::new(Items::CostPerUnit)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Items::DefaultPrice)
                            .decimal_len(18, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Items::BusinessPrice).decimal_len(18, 4).null())
                    .col(
                        ColumnDef::new(Items::IsComposite)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Items::BatchQuantity).decimal_len(18, 4).null())
                    .col(ColumnDef::new(Items::BatchUnit).string().null())
                    .col(
                        ColumnDef::new(Items::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Items::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Items::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_items_sku")
                    .table(Items::Table)
                    .col(Items::BusinessId)
                    .col(Items::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemComponents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItemComponents::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ItemComponents::CompositeItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ItemComponents::ComponentItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ItemComponents::Quantity)
                            .decimal_len(18, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_components_composite")
                            .from(ItemComponents::Table, ItemComponents::CompositeItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_components_component")
                            .from(ItemComponents::Table, ItemComponents::ComponentItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_item_components_composite")
                    .table(ItemComponents::Table)
                    .col(ItemComponents::CompositeItemId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ItemComponents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    BusinessId,
    Name,
    NameAr,
    Category,
    ItemType,
    Unit,
    StorageUnit,
    Sku,
    CostPerUnit,
    DefaultPrice,
    BusinessPrice,
    IsComposite,
    BatchQuantity,
    BatchUnit,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ItemComponents {
    Table,
    Id,
    CompositeItemId,
    ComponentItemId,
    Quantity,
}
