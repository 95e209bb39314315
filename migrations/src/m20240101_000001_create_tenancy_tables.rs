use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Businesses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Businesses::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Businesses::Name).string().not_null())
                    .col(
                        ColumnDef::new(Businesses::MaxUsers)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(Businesses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Businesses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Branches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Branches::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Branches::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(Branches::Name).string().not_null())
                    .col(
                        ColumnDef::new(Branches::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Branches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Branches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_branches_business")
                            .from(Branches::Table, Branches::BusinessId)
                            .to(Businesses::Table, Businesses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BusinessUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BusinessUsers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BusinessUsers::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(BusinessUsers::Username).string().not_null())
                    .col(
                        ColumnDef::new(BusinessUsers::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BusinessUsers::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(BusinessUsers::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(BusinessUsers::DisplayName).string().null())
                    .col(ColumnDef::new(BusinessUsers::Email).string().null())
                    .col(ColumnDef::new(BusinessUsers::Phone).string().null())
                    .col(
                        ColumnDef::new(BusinessUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BusinessUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_business_users_business")
                            .from(BusinessUsers::Table, BusinessUsers::BusinessId)
                            .to(Businesses::Table, Businesses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_business_users_username")
                    .table(BusinessUsers::Table)
                    .col(BusinessUsers::BusinessId)
                    .col(BusinessUsers::Username)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BusinessUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Branches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Businesses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Businesses {
    Table,
    Id,
    Name,
    MaxUsers,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Branches {
    Table,
    Id,
    BusinessId,
    Name,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BusinessUsers {
    Table,
    Id,
    BusinessId,
    Username,
    PasswordHash,
    Role,
    Status,
    DisplayName,
    Email,
    Phone,
    CreatedAt,
    UpdatedAt,
}
