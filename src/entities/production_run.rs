use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// One execution of a composite item's recipe: consumes component stock,
/// credits the yield.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "production_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub composite_item_id: Uuid,
    pub business_id: Uuid,
    pub branch_id: Uuid,
    pub batch_count: i32,
    pub total_yield: Decimal,
    pub yield_unit: String,
    pub production_date: DateTime<Utc>,
    pub status: ProductionStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::CompositeItemId",
        to = "super::item::Column::Id"
    )]
    CompositeItem,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompositeItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
