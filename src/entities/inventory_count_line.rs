use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_count_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub count_id: Uuid,
    pub item_id: Uuid,
    /// Ledger quantity at sheet generation.
    pub expected_quantity: Decimal,
    pub counted_quantity: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// counted - expected; None until the line is recorded.
    pub fn variance(&self) -> Option<Decimal> {
        self.counted_quantity.map(|c| c - self.expected_quantity)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_count::Entity",
        from = "Column::CountId",
        to = "super::inventory_count::Column::Id"
    )]
    Count,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::inventory_count::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Count.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
