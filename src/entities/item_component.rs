use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One ingredient of a composite item's recipe: `quantity` of the
/// component is consumed per single production batch.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "item_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub composite_item_id: Uuid,
    pub component_item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::CompositeItemId",
        to = "super::item::Column::Id"
    )]
    CompositeItem,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ComponentItemId",
        to = "super::item::Column::Id"
    )]
    ComponentItem,
}

impl ActiveModelBehavior for ActiveModel {}
