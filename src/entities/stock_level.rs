use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health classification of a stock row against its thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockHealth {
    Out,
    Low,
    Healthy,
    Overstocked,
}

/// Per (item, branch) quantity with optional min/max thresholds.
/// Unique on (item_id, branch_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub branch_id: Uuid,
    pub quantity: Decimal,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn health(&self) -> StockHealth {
        if self.quantity <= Decimal::ZERO {
            return StockHealth::Out;
        }
        if let Some(min) = self.min_quantity {
            if self.quantity < min {
                return StockHealth::Low;
            }
        }
        if let Some(max) = self.max_quantity {
            if self.quantity > max {
                return StockHealth::Overstocked;
            }
        }
        StockHealth::Healthy
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(qty: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> Model {
        Model {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            quantity: qty,
            min_quantity: min,
            max_quantity: max,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(level(dec!(0), None, None).health(), StockHealth::Out);
        assert_eq!(
            level(dec!(2), Some(dec!(5)), None).health(),
            StockHealth::Low
        );
        assert_eq!(
            level(dec!(7), Some(dec!(5)), Some(dec!(20))).health(),
            StockHealth::Healthy
        );
        assert_eq!(
            level(dec!(25), Some(dec!(5)), Some(dec!(20))).health(),
            StockHealth::Overstocked
        );
        // No thresholds set: anything positive is healthy
        assert_eq!(level(dec!(1), None, None).health(), StockHealth::Healthy);
    }
}
