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
pub enum ItemStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Catalog item. Raw items and composite (recipe) items share this table;
/// composites additionally carry a batch yield and a component list.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub name_ar: Option<String>,
    pub category: Option<String>,
    pub item_type: Option<String>,
    pub unit: String,
    pub storage_unit: Option<String>,
    pub sku: String,
    /// Latest receipt cost per unit; updated by the receiving engine.
    pub cost_per_unit: Decimal,
    pub default_price: Decimal,
    /// Business-specific override; shadows `default_price` when set.
    pub business_price: Option<Decimal>,
    pub is_composite: bool,
    /// Yield per production run (composites only).
    pub batch_quantity: Option<Decimal>,
    pub batch_unit: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// The price the server serializes on every item payload; never stored.
    pub fn effective_price(&self) -> Decimal {
        self.business_price.unwrap_or(self.default_price)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::business::Entity",
        from = "Column::BusinessId",
        to = "super::business::Column::Id"
    )]
    Business,
    #[sea_orm(has_many = "super::stock_level::Entity")]
    StockLevels,
    #[sea_orm(has_many = "super::purchase_order_line::Entity")]
    PurchaseOrderLines,
}

impl Related<super::business::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Business.def()
    }
}

impl Related<super::stock_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockLevels.def()
    }
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(business_price: Option<Decimal>) -> Model {
        Model {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Tomato".into(),
            name_ar: None,
            category: Some("Produce".into()),
            item_type: None,
            unit: "kg".into(),
            storage_unit: None,
            sku: "TOM-001".into(),
            cost_per_unit: dec!(2.50),
            default_price: dec!(4.00),
            business_price,
            is_composite: false,
            batch_quantity: None,
            batch_unit: None,
            status: ItemStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_prefers_business_override() {
        assert_eq!(item(Some(dec!(3.25))).effective_price(), dec!(3.25));
        assert_eq!(item(None).effective_price(), dec!(4.00));
    }
}
