use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use strum::{AsRefStr, EnumString};

/// Kinds of ledger rows. Each type is either an addition to or a
/// deduction from the branch quantity.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    #[sea_orm(string_value = "manual_addition")]
    ManualAddition,
    #[sea_orm(string_value = "manual_deduction")]
    ManualDeduction,
    #[sea_orm(string_value = "po_receive")]
    PoReceive,
    #[sea_orm(string_value = "order_sale")]
    OrderSale,
    #[sea_orm(string_value = "order_cancel_waste")]
    OrderCancelWaste,
    #[sea_orm(string_value = "order_cancel_return")]
    OrderCancelReturn,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "production_consume")]
    ProductionConsume,
    #[sea_orm(string_value = "production_yield")]
    ProductionYield,
    #[sea_orm(string_value = "inventory_count_adjustment")]
    InventoryCountAdjustment,
}

impl TransactionType {
    /// Whether rows of this type increase the branch quantity.
    pub fn is_addition(&self) -> bool {
        matches!(
            self,
            TransactionType::ManualAddition
                | TransactionType::PoReceive
                | TransactionType::OrderCancelReturn
                | TransactionType::TransferIn
                | TransactionType::ProductionYield
        )
    }
}

/// Reason codes attached to manual deductions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DeductionReason {
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "damaged")]
    Damaged,
    #[sea_orm(string_value = "spoiled")]
    Spoiled,
    #[sea_orm(string_value = "others")]
    Others,
}

/// Immutable ledger row. Invariant: `quantity_after == quantity_before +
/// quantity` for addition types and `quantity_before - quantity` for
/// deduction types; `quantity` is always positive.
///
/// `inventory_count_adjustment` rows carry the signed direction through
/// the same rule: the count service picks the type's direction by writing
/// the row against the live quantity it corrects.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub branch_id: Uuid,
    pub transaction_type: TransactionType,
    pub deduction_reason: Option<DeductionReason>,
    pub quantity: Decimal,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub user_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
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

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionType::*;

    #[test]
    fn direction_classification() {
        for t in [ManualAddition, PoReceive, OrderCancelReturn, TransferIn, ProductionYield] {
            assert!(t.is_addition(), "{:?} should be an addition", t);
        }
        for t in [
            ManualDeduction,
            OrderSale,
            OrderCancelWaste,
            TransferOut,
            ProductionConsume,
        ] {
            assert!(!t.is_addition(), "{:?} should be a deduction", t);
        }
    }
}
