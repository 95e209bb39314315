use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use std::fmt;

/// Purchase order lifecycle. `received` is the canonical terminal status;
/// the legacy spelling `delivered` is accepted on input and normalized.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "received")]
    #[serde(alias = "delivered")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Ordered => "ordered",
            PurchaseOrderStatus::Partial => "partial",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl PurchaseOrderStatus {
    /// Transitions permitted through the status endpoint. Receipt-driven
    /// moves (ordered/partial -> partial/received) go through the
    /// receiving engine instead.
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Cancelled)
                | (Pending, Approved)
                | (Pending, Ordered)
                | (Pending, Cancelled)
                | (Approved, Ordered)
                | (Approved, Cancelled)
                | (Ordered, Cancelled)
        )
    }

    /// Whether the order's details may still be edited.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Statuses from which a receipt may be posted.
    pub fn is_receivable(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Ordered | Self::Partial)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub business_id: Uuid,
    pub branch_id: Uuid,
    pub vendor_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub expected_date: Option<chrono::NaiveDate>,
    pub status: PurchaseOrderStatus,
    /// Sum of line total costs; zero until receiving writes invoice costs.
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    /// Invoice image reference captured at receiving; mandatory there.
    pub invoice_image: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id"
    )]
    Vendor,
    #[sea_orm(has_many = "super::purchase_order_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::po_activity::Entity")]
    Activity,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::po_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::PurchaseOrderStatus::*;

    #[test]
    fn terminal_statuses_reject_manual_transitions() {
        for status in [Partial, Received, Cancelled] {
            for next in [Draft, Pending, Approved, Ordered, Partial, Received, Cancelled] {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn draft_can_only_submit_or_cancel() {
        assert!(Draft.can_transition_to(Pending));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Ordered));
        assert!(!Draft.can_transition_to(Received));
    }

    #[test]
    fn delivered_alias_normalizes_to_received() {
        let status: super::PurchaseOrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, Received);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"received\"");
    }
}
