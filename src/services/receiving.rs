use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::TenantContext,
    db::DbPool,
    entities::{
        item::{self, Entity as Item},
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_line::{self, Entity as PurchaseOrderLine, VarianceReason},
        stock_transaction::TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::purchase_orders::{append_activity, PurchaseOrderService};
use super::stock::{post_ledger_entry, unwrap_txn_err, LedgerEntry};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiptLineInput {
    pub line_id: Uuid,
    /// Defaults on the client to the ordered quantity; authoritative here.
    pub received_quantity: Decimal,
    /// Total cost for the line, from the invoice. Unit cost is derived.
    pub total_cost: Decimal,
    /// Required when under-receiving.
    pub variance_reason: Option<VarianceReason>,
    /// Required (non-empty) when over-receiving.
    pub variance_note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderCommand {
    /// Uploaded invoice image reference. Mandatory.
    #[validate(length(min = 1, message = "invoice_image is required"))]
    pub invoice_image: String,
    #[validate(length(min = 1, message = "at least one line must be received"))]
    pub lines: Vec<ReceiptLineInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptLineResult {
    pub line_id: Uuid,
    pub item_id: Uuid,
    pub received_quantity: Decimal,
    /// `total_cost / received_quantity`, computed server-side.
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptResult {
    pub purchase_order_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub lines: Vec<ReceiptLineResult>,
}

/// The receiving engine: reconciles ordered vs received quantities,
/// validates variance justifications, derives authoritative unit costs
/// from the invoice, posts stock, and settles the order totals.
#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    purchase_orders: PurchaseOrderService,
}

impl ReceivingService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        purchase_orders: PurchaseOrderService,
    ) -> Self {
        Self {
            db,
            event_sender,
            purchase_orders,
        }
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn receive(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        command: ReceivePurchaseOrderCommand,
    ) -> Result<ReceiptResult, ServiceError> {
        command.validate()?;

        let order = self.purchase_orders.find_owned(ctx, order_id).await?;
        if !order.status.is_receivable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Purchase order in status {} cannot be received",
                order.status
            )));
        }

        let all_lines = PurchaseOrderLine::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(order.id))
            .all(self.db.as_ref())
            .await?;
        let lines_by_id: HashMap<Uuid, purchase_order_line::Model> =
            all_lines.iter().cloned().map(|l| (l.id, l)).collect();

        // Validate every line before any mutation so a bad line rejects
        // the whole receipt.
        for input in &command.lines {
            let line = lines_by_id.get(&input.line_id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Line {} does not belong to purchase order {}",
                    input.line_id, order.id
                ))
            })?;
            if line.is_received() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Line {} has already been received",
                    line.id
                )));
            }
            if input.received_quantity < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "received_quantity must not be negative".into(),
                ));
            }
            if input.total_cost <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "total_cost must be positive for every received line".into(),
                ));
            }
            if input.received_quantity < line.quantity && input.variance_reason.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "line {} under-received: variance_reason is required",
                    line.id
                )));
            }
            if input.received_quantity > line.quantity
                && input
                    .variance_note
                    .as_deref()
                    .map_or(true, |n| n.trim().is_empty())
            {
                return Err(ServiceError::ValidationError(format!(
                    "line {} over-received: variance_note is required",
                    line.id
                )));
            }
        }

        let order_model = order.clone();
        let inputs = command.lines;
        let invoice_image = command.invoice_image.clone();
        let notes = command.notes.clone();
        let branch_id = ctx.branch_id;
        let user_id = ctx.user_id;

        let result = self
            .db
            .transaction::<_, ReceiptResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut line_results = Vec::with_capacity(inputs.len());

                    for input in &inputs {
                        let line = lines_by_id
                            .get(&input.line_id)
                            .cloned()
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Line {} not found", input.line_id))
                            })?;

                        // Authoritative unit cost from the invoice total;
                        // the client-side preview is advisory only.
                        let unit_cost = if input.received_quantity > Decimal::ZERO {
                            input.total_cost / input.received_quantity
                        } else {
                            Decimal::ZERO
                        };

                        let item_id = line.item_id;
                        let mut active: purchase_order_line::ActiveModel = line.into();
                        active.received_quantity = Set(Some(input.received_quantity));
                        active.unit_cost = Set(Some(unit_cost));
                        active.total_cost = Set(Some(input.total_cost));
                        active.variance_reason = Set(input.variance_reason);
                        active.variance_note = Set(input.variance_note.clone());
                        active.updated_at = Set(Utc::now());
                        active.update(txn).await?;

                        if input.received_quantity > Decimal::ZERO {
                            post_ledger_entry(
                                txn,
                                LedgerEntry::new(
                                    item_id,
                                    branch_id,
                                    TransactionType::PoReceive,
                                    input.received_quantity,
                                    user_id,
                                )
                                .with_reference(order_model.id, "purchase_order"),
                            )
                            .await?;

                            // Last-receipt costing: the item's unit cost
                            // tracks the latest invoice.
                            if let Some(item) = Item::find_by_id(item_id).one(txn).await? {
                                let mut item_active: item::ActiveModel = item.into();
                                item_active.cost_per_unit = Set(unit_cost);
                                item_active.updated_at = Set(Utc::now());
                                item_active.update(txn).await?;
                            }
                        }

                        line_results.push(ReceiptLineResult {
                            line_id: input.line_id,
                            item_id,
                            received_quantity: input.received_quantity,
                            unit_cost,
                            total_cost: input.total_cost,
                        });
                    }

                    // Settle header totals from the lines as they now stand.
                    let lines_after = PurchaseOrderLine::find()
                        .filter(
                            purchase_order_line::Column::PurchaseOrderId.eq(order_model.id),
                        )
                        .all(txn)
                        .await?;
                    let subtotal: Decimal = lines_after
                        .iter()
                        .filter_map(|l| l.total_cost)
                        .sum();
                    let fully_received = lines_after.iter().all(|l| l.is_received());
                    let new_status = if fully_received {
                        PurchaseOrderStatus::Received
                    } else {
                        PurchaseOrderStatus::Partial
                    };
                    let old_status = order_model.status;
                    let tax_amount = order_model.tax_amount;
                    let total_amount = subtotal + tax_amount;
                    let order_id = order_model.id;

                    let mut active: purchase_order::ActiveModel = order_model.into();
                    active.status = Set(new_status);
                    active.subtotal = Set(subtotal);
                    active.total_amount = Set(total_amount);
                    active.invoice_image = Set(Some(invoice_image));
                    active.updated_at = Set(Utc::now());
                    active.update(txn).await?;

                    let changes = serde_json::to_string(
                        &line_results
                            .iter()
                            .map(|r| {
                                serde_json::json!({
                                    "line_id": r.line_id,
                                    "received_quantity": r.received_quantity,
                                    "total_cost": r.total_cost,
                                })
                            })
                            .collect::<Vec<_>>(),
                    )
                    .ok();
                    append_activity(
                        txn,
                        order_id,
                        user_id,
                        "received",
                        Some(&old_status.to_string()),
                        Some(&new_status.to_string()),
                        notes,
                        changes,
                    )
                    .await?;

                    Ok(ReceiptResult {
                        purchase_order_id: order_id,
                        status: new_status,
                        subtotal,
                        tax_amount,
                        total_amount,
                        lines: line_results,
                    })
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        crate::metrics::PO_RECEIPTS.inc();
        info!(
            purchase_order_id = %result.purchase_order_id,
            status = %result.status,
            subtotal = %result.subtotal,
            "Purchase order receipt posted"
        );
        self.event_sender
            .publish(Event::PurchaseOrderReceived {
                purchase_order_id: result.purchase_order_id,
                branch_id: ctx.branch_id,
                fully_received: result.status == PurchaseOrderStatus::Received,
            })
            .await;

        Ok(result)
    }
}
