mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use silo_api::{
    entities::{
        item::Entity as Item,
        purchase_order::PurchaseOrderStatus,
        stock_transaction::TransactionType,
    },
    errors::ServiceError,
    services::purchase_orders::{
        CreatePurchaseOrderCommand, PurchaseOrderLineInput, UpdateStatusCommand,
    },
    services::receiving::{ReceiptLineInput, ReceivePurchaseOrderCommand},
};

use common::{create_item, create_vendor, setup, stock_quantity};

async fn create_po(
    app: &common::TestApp,
    vendor_id: uuid::Uuid,
    lines: Vec<PurchaseOrderLineInput>,
) -> silo_api::services::purchase_orders::PurchaseOrderView {
    app.services
        .purchase_orders
        .create(
            &app.ctx(),
            CreatePurchaseOrderCommand {
                vendor_id,
                expected_date: None,
                lines,
                notes: None,
            },
        )
        .await
        .expect("PO creation should succeed")
}

/// Creates a PO and submits it so it is receivable.
async fn create_pending_po(
    app: &common::TestApp,
    vendor_id: uuid::Uuid,
    lines: Vec<PurchaseOrderLineInput>,
) -> silo_api::services::purchase_orders::PurchaseOrderView {
    let po = create_po(app, vendor_id, lines).await;
    app.services
        .purchase_orders
        .update_status(
            &app.ctx(),
            po.order.id,
            UpdateStatusCommand {
                status: PurchaseOrderStatus::Pending,
                notes: None,
            },
        )
        .await
        .expect("draft -> pending");
    po
}

#[tokio::test]
async fn receiving_updates_cost_stock_and_status() {
    let app = setup("po_receive_full").await;
    let ctx = app.ctx();
    let vendor = create_vendor(app.db.as_ref(), app.business_id, "Fresh Farms").await;
    let item = create_item(app.db.as_ref(), app.business_id, "Tomatoes", "TOM-01").await;

    let po = create_po(
        &app,
        vendor.id,
        vec![PurchaseOrderLineInput {
            item_id: item.id,
            quantity: dec!(10),
        }],
    )
    .await;
    assert_eq!(po.order.status, PurchaseOrderStatus::Draft);
    assert!(po.order.order_number.starts_with("PO-"));

    // Walk the state machine to a receivable status
    app.services
        .purchase_orders
        .update_status(
            &ctx,
            po.order.id,
            UpdateStatusCommand {
                status: PurchaseOrderStatus::Pending,
                notes: None,
            },
        )
        .await
        .expect("draft -> pending");

    // Receive 8 of 10 at a total invoice cost of 80.00 with reason missing
    let result = app
        .services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            ReceivePurchaseOrderCommand {
                invoice_image: "invoices/inv-001.jpg".into(),
                lines: vec![ReceiptLineInput {
                    line_id: po.lines[0].line.id,
                    received_quantity: dec!(8),
                    total_cost: dec!(80.00),
                    variance_reason: Some(
                        silo_api::entities::purchase_order_line::VarianceReason::Missing,
                    ),
                    variance_note: None,
                }],
                notes: None,
            },
        )
        .await
        .expect("receipt should post");

    // Unit cost derived server-side: 80.00 / 8 = 10.00
    assert_eq!(result.lines[0].unit_cost, dec!(10.00));
    assert_eq!(result.status, PurchaseOrderStatus::Received);
    assert_eq!(result.subtotal, dec!(80.00));
    assert_eq!(result.total_amount, result.subtotal + result.tax_amount);

    // Item cost tracks the latest receipt
    let item_after = Item::find_by_id(item.id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item_after.cost_per_unit, dec!(10.00));

    // Stock increased by the received quantity
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(8)
    );

    // The ledger row satisfies the before/after invariant
    let timeline = app
        .services
        .timeline
        .item_timeline(&ctx, item.id, 1, 10)
        .await
        .expect("timeline should list");
    let row = &timeline.0[0].transaction;
    assert_eq!(row.transaction_type, TransactionType::PoReceive);
    assert_eq!(row.quantity_after, row.quantity_before + row.quantity);
}

#[tokio::test]
async fn under_receipt_requires_variance_reason() {
    let app = setup("po_under_receipt").await;
    let ctx = app.ctx();
    let vendor = create_vendor(app.db.as_ref(), app.business_id, "Fresh Farms").await;
    let item = create_item(app.db.as_ref(), app.business_id, "Onions", "ONI-01").await;

    let po = create_pending_po(
        &app,
        vendor.id,
        vec![PurchaseOrderLineInput {
            item_id: item.id,
            quantity: dec!(10),
        }],
    )
    .await;

    let err = app
        .services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            ReceivePurchaseOrderCommand {
                invoice_image: "invoices/inv-002.jpg".into(),
                lines: vec![ReceiptLineInput {
                    line_id: po.lines[0].line.id,
                    received_quantity: dec!(7),
                    total_cost: dec!(70.00),
                    variance_reason: None,
                    variance_note: None,
                }],
                notes: None,
            },
        )
        .await
        .expect_err("under-receipt without a reason must be rejected");

    assert_matches!(err, ServiceError::ValidationError(_));
    // Nothing was posted
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(0)
    );
}

#[tokio::test]
async fn over_receipt_requires_variance_note() {
    let app = setup("po_over_receipt").await;
    let ctx = app.ctx();
    let vendor = create_vendor(app.db.as_ref(), app.business_id, "Fresh Farms").await;
    let item = create_item(app.db.as_ref(), app.business_id, "Garlic", "GAR-01").await;

    let po = create_pending_po(
        &app,
        vendor.id,
        vec![PurchaseOrderLineInput {
            item_id: item.id,
            quantity: dec!(5),
        }],
    )
    .await;

    let base_line = |note: Option<String>| ReceivePurchaseOrderCommand {
        invoice_image: "invoices/inv-003.jpg".into(),
        lines: vec![ReceiptLineInput {
            line_id: po.lines[0].line.id,
            received_quantity: dec!(6),
            total_cost: dec!(66.00),
            variance_reason: None,
            variance_note: note,
        }],
        notes: None,
    };

    let err = app
        .services
        .receiving
        .receive(&ctx, po.order.id, base_line(Some("   ".into())))
        .await
        .expect_err("blank note must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    app.services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            base_line(Some("supplier shipped an extra box".into())),
        )
        .await
        .expect("over-receipt with a note should post");

    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(6)
    );
}

#[tokio::test]
async fn partial_receipts_settle_per_line_and_totals_add_up() {
    let app = setup("po_partial").await;
    let ctx = app.ctx();
    let vendor = create_vendor(app.db.as_ref(), app.business_id, "Dry Goods Co").await;
    let rice = create_item(app.db.as_ref(), app.business_id, "Rice", "RIC-01").await;
    let beans = create_item(app.db.as_ref(), app.business_id, "Beans", "BEA-01").await;

    let po = create_pending_po(
        &app,
        vendor.id,
        vec![
            PurchaseOrderLineInput {
                item_id: rice.id,
                quantity: dec!(20),
            },
            PurchaseOrderLineInput {
                item_id: beans.id,
                quantity: dec!(15),
            },
        ],
    )
    .await;
    let rice_line = po
        .lines
        .iter()
        .find(|l| l.line.item_id == rice.id)
        .unwrap()
        .line
        .id;
    let beans_line = po
        .lines
        .iter()
        .find(|l| l.line.item_id == beans.id)
        .unwrap()
        .line
        .id;

    // First delivery covers rice only
    let first = app
        .services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            ReceivePurchaseOrderCommand {
                invoice_image: "invoices/inv-010.jpg".into(),
                lines: vec![ReceiptLineInput {
                    line_id: rice_line,
                    received_quantity: dec!(20),
                    total_cost: dec!(50.00),
                    variance_reason: None,
                    variance_note: None,
                }],
                notes: None,
            },
        )
        .await
        .expect("first receipt");
    assert_eq!(first.status, PurchaseOrderStatus::Partial);

    // A received line cannot be received twice
    let err = app
        .services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            ReceivePurchaseOrderCommand {
                invoice_image: "invoices/inv-011.jpg".into(),
                lines: vec![ReceiptLineInput {
                    line_id: rice_line,
                    received_quantity: dec!(20),
                    total_cost: dec!(50.00),
                    variance_reason: None,
                    variance_note: None,
                }],
                notes: None,
            },
        )
        .await
        .expect_err("double receipt must be rejected");
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // Second delivery completes the order
    let second = app
        .services
        .receiving
        .receive(
            &ctx,
            po.order.id,
            ReceivePurchaseOrderCommand {
                invoice_image: "invoices/inv-012.jpg".into(),
                lines: vec![ReceiptLineInput {
                    line_id: beans_line,
                    received_quantity: dec!(15),
                    total_cost: dec!(30.00),
                    variance_reason: None,
                    variance_note: None,
                }],
                notes: None,
            },
        )
        .await
        .expect("second receipt");

    assert_eq!(second.status, PurchaseOrderStatus::Received);
    // subtotal == sum of line total costs across both receipts
    assert_eq!(second.subtotal, dec!(80.00));
    assert_eq!(second.total_amount, second.subtotal + second.tax_amount);
}

#[tokio::test]
async fn status_machine_rejects_illegal_transitions() {
    let app = setup("po_status_machine").await;
    let ctx = app.ctx();
    let vendor = create_vendor(app.db.as_ref(), app.business_id, "Fresh Farms").await;
    let item = create_item(app.db.as_ref(), app.business_id, "Salt", "SAL-01").await;

    let po = create_po(
        &app,
        vendor.id,
        vec![PurchaseOrderLineInput {
            item_id: item.id,
            quantity: dec!(1),
        }],
    )
    .await;

    // draft -> received is not a manual transition
    let err = app
        .services
        .purchase_orders
        .update_status(
            &ctx,
            po.order.id,
            UpdateStatusCommand {
                status: PurchaseOrderStatus::Received,
                notes: None,
            },
        )
        .await
        .expect_err("draft cannot jump to received");
    assert_matches!(err, ServiceError::InvalidStatus(_));

    // draft -> pending -> ordered -> cancelled is legal, and every step lands
    // in the activity log
    for status in [
        PurchaseOrderStatus::Pending,
        PurchaseOrderStatus::Ordered,
        PurchaseOrderStatus::Cancelled,
    ] {
        app.services
            .purchase_orders
            .update_status(
                &ctx,
                po.order.id,
                UpdateStatusCommand {
                    status,
                    notes: Some("stocktake".into()),
                },
            )
            .await
            .expect("legal transition");
    }

    let activity = app
        .services
        .purchase_orders
        .activity(&ctx, po.order.id)
        .await
        .expect("activity should list");
    // created + three transitions
    assert_eq!(activity.len(), 4);
    assert_eq!(activity[0].new_status.as_deref(), Some("cancelled"));
    assert_eq!(activity[0].action, "cancelled");
}

#[tokio::test]
async fn delivered_alias_is_accepted_on_input() {
    let payload = serde_json::json!({ "status": "delivered" });
    let command: UpdateStatusCommand = serde_json::from_value(payload).unwrap();
    assert_eq!(command.status, PurchaseOrderStatus::Received);
}
