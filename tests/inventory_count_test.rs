mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use silo_api::{
    entities::inventory_count::{CountStatus, CountType},
    entities::stock_transaction::TransactionType,
    errors::ServiceError,
    services::counts::{CreateCountCommand, RecordCountLineInput},
    services::stock::{AdjustDirection, AdjustStockCommand},
};

use common::{create_item, seed_stock, setup, stock_quantity};

#[tokio::test]
async fn full_count_lifecycle_posts_adjustments() {
    let app = setup("count_lifecycle").await;
    let ctx = app.ctx();
    let rice = create_item(app.db.as_ref(), app.business_id, "Rice", "RIC-02").await;
    let beans = create_item(app.db.as_ref(), app.business_id, "Beans", "BEA-02").await;
    seed_stock(app.db.as_ref(), rice.id, app.main_branch, dec!(40)).await;
    seed_stock(app.db.as_ref(), beans.id, app.main_branch, dec!(12)).await;

    let count = app
        .services
        .counts
        .create(
            &ctx,
            CreateCountCommand {
                count_type: CountType::Full,
                count_date: None,
                item_ids: None,
                notes: None,
            },
        )
        .await
        .expect("count creation should succeed");

    assert_eq!(count.count.status, CountStatus::Draft);
    assert!(count.count.count_number.starts_with("IC-"));
    assert_eq!(count.lines.len(), 2);
    let rice_line = count.lines.iter().find(|l| l.line.item_id == rice.id).unwrap();
    assert_eq!(rice_line.line.expected_quantity, dec!(40));

    // Recording moves the session to in_progress
    let recorded = app
        .services
        .counts
        .record_lines(
            &ctx,
            count.count.id,
            count
                .lines
                .iter()
                .map(|l| RecordCountLineInput {
                    line_id: l.line.id,
                    counted_quantity: if l.line.item_id == rice.id {
                        dec!(37)
                    } else {
                        dec!(12)
                    },
                })
                .collect(),
        )
        .await
        .expect("recording should succeed");
    assert_eq!(recorded.count.status, CountStatus::InProgress);
    let rice_line = recorded
        .lines
        .iter()
        .find(|l| l.line.item_id == rice.id)
        .unwrap();
    assert_eq!(rice_line.variance, Some(dec!(-3)));

    let completed = app
        .services
        .counts
        .complete(&ctx, count.count.id)
        .await
        .expect("completion should succeed");
    assert_eq!(completed.count.status, CountStatus::Completed);

    // The counted value is now the ledger truth
    assert_eq!(
        stock_quantity(app.db.as_ref(), rice.id, app.main_branch).await,
        dec!(37)
    );
    assert_eq!(
        stock_quantity(app.db.as_ref(), beans.id, app.main_branch).await,
        dec!(12)
    );

    // Exactly one adjustment row (beans had no variance), invariant held
    let (rows, _) = app
        .services
        .timeline
        .item_timeline(&ctx, rice.id, 1, 10)
        .await
        .unwrap();
    let adjustment = &rows[0].transaction;
    assert_eq!(
        adjustment.transaction_type,
        TransactionType::InventoryCountAdjustment
    );
    assert_eq!(adjustment.quantity, dec!(3));
    assert_eq!(
        adjustment.quantity_after,
        adjustment.quantity_before - adjustment.quantity
    );
    let (bean_rows, _) = app
        .services
        .timeline
        .item_timeline(&ctx, beans.id, 1, 10)
        .await
        .unwrap();
    assert!(bean_rows
        .iter()
        .all(|r| r.transaction.transaction_type != TransactionType::InventoryCountAdjustment));
}

#[tokio::test]
async fn completion_adjusts_against_live_quantity_not_the_snapshot() {
    let app = setup("count_live_delta").await;
    let ctx = app.ctx();
    let oats = create_item(app.db.as_ref(), app.business_id, "Oats", "OAT-01").await;
    seed_stock(app.db.as_ref(), oats.id, app.main_branch, dec!(10)).await;

    let count = app
        .services
        .counts
        .create(
            &ctx,
            CreateCountCommand {
                count_type: CountType::Partial,
                count_date: None,
                item_ids: Some(vec![oats.id]),
                notes: None,
            },
        )
        .await
        .unwrap();

    app.services
        .counts
        .record_lines(
            &ctx,
            count.count.id,
            vec![RecordCountLineInput {
                line_id: count.lines[0].line.id,
                counted_quantity: dec!(9),
            }],
        )
        .await
        .unwrap();

    // Stock moves between the snapshot and completion
    app.services
        .stock
        .adjust(
            &ctx,
            oats.id,
            AdjustStockCommand {
                direction: AdjustDirection::Addition,
                quantity: dec!(5),
                deduction_reason: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    app.services.counts.complete(&ctx, count.count.id).await.unwrap();

    // The counted value wins over the moved stock
    assert_eq!(
        stock_quantity(app.db.as_ref(), oats.id, app.main_branch).await,
        dec!(9)
    );
}

#[tokio::test]
async fn completion_requires_every_line_counted() {
    let app = setup("count_uncounted").await;
    let ctx = app.ctx();
    let a = create_item(app.db.as_ref(), app.business_id, "A", "A-01").await;
    let b = create_item(app.db.as_ref(), app.business_id, "B", "B-01").await;
    seed_stock(app.db.as_ref(), a.id, app.main_branch, dec!(1)).await;
    seed_stock(app.db.as_ref(), b.id, app.main_branch, dec!(1)).await;

    let count = app
        .services
        .counts
        .create(
            &ctx,
            CreateCountCommand {
                count_type: CountType::Partial,
                count_date: None,
                item_ids: Some(vec![a.id, b.id]),
                notes: None,
            },
        )
        .await
        .unwrap();

    app.services
        .counts
        .record_lines(
            &ctx,
            count.count.id,
            vec![RecordCountLineInput {
                line_id: count.lines[0].line.id,
                counted_quantity: dec!(1),
            }],
        )
        .await
        .unwrap();

    let err = app
        .services
        .counts
        .complete(&ctx, count.count.id)
        .await
        .expect_err("uncounted lines must block completion");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn cancelled_counts_are_terminal() {
    let app = setup("count_cancel").await;
    let ctx = app.ctx();
    let a = create_item(app.db.as_ref(), app.business_id, "C", "C-01").await;
    seed_stock(app.db.as_ref(), a.id, app.main_branch, dec!(1)).await;

    let count = app
        .services
        .counts
        .create(
            &ctx,
            CreateCountCommand {
                count_type: CountType::Partial,
                count_date: None,
                item_ids: Some(vec![a.id]),
                notes: None,
            },
        )
        .await
        .unwrap();

    let cancelled = app.services.counts.cancel(&ctx, count.count.id).await.unwrap();
    assert_eq!(cancelled.count.status, CountStatus::Cancelled);

    let err = app
        .services
        .counts
        .complete(&ctx, count.count.id)
        .await
        .expect_err("cancelled counts cannot complete");
    assert_matches!(err, ServiceError::InvalidStatus(_));
}
