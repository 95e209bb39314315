mod common;

use assert_matches::assert_matches;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use silo_api::{
    entities::stock_level::{self, StockHealth},
    entities::stock_transaction::DeductionReason,
    errors::ServiceError,
    services::stock::{AdjustDirection, AdjustStockCommand, StockListQuery, UpdateLimitsCommand},
};

use common::{create_item, seed_stock, setup, stock_quantity};

#[tokio::test]
async fn manual_adjustments_post_ledger_rows() {
    let app = setup("stock_manual_adjust").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Lemons", "LEM-01").await;

    let add = app
        .services
        .stock
        .adjust(
            &ctx,
            item.id,
            AdjustStockCommand {
                direction: AdjustDirection::Addition,
                quantity: dec!(30),
                deduction_reason: None,
                notes: Some("opening stock".into()),
            },
        )
        .await
        .expect("addition should post");
    assert_eq!(add.quantity_before, dec!(0));
    assert_eq!(add.quantity_after, dec!(30));

    let deduct = app
        .services
        .stock
        .adjust(
            &ctx,
            item.id,
            AdjustStockCommand {
                direction: AdjustDirection::Deduction,
                quantity: dec!(5),
                deduction_reason: Some(DeductionReason::Spoiled),
                notes: None,
            },
        )
        .await
        .expect("deduction with reason should post");
    assert_eq!(deduct.quantity_after, dec!(25));
    assert_eq!(deduct.deduction_reason, Some(DeductionReason::Spoiled));

    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(25)
    );
}

#[tokio::test]
async fn deduction_requires_reason_and_cannot_go_negative() {
    let app = setup("stock_guard_rails").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Basil", "BAS-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(2)).await;

    let err = app
        .services
        .stock
        .adjust(
            &ctx,
            item.id,
            AdjustStockCommand {
                direction: AdjustDirection::Deduction,
                quantity: dec!(1),
                deduction_reason: None,
                notes: None,
            },
        )
        .await
        .expect_err("deduction without a reason must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .stock
        .adjust(
            &ctx,
            item.id,
            AdjustStockCommand {
                direction: AdjustDirection::Deduction,
                quantity: dec!(3),
                deduction_reason: Some(DeductionReason::Damaged),
                notes: None,
            },
        )
        .await
        .expect_err("stock must not go negative");
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(2)
    );
}

#[tokio::test]
async fn limits_validation_and_classification() {
    let app = setup("stock_limits").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Milk", "MIL-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(3)).await;

    // max <= min is rejected
    let err = app
        .services
        .stock
        .update_limits(
            &ctx,
            item.id,
            UpdateLimitsCommand {
                min_quantity: Some(dec!(10)),
                max_quantity: Some(dec!(10)),
            },
        )
        .await
        .expect_err("max must exceed min");
    assert_matches!(err, ServiceError::ValidationError(_));

    let level = app
        .services
        .stock
        .update_limits(
            &ctx,
            item.id,
            UpdateLimitsCommand {
                min_quantity: Some(dec!(5)),
                max_quantity: Some(dec!(50)),
            },
        )
        .await
        .expect("valid limits should save");
    assert_eq!(level.min_quantity, Some(dec!(5)));

    // 3 in stock with min 5 classifies as low and surfaces in the
    // low-stock filter and the stats block alike
    let (rows, _) = app
        .services
        .stock
        .list_stock(
            &ctx,
            &StockListQuery {
                search: None,
                low_stock: true,
                page: 1,
                limit: 20,
            },
        )
        .await
        .expect("list should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].health, StockHealth::Low);

    let stats = app.services.stock.stats(&ctx).await.expect("stats");
    assert_eq!(stats.low, 1);
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn timeline_stats_split_directions() {
    let app = setup("stock_timeline_stats").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Eggs", "EGG-01").await;

    for _ in 0..3 {
        app.services
            .stock
            .adjust(
                &ctx,
                item.id,
                AdjustStockCommand {
                    direction: AdjustDirection::Addition,
                    quantity: dec!(10),
                    deduction_reason: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
    }
    app.services
        .stock
        .adjust(
            &ctx,
            item.id,
            AdjustStockCommand {
                direction: AdjustDirection::Deduction,
                quantity: dec!(4),
                deduction_reason: Some(DeductionReason::Expired),
                notes: None,
            },
        )
        .await
        .unwrap();

    let stats = app.services.timeline.stats(&ctx).await.expect("stats");
    assert_eq!(stats.today_count, 4);
    assert_eq!(stats.week_additions, dec!(30));
    assert_eq!(stats.week_deductions, dec!(4));
}

// Pure-function property: classification is total and consistent with the
// threshold definitions for any combination of limits.
proptest! {
    #[test]
    fn health_classification_is_consistent(
        qty in -100i64..1000,
        min in proptest::option::of(0i64..500),
        max in proptest::option::of(0i64..500),
    ) {
        let level = stock_level::Model {
            id: uuid::Uuid::new_v4(),
            item_id: uuid::Uuid::new_v4(),
            branch_id: uuid::Uuid::new_v4(),
            quantity: Decimal::from(qty),
            min_quantity: min.map(Decimal::from),
            max_quantity: max.map(Decimal::from),
            updated_at: chrono::Utc::now(),
        };

        let health = level.health();
        if qty <= 0 {
            prop_assert_eq!(health, StockHealth::Out);
        } else if let Some(m) = min {
            if qty < m {
                prop_assert_eq!(health, StockHealth::Low);
            }
        }
        if qty > 0 && min.map_or(true, |m| qty >= m) {
            match max {
                Some(mx) if qty > mx => prop_assert_eq!(health, StockHealth::Overstocked),
                _ => prop_assert_eq!(health, StockHealth::Healthy),
            }
        }
    }
}
