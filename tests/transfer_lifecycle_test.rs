mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use silo_api::{
    entities::transfer::TransferStatus,
    errors::ServiceError,
    services::transfers::{CreateTransferCommand, TransferLineInput},
};

use common::{create_item, seed_stock, setup, stock_quantity};

#[tokio::test]
async fn transfer_moves_stock_between_branches() {
    let app = setup("transfer_happy_path").await;
    let sender = app.ctx();
    let receiver = app.ctx_second_branch();
    let item = create_item(app.db.as_ref(), app.business_id, "Flour", "FLO-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(50)).await;

    let transfer = app
        .services
        .transfers
        .create(
            &sender,
            CreateTransferCommand {
                to_business_id: None,
                to_branch_id: app.second_branch,
                transfer_date: None,
                lines: vec![TransferLineInput {
                    item_id: item.id,
                    quantity: dec!(20),
                }],
                notes: None,
            },
        )
        .await
        .expect("transfer creation should succeed");

    assert_eq!(transfer.transfer.status, TransferStatus::Pending);
    assert!(transfer.transfer.transfer_number.starts_with("TR-"));
    // Source deducted at creation; destination untouched while pending
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(30)
    );
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.second_branch).await,
        dec!(0)
    );

    // Action flags follow the acting branch
    let seen_by_sender = app
        .services
        .transfers
        .get(&sender, transfer.transfer.id)
        .await
        .unwrap();
    assert!(seen_by_sender.can_cancel && !seen_by_sender.can_receive);
    let seen_by_receiver = app
        .services
        .transfers
        .get(&receiver, transfer.transfer.id)
        .await
        .unwrap();
    assert!(seen_by_receiver.can_receive && !seen_by_receiver.can_cancel);

    let received = app
        .services
        .transfers
        .receive(&receiver, transfer.transfer.id)
        .await
        .expect("destination branch should receive");
    assert_eq!(received.transfer.status, TransferStatus::Received);
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.second_branch).await,
        dec!(20)
    );

    // Every ledger row honors the before/after invariant
    for ctx in [&sender, &receiver] {
        let (rows, _) = app
            .services
            .timeline
            .item_timeline(ctx, item.id, 1, 10)
            .await
            .unwrap();
        for row in rows {
            let t = row.transaction;
            if t.transaction_type.is_addition() {
                assert_eq!(t.quantity_after, t.quantity_before + t.quantity);
            } else {
                assert_eq!(t.quantity_after, t.quantity_before - t.quantity);
            }
        }
    }
}

#[tokio::test]
async fn same_branch_transfer_is_rejected() {
    let app = setup("transfer_same_branch").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Sugar", "SUG-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(10)).await;

    let err = app
        .services
        .transfers
        .create(
            &ctx,
            CreateTransferCommand {
                to_business_id: None,
                to_branch_id: app.main_branch,
                transfer_date: None,
                lines: vec![TransferLineInput {
                    item_id: item.id,
                    quantity: dec!(1),
                }],
                notes: None,
            },
        )
        .await
        .expect_err("same source and destination must be rejected");

    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn transfer_rejects_insufficient_stock() {
    let app = setup("transfer_insufficient").await;
    let ctx = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Yeast", "YEA-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(3)).await;

    let err = app
        .services
        .transfers
        .create(
            &ctx,
            CreateTransferCommand {
                to_business_id: None,
                to_branch_id: app.second_branch,
                transfer_date: None,
                lines: vec![TransferLineInput {
                    item_id: item.id,
                    quantity: dec!(5),
                }],
                notes: None,
            },
        )
        .await
        .expect_err("transfer beyond available stock must be rejected");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // The failed transaction left stock untouched
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(3)
    );
}

#[tokio::test]
async fn only_the_involved_branches_may_act() {
    let app = setup("transfer_scoping").await;
    let sender = app.ctx();
    let receiver = app.ctx_second_branch();
    let item = create_item(app.db.as_ref(), app.business_id, "Oil", "OIL-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(10)).await;

    let transfer = app
        .services
        .transfers
        .create(
            &sender,
            CreateTransferCommand {
                to_business_id: None,
                to_branch_id: app.second_branch,
                transfer_date: None,
                lines: vec![TransferLineInput {
                    item_id: item.id,
                    quantity: dec!(4),
                }],
                notes: None,
            },
        )
        .await
        .unwrap();

    // The sender cannot receive
    let err = app
        .services
        .transfers
        .receive(&sender, transfer.transfer.id)
        .await
        .expect_err("sender must not receive");
    assert_matches!(err, ServiceError::Forbidden(_));

    // The receiver cannot cancel
    let err = app
        .services
        .transfers
        .cancel(&receiver, transfer.transfer.id, None)
        .await
        .expect_err("receiver must not cancel");
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn cancel_restores_source_stock() {
    let app = setup("transfer_cancel").await;
    let sender = app.ctx();
    let item = create_item(app.db.as_ref(), app.business_id, "Butter", "BUT-01").await;
    seed_stock(app.db.as_ref(), item.id, app.main_branch, dec!(12)).await;

    let transfer = app
        .services
        .transfers
        .create(
            &sender,
            CreateTransferCommand {
                to_business_id: None,
                to_branch_id: app.second_branch,
                transfer_date: None,
                lines: vec![TransferLineInput {
                    item_id: item.id,
                    quantity: dec!(12),
                }],
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(0)
    );

    let cancelled = app
        .services
        .transfers
        .cancel(&sender, transfer.transfer.id, Some("wrong branch".into()))
        .await
        .expect("sender should cancel");
    assert_eq!(cancelled.transfer.status, TransferStatus::Cancelled);
    assert_eq!(
        stock_quantity(app.db.as_ref(), item.id, app.main_branch).await,
        dec!(12)
    );

    // Terminal: cannot receive a cancelled transfer
    let receiver = app.ctx_second_branch();
    let err = app
        .services
        .transfers
        .receive(&receiver, transfer.transfer.id)
        .await
        .expect_err("cancelled transfer is terminal");
    assert_matches!(err, ServiceError::InvalidStatus(_));
}
