mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use silo_api::{
    entities::production_run::ProductionStatus, errors::ServiceError,
    services::production::ProduceCommand,
};

use common::{
    add_component, create_composite_item, create_item, seed_stock, setup, stock_quantity,
};

#[tokio::test]
async fn production_consumes_components_and_credits_yield() {
    let app = setup("production_happy_path").await;
    let ctx = app.ctx();

    // One batch of 8 portions of hummus takes 2kg chickpeas + 0.5kg tahini
    let chickpeas = create_item(app.db.as_ref(), app.business_id, "Chickpeas", "CHI-01").await;
    let tahini = create_item(app.db.as_ref(), app.business_id, "Tahini", "TAH-01").await;
    let hummus =
        create_composite_item(app.db.as_ref(), app.business_id, "Hummus", "HUM-01", dec!(8)).await;
    add_component(app.db.as_ref(), hummus.id, chickpeas.id, dec!(2)).await;
    add_component(app.db.as_ref(), hummus.id, tahini.id, dec!(0.5)).await;

    seed_stock(app.db.as_ref(), chickpeas.id, app.main_branch, dec!(10)).await;
    seed_stock(app.db.as_ref(), tahini.id, app.main_branch, dec!(3)).await;

    let run = app
        .services
        .production
        .produce(
            &ctx,
            hummus.id,
            ProduceCommand {
                batch_count: 3,
                notes: None,
            },
        )
        .await
        .expect("production should succeed");

    assert_eq!(run.status, ProductionStatus::Completed);
    assert_eq!(run.total_yield, dec!(24));
    assert_eq!(run.yield_unit, "portion");

    // Components consumed: 3 batches x (2, 0.5)
    assert_eq!(
        stock_quantity(app.db.as_ref(), chickpeas.id, app.main_branch).await,
        dec!(4)
    );
    assert_eq!(
        stock_quantity(app.db.as_ref(), tahini.id, app.main_branch).await,
        dec!(1.5)
    );
    // Yield credited
    assert_eq!(
        stock_quantity(app.db.as_ref(), hummus.id, app.main_branch).await,
        dec!(24)
    );

    let stats = app.services.production.stats(&ctx).await.expect("stats");
    assert_eq!(stats.today_runs, 1);
    assert_eq!(stats.today_batches, 3);
    assert_eq!(stats.week_batches, 3);
}

#[tokio::test]
async fn production_lists_every_shortfall() {
    let app = setup("production_shortfall").await;
    let ctx = app.ctx();

    let flour = create_item(app.db.as_ref(), app.business_id, "Flour", "FLO-02").await;
    let water = create_item(app.db.as_ref(), app.business_id, "Water", "WAT-01").await;
    let dough =
        create_composite_item(app.db.as_ref(), app.business_id, "Dough", "DOU-01", dec!(4)).await;
    add_component(app.db.as_ref(), dough.id, flour.id, dec!(5)).await;
    add_component(app.db.as_ref(), dough.id, water.id, dec!(3)).await;

    // Both components short
    seed_stock(app.db.as_ref(), flour.id, app.main_branch, dec!(2)).await;

    let err = app
        .services
        .production
        .produce(
            &ctx,
            dough.id,
            ProduceCommand {
                batch_count: 1,
                notes: None,
            },
        )
        .await
        .expect_err("insufficient components must be rejected");

    match err {
        ServiceError::InsufficientStock(msg) => {
            assert!(msg.contains(&flour.id.to_string()));
            assert!(msg.contains(&water.id.to_string()));
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // Nothing moved
    assert_eq!(
        stock_quantity(app.db.as_ref(), flour.id, app.main_branch).await,
        dec!(2)
    );
    assert_eq!(
        stock_quantity(app.db.as_ref(), dough.id, app.main_branch).await,
        dec!(0)
    );
}

#[tokio::test]
async fn producing_a_raw_item_is_rejected() {
    let app = setup("production_raw_item").await;
    let ctx = app.ctx();
    let salt = create_item(app.db.as_ref(), app.business_id, "Salt", "SAL-02").await;

    let err = app
        .services
        .production
        .produce(
            &ctx,
            salt.id,
            ProduceCommand {
                batch_count: 1,
                notes: None,
            },
        )
        .await
        .expect_err("raw items cannot be produced");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn composite_listing_expands_components_in_batch() {
    let app = setup("production_expand").await;
    let ctx = app.ctx();

    let flour = create_item(app.db.as_ref(), app.business_id, "Flour", "FLO-03").await;
    let pasta =
        create_composite_item(app.db.as_ref(), app.business_id, "Pasta", "PAS-01", dec!(6)).await;
    add_component(app.db.as_ref(), pasta.id, flour.id, dec!(1)).await;

    let (views, total) = app
        .services
        .catalog
        .list_composite_items(&ctx, true, 1, 20)
        .await
        .expect("composite listing should succeed");
    assert_eq!(total, 1);
    let components = views[0].components.as_ref().expect("expanded");
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].name, "Flour");

    // Without expansion the components stay unloaded
    let (views, _) = app
        .services
        .catalog
        .list_composite_items(&ctx, false, 1, 20)
        .await
        .unwrap();
    assert!(views[0].components.is_none());
}
