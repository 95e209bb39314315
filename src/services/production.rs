use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
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
        item::{self, Entity as Item, ItemStatus},
        item_component::{self, Entity as ItemComponent},
        production_run::{self, Entity as ProductionRun, ProductionStatus},
        stock_level::{self, Entity as StockLevel},
        stock_transaction::TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::stock::{post_ledger_entry, unwrap_txn_err, LedgerEntry};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProduceCommand {
    #[validate(range(min = 1, message = "batch_count must be at least 1"))]
    pub batch_count: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductionStats {
    pub today_runs: u64,
    pub today_batches: i64,
    pub week_runs: u64,
    pub week_batches: i64,
}

/// Executes composite recipes: consumes component stock, credits yield.
#[derive(Clone)]
pub struct ProductionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Runs `batch_count` batches of the composite item's recipe in one
    /// transaction. Every component must have sufficient stock at the
    /// acting branch; shortfalls are itemized in the error.
    #[instrument(skip(self, ctx, command))]
    pub async fn produce(
        &self,
        ctx: &TenantContext,
        composite_item_id: Uuid,
        command: ProduceCommand,
    ) -> Result<production_run::Model, ServiceError> {
        command.validate()?;

        let item = Item::find_by_id(composite_item_id)
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Item {} not found", composite_item_id))
            })?;

        if !item.is_composite {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is not a composite item",
                composite_item_id
            )));
        }
        if item.status != ItemStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Inactive items cannot be produced".into(),
            ));
        }
        let batch_quantity = item
            .batch_quantity
            .filter(|q| *q > Decimal::ZERO)
            .ok_or_else(|| {
                ServiceError::InvalidOperation(
                    "Composite item has no batch yield configured".into(),
                )
            })?;

        let components = ItemComponent::find()
            .filter(item_component::Column::CompositeItemId.eq(item.id))
            .all(self.db.as_ref())
            .await?;
        if components.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Composite item has no components".into(),
            ));
        }

        let batch_count = command.batch_count;
        let batches = Decimal::from(batch_count);
        let total_yield = batch_quantity * batches;
        let yield_unit = item
            .batch_unit
            .clone()
            .unwrap_or_else(|| item.unit.clone());

        // Pre-check availability so the caller gets every shortfall at
        // once instead of failing on the first deduction.
        let mut shortfalls = Vec::new();
        for component in &components {
            let needed = component.quantity * batches;
            let available = StockLevel::find()
                .filter(stock_level::Column::ItemId.eq(component.component_item_id))
                .filter(stock_level::Column::BranchId.eq(ctx.branch_id))
                .one(self.db.as_ref())
                .await?
                .map(|l| l.quantity)
                .unwrap_or(Decimal::ZERO);
            if available < needed {
                shortfalls.push(format!(
                    "component {} needs {} but only {} in stock",
                    component.component_item_id, needed, available
                ));
            }
        }
        if !shortfalls.is_empty() {
            return Err(ServiceError::InsufficientStock(shortfalls.join("; ")));
        }

        let run_id = Uuid::new_v4();
        let branch_id = ctx.branch_id;
        let business_id = ctx.business_id;
        let user_id = ctx.user_id;
        let item_id = item.id;
        let notes = command.notes.clone();

        let run = self
            .db
            .transaction::<_, production_run::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    for component in &components {
                        let needed = component.quantity * batches;
                        post_ledger_entry(
                            txn,
                            LedgerEntry::new(
                                component.component_item_id,
                                branch_id,
                                TransactionType::ProductionConsume,
                                needed,
                                user_id,
                            )
                            .with_reference(run_id, "production_run"),
                        )
                        .await?;
                    }

                    post_ledger_entry(
                        txn,
                        LedgerEntry::new(
                            item_id,
                            branch_id,
                            TransactionType::ProductionYield,
                            total_yield,
                            user_id,
                        )
                        .with_reference(run_id, "production_run"),
                    )
                    .await?;

                    let run = production_run::ActiveModel {
                        id: Set(run_id),
                        composite_item_id: Set(item_id),
                        business_id: Set(business_id),
                        branch_id: Set(branch_id),
                        batch_count: Set(batch_count),
                        total_yield: Set(total_yield),
                        yield_unit: Set(yield_unit),
                        production_date: Set(Utc::now()),
                        status: Set(ProductionStatus::Completed),
                        notes: Set(notes),
                        created_by: Set(user_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await?;

                    Ok(run)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        crate::metrics::PRODUCTION_RUNS.inc();
        info!(
            production_id = %run.id,
            composite_item_id = %run.composite_item_id,
            batch_count = run.batch_count,
            "Production run completed"
        );
        self.event_sender
            .publish(Event::ProductionCompleted {
                production_id: run.id,
                composite_item_id: run.composite_item_id,
                branch_id: run.branch_id,
                batch_count: run.batch_count,
            })
            .await;

        Ok(run)
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_runs(
        &self,
        ctx: &TenantContext,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<production_run::Model>, u64), ServiceError> {
        let paginator = ProductionRun::find()
            .filter(production_run::Column::BranchId.eq(ctx.branch_id))
            .order_by_desc(production_run::Column::ProductionDate)
            .paginate(self.db.as_ref(), limit.max(1));
        let total = paginator.num_items().await?;
        let runs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((runs, total))
    }

    /// Today/this-week batch counts, aggregated server-side.
    #[instrument(skip(self, ctx))]
    pub async fn stats(&self, ctx: &TenantContext) -> Result<ProductionStats, ServiceError> {
        let now = Utc::now();
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let week_start = today_start - Duration::days(6);

        let week_runs = ProductionRun::find()
            .filter(production_run::Column::BranchId.eq(ctx.branch_id))
            .filter(production_run::Column::Status.eq(ProductionStatus::Completed))
            .filter(production_run::Column::ProductionDate.gte(week_start))
            .all(self.db.as_ref())
            .await?;

        let mut stats = ProductionStats {
            today_runs: 0,
            today_batches: 0,
            week_runs: week_runs.len() as u64,
            week_batches: 0,
        };
        for run in &week_runs {
            stats.week_batches += run.batch_count as i64;
            if run.production_date >= today_start {
                stats.today_runs += 1;
                stats.today_batches += run.batch_count as i64;
            }
        }
        Ok(stats)
    }
}
