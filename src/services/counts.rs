use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
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
        inventory_count::{self, CountStatus, CountType, Entity as InventoryCount},
        inventory_count_line::{self, Entity as InventoryCountLine},
        item::{self, Entity as Item, ItemStatus},
        stock_level::{self, Entity as StockLevel},
        stock_transaction::TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::stock::{post_ledger_entry, unwrap_txn_err, LedgerEntry};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCountCommand {
    pub count_type: CountType,
    pub count_date: Option<DateTime<Utc>>,
    /// Required for partial counts: the items to put on the sheet.
    pub item_ids: Option<Vec<Uuid>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordCountLineInput {
    pub line_id: Uuid,
    pub counted_quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountLineView {
    #[serde(flatten)]
    pub line: inventory_count_line::Model,
    pub item_name: String,
    pub item_sku: String,
    pub item_unit: String,
    pub variance: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountView {
    #[serde(flatten)]
    pub count: inventory_count::Model,
    pub lines: Vec<CountLineView>,
}

/// Stock count sessions: sheet generation, recording, and completion
/// posting `inventory_count_adjustment` ledger rows.
#[derive(Clone)]
pub struct InventoryCountService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryCountService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Generates the count sheet. Full counts cover every stocked item of
    /// the branch; partial counts the given items. Expected quantities
    /// snapshot the ledger at generation time.
    #[instrument(skip(self, ctx, command))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        command: CreateCountCommand,
    ) -> Result<CountView, ServiceError> {
        command.validate()?;

        let item_ids: Vec<Uuid> = match command.count_type {
            CountType::Full => {
                let active_items = Item::find()
                    .filter(item::Column::BusinessId.eq(ctx.business_id))
                    .filter(item::Column::Status.eq(ItemStatus::Active))
                    .all(self.db.as_ref())
                    .await?;
                active_items.into_iter().map(|i| i.id).collect()
            }
            CountType::Partial => {
                let ids = command
                    .item_ids
                    .clone()
                    .filter(|ids| !ids.is_empty())
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "partial counts require item_ids".into(),
                        )
                    })?;
                for id in &ids {
                    let exists = Item::find_by_id(*id)
                        .filter(item::Column::BusinessId.eq(ctx.business_id))
                        .one(self.db.as_ref())
                        .await?;
                    if exists.is_none() {
                        return Err(ServiceError::NotFound(format!("Item {} not found", id)));
                    }
                }
                ids
            }
        };
        if item_ids.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "No items to count".into(),
            ));
        }

        let levels: HashMap<Uuid, Decimal> = StockLevel::find()
            .filter(stock_level::Column::BranchId.eq(ctx.branch_id))
            .filter(stock_level::Column::ItemId.is_in(item_ids.clone()))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|l| (l.item_id, l.quantity))
            .collect();

        let count_id = Uuid::new_v4();
        let count_number = format!("IC-{}", &count_id.simple().to_string()[..8].to_uppercase());
        let now = Utc::now();
        let business_id = ctx.business_id;
        let branch_id = ctx.branch_id;
        let user_id = ctx.user_id;
        let count_type = command.count_type;
        let count_date = command.count_date.unwrap_or(now);
        let notes = command.notes.clone();

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    inventory_count::ActiveModel {
                        id: Set(count_id),
                        count_number: Set(count_number),
                        business_id: Set(business_id),
                        branch_id: Set(branch_id),
                        count_type: Set(count_type),
                        count_date: Set(count_date),
                        status: Set(CountStatus::Draft),
                        notes: Set(notes),
                        created_by: Set(user_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for item_id in item_ids {
                        inventory_count_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            count_id: Set(count_id),
                            item_id: Set(item_id),
                            expected_quantity: Set(
                                levels.get(&item_id).copied().unwrap_or(Decimal::ZERO)
                            ),
                            counted_quantity: Set(None),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(count_id = %count_id, "Inventory count created");
        self.event_sender
            .publish(Event::InventoryCountCreated(count_id))
            .await;

        self.get(ctx, count_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        status: Option<CountStatus>,
    ) -> Result<Vec<inventory_count::Model>, ServiceError> {
        let mut finder = InventoryCount::find()
            .filter(inventory_count::Column::BranchId.eq(ctx.branch_id));
        if let Some(status) = status {
            finder = finder.filter(inventory_count::Column::Status.eq(status));
        }
        Ok(finder
            .order_by_desc(inventory_count::Column::CountDate)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &TenantContext, count_id: Uuid) -> Result<CountView, ServiceError> {
        let count = self.find_owned(ctx, count_id).await?;

        let lines = InventoryCountLine::find()
            .filter(inventory_count_line::Column::CountId.eq(count.id))
            .all(self.db.as_ref())
            .await?;

        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
        let items: HashMap<Uuid, item::Model> = Item::find()
            .filter(item::Column::Id.is_in(item_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let line_views = lines
            .into_iter()
            .map(|line| {
                let item = items.get(&line.item_id);
                CountLineView {
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    item_sku: item.map(|i| i.sku.clone()).unwrap_or_default(),
                    item_unit: item.map(|i| i.unit.clone()).unwrap_or_default(),
                    variance: line.variance(),
                    line,
                }
            })
            .collect();

        Ok(CountView {
            count,
            lines: line_views,
        })
    }

    /// Records counted quantities. The first recording moves the session
    /// from draft to in_progress.
    #[instrument(skip(self, ctx, inputs))]
    pub async fn record_lines(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
        inputs: Vec<RecordCountLineInput>,
    ) -> Result<CountView, ServiceError> {
        let count = self.find_owned(ctx, count_id).await?;
        if !matches!(count.status, CountStatus::Draft | CountStatus::InProgress) {
            return Err(ServiceError::InvalidStatus(format!(
                "Count in status {} cannot be recorded",
                count.status
            )));
        }
        if inputs.is_empty() {
            return Err(ServiceError::ValidationError("no lines to record".into()));
        }
        for input in &inputs {
            if input.counted_quantity < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "counted_quantity must not be negative".into(),
                ));
            }
        }

        let count_model = count.clone();
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    for input in inputs {
                        let line = InventoryCountLine::find_by_id(input.line_id)
                            .filter(inventory_count_line::Column::CountId.eq(count_model.id))
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Count line {} not found",
                                    input.line_id
                                ))
                            })?;

                        let mut active: inventory_count_line::ActiveModel = line.into();
                        active.counted_quantity = Set(Some(input.counted_quantity));
                        active.updated_at = Set(Utc::now());
                        active.update(txn).await?;
                    }

                    if count_model.status == CountStatus::Draft {
                        let mut active: inventory_count::ActiveModel = count_model.into();
                        active.status = Set(CountStatus::InProgress);
                        active.updated_at = Set(Utc::now());
                        active.update(txn).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.get(ctx, count_id).await
    }

    /// Completes the session. Every line must be counted. For each line
    /// the live quantity is re-read and adjusted to the counted value, so
    /// the correction stays accurate even if stock moved after the sheet
    /// snapshot.
    #[instrument(skip(self, ctx))]
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
    ) -> Result<CountView, ServiceError> {
        let count = self.find_owned(ctx, count_id).await?;
        if !matches!(count.status, CountStatus::Draft | CountStatus::InProgress) {
            return Err(ServiceError::InvalidStatus(format!(
                "Count in status {} cannot be completed",
                count.status
            )));
        }

        let lines = InventoryCountLine::find()
            .filter(inventory_count_line::Column::CountId.eq(count.id))
            .all(self.db.as_ref())
            .await?;
        let uncounted = lines.iter().filter(|l| l.counted_quantity.is_none()).count();
        if uncounted > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "{} lines have not been counted",
                uncounted
            )));
        }

        let branch_id = count.branch_id;
        let user_id = ctx.user_id;
        let count_model = count.clone();
        let count_ref = count.id;

        let adjusted = self
            .db
            .transaction::<_, usize, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut adjusted = 0usize;
                    for line in &lines {
                        let Some(counted) = line.counted_quantity else {
                            continue;
                        };

                        let live = StockLevel::find()
                            .filter(stock_level::Column::ItemId.eq(line.item_id))
                            .filter(stock_level::Column::BranchId.eq(branch_id))
                            .one(txn)
                            .await?
                            .map(|l| l.quantity)
                            .unwrap_or(Decimal::ZERO);

                        let delta = counted - live;
                        if delta == Decimal::ZERO {
                            continue;
                        }

                        let mut entry = LedgerEntry::new(
                            line.item_id,
                            branch_id,
                            TransactionType::InventoryCountAdjustment,
                            delta.abs(),
                            user_id,
                        )
                        .with_reference(count_ref, "inventory_count");
                        entry.is_addition = delta > Decimal::ZERO;
                        post_ledger_entry(txn, entry).await?;
                        adjusted += 1;
                    }

                    let mut active: inventory_count::ActiveModel = count_model.into();
                    active.status = Set(CountStatus::Completed);
                    active.updated_at = Set(Utc::now());
                    active.update(txn).await?;

                    Ok(adjusted)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(count_id = %count_id, adjusted_lines = adjusted, "Inventory count completed");
        self.event_sender
            .publish(Event::InventoryCountCompleted {
                count_id,
                adjusted_lines: adjusted,
            })
            .await;

        self.get(ctx, count_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
    ) -> Result<CountView, ServiceError> {
        let count = self.find_owned(ctx, count_id).await?;
        if !matches!(count.status, CountStatus::Draft | CountStatus::InProgress) {
            return Err(ServiceError::InvalidStatus(format!(
                "Count in status {} cannot be cancelled",
                count.status
            )));
        }

        let mut active: inventory_count::ActiveModel = count.into();
        active.status = Set(CountStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        active.update(self.db.as_ref()).await?;

        self.event_sender
            .publish(Event::InventoryCountCancelled(count_id))
            .await;

        self.get(ctx, count_id).await
    }

    async fn find_owned(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
    ) -> Result<inventory_count::Model, ServiceError> {
        InventoryCount::find_by_id(count_id)
            .filter(inventory_count::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory count {} not found", count_id))
            })
    }
}
