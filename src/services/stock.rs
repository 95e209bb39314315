use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::TenantContext,
    db::DbPool,
    entities::{
        item::{self, Entity as Item},
        stock_level::{self, Entity as StockLevel, StockHealth},
        stock_transaction::{self, DeductionReason, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// One mutation of a branch's stock, destined for the append-only ledger.
pub(crate) struct LedgerEntry {
    pub item_id: Uuid,
    pub branch_id: Uuid,
    pub transaction_type: TransactionType,
    /// Direction of the mutation. Defaults to the type's classification;
    /// count adjustments override it per line.
    pub is_addition: bool,
    /// Always positive; the direction carries the sign.
    pub quantity: Decimal,
    pub deduction_reason: Option<DeductionReason>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub user_id: Uuid,
    pub notes: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        item_id: Uuid,
        branch_id: Uuid,
        transaction_type: TransactionType,
        quantity: Decimal,
        user_id: Uuid,
    ) -> Self {
        Self {
            item_id,
            branch_id,
            transaction_type,
            is_addition: transaction_type.is_addition(),
            quantity,
            deduction_reason: None,
            reference_id: None,
            reference_type: None,
            user_id,
            notes: None,
        }
    }

    pub fn with_reference(mut self, id: Uuid, kind: &str) -> Self {
        self.reference_id = Some(id);
        self.reference_type = Some(kind.to_string());
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Applies a ledger entry inside the caller's transaction: updates the
/// (item, branch) stock row and appends the immutable transaction record.
/// The before/after pair is read and written inside the same transaction,
/// so concurrent mutations of one stock row serialize.
pub(crate) async fn post_ledger_entry<C: ConnectionTrait>(
    conn: &C,
    entry: LedgerEntry,
) -> Result<stock_transaction::Model, ServiceError> {
    if entry.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must be positive".into(),
        ));
    }

    let existing = StockLevel::find()
        .filter(stock_level::Column::ItemId.eq(entry.item_id))
        .filter(stock_level::Column::BranchId.eq(entry.branch_id))
        .one(conn)
        .await?;

    let quantity_before = existing.as_ref().map(|l| l.quantity).unwrap_or(Decimal::ZERO);
    let quantity_after = if entry.is_addition {
        quantity_before + entry.quantity
    } else {
        quantity_before - entry.quantity
    };

    if quantity_after < Decimal::ZERO {
        return Err(ServiceError::InsufficientStock(format!(
            "item {} has {} in stock, cannot deduct {}",
            entry.item_id, quantity_before, entry.quantity
        )));
    }

    match existing {
        Some(level) => {
            let mut active: stock_level::ActiveModel = level.into();
            active.quantity = Set(quantity_after);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }
        None => {
            stock_level::ActiveModel {
                id: Set(Uuid::new_v4()),
                item_id: Set(entry.item_id),
                branch_id: Set(entry.branch_id),
                quantity: Set(quantity_after),
                min_quantity: Set(None),
                max_quantity: Set(None),
                updated_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;
        }
    }

    let row = stock_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(entry.item_id),
        branch_id: Set(entry.branch_id),
        transaction_type: Set(entry.transaction_type),
        deduction_reason: Set(entry.deduction_reason),
        quantity: Set(entry.quantity),
        quantity_before: Set(quantity_before),
        quantity_after: Set(quantity_after),
        reference_id: Set(entry.reference_id),
        reference_type: Set(entry.reference_type),
        user_id: Set(entry.user_id),
        notes: Set(entry.notes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    crate::metrics::STOCK_TRANSACTIONS
        .with_label_values(&[row.transaction_type.as_ref()])
        .inc();

    Ok(row)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// One row of the per-branch stock view.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockRow {
    pub item_id: Uuid,
    pub item_name: String,
    pub item_name_ar: Option<String>,
    pub sku: String,
    pub category: Option<String>,
    pub unit: String,
    pub quantity: Decimal,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
    pub health: StockHealth,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct StockStats {
    pub total: u64,
    pub healthy: u64,
    pub low: u64,
    pub out: u64,
    pub overstocked: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLimitsCommand {
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustDirection {
    Addition,
    Deduction,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockCommand {
    pub direction: AdjustDirection,
    pub quantity: Decimal,
    /// Required for deductions.
    pub deduction_reason: Option<DeductionReason>,
    pub notes: Option<String>,
}

/// Per-branch stock levels, thresholds, and manual adjustments.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Branch stock list joined with catalog fields.
    #[instrument(skip(self, ctx))]
    pub async fn list_stock(
        &self,
        ctx: &TenantContext,
        query: &StockListQuery,
    ) -> Result<(Vec<StockRow>, u64), ServiceError> {
        let mut finder = StockLevel::find()
            .find_also_related(Item)
            .filter(stock_level::Column::BranchId.eq(ctx.branch_id))
            .filter(item::Column::BusinessId.eq(ctx.business_id));

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            finder = finder.filter(
                Condition::any()
                    .add(item::Column::Name.contains(needle))
                    .add(item::Column::NameAr.contains(needle))
                    .add(item::Column::Sku.contains(needle))
                    .add(item::Column::Category.contains(needle)),
            );
        }

        if query.low_stock {
            finder = finder.filter(
                Condition::any()
                    .add(stock_level::Column::Quantity.lte(Decimal::ZERO))
                    .add(
                        Condition::all()
                            .add(stock_level::Column::MinQuantity.is_not_null())
                            .add(
                                Expr::col((StockLevel, stock_level::Column::Quantity)).lt(
                                    Expr::col((StockLevel, stock_level::Column::MinQuantity)),
                                ),
                            ),
                    ),
            );
        }

        let paginator = finder
            .order_by_asc(item::Column::Name)
            .paginate(self.db.as_ref(), query.limit.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        let rows = rows
            .into_iter()
            .filter_map(|(level, maybe_item)| {
                maybe_item.map(|item| StockRow {
                    item_id: item.id,
                    item_name: item.name,
                    item_name_ar: item.name_ar,
                    sku: item.sku,
                    category: item.category,
                    unit: item.unit,
                    quantity: level.quantity,
                    min_quantity: level.min_quantity,
                    max_quantity: level.max_quantity,
                    health: level.health(),
                })
            })
            .collect();

        Ok((rows, total))
    }

    /// Server-aggregated counts so the stats block always matches the
    /// filtered list the client renders.
    #[instrument(skip(self, ctx))]
    pub async fn stats(&self, ctx: &TenantContext) -> Result<StockStats, ServiceError> {
        let levels = StockLevel::find()
            .filter(stock_level::Column::BranchId.eq(ctx.branch_id))
            .all(self.db.as_ref())
            .await?;

        let mut stats = StockStats {
            total: levels.len() as u64,
            ..Default::default()
        };
        for level in levels {
            match level.health() {
                StockHealth::Healthy => stats.healthy += 1,
                StockHealth::Low => stats.low += 1,
                StockHealth::Out => stats.out += 1,
                StockHealth::Overstocked => stats.overstocked += 1,
            }
        }
        Ok(stats)
    }

    /// Sets the min/max thresholds for an item at the acting branch.
    #[instrument(skip(self, ctx))]
    pub async fn update_limits(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        command: UpdateLimitsCommand,
    ) -> Result<stock_level::Model, ServiceError> {
        if let (Some(min), Some(max)) = (command.min_quantity, command.max_quantity) {
            if max <= min {
                return Err(ServiceError::ValidationError(
                    "max_quantity must be greater than min_quantity".into(),
                ));
            }
        }
        if command.min_quantity.map_or(false, |m| m < Decimal::ZERO)
            || command.max_quantity.map_or(false, |m| m < Decimal::ZERO)
        {
            return Err(ServiceError::ValidationError(
                "limits must not be negative".into(),
            ));
        }

        let item = Item::find_by_id(item_id)
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let existing = StockLevel::find()
            .filter(stock_level::Column::ItemId.eq(item.id))
            .filter(stock_level::Column::BranchId.eq(ctx.branch_id))
            .one(self.db.as_ref())
            .await?;

        let updated = match existing {
            Some(level) => {
                let mut active: stock_level::ActiveModel = level.into();
                active.min_quantity = Set(command.min_quantity);
                active.max_quantity = Set(command.max_quantity);
                active.updated_at = Set(Utc::now());
                active.update(self.db.as_ref()).await?
            }
            None => {
                stock_level::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    item_id: Set(item.id),
                    branch_id: Set(ctx.branch_id),
                    quantity: Set(Decimal::ZERO),
                    min_quantity: Set(command.min_quantity),
                    max_quantity: Set(command.max_quantity),
                    updated_at: Set(Utc::now()),
                }
                .insert(self.db.as_ref())
                .await?
            }
        };

        self.event_sender
            .publish(Event::StockLimitsUpdated {
                item_id: item.id,
                branch_id: ctx.branch_id,
            })
            .await;

        Ok(updated)
    }

    /// Manual stock adjustment with a mandatory reason on deductions.
    #[instrument(skip(self, ctx))]
    pub async fn adjust(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        command: AdjustStockCommand,
    ) -> Result<stock_transaction::Model, ServiceError> {
        if command.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".into(),
            ));
        }
        let (transaction_type, reason) = match command.direction {
            AdjustDirection::Addition => (TransactionType::ManualAddition, None),
            AdjustDirection::Deduction => {
                let reason = command.deduction_reason.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "deduction_reason is required for manual deductions".into(),
                    )
                })?;
                (TransactionType::ManualDeduction, Some(reason))
            }
        };

        let item = Item::find_by_id(item_id)
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let branch_id = ctx.branch_id;
        let user_id = ctx.user_id;
        let notes = command.notes.clone();
        let quantity = command.quantity;

        let row = self
            .db
            .transaction::<_, stock_transaction::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut entry =
                        LedgerEntry::new(item.id, branch_id, transaction_type, quantity, user_id)
                            .with_notes(notes);
                    entry.deduction_reason = reason;
                    post_ledger_entry(txn, entry).await
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(item_id = %row.item_id, type_ = ?row.transaction_type, "Stock adjusted");

        self.event_sender
            .publish(Event::StockAdjusted {
                item_id: row.item_id,
                branch_id: row.branch_id,
                quantity_before: row.quantity_before,
                quantity_after: row.quantity_after,
                transaction_type: row.transaction_type.as_ref().to_string(),
            })
            .await;

        Ok(row)
    }
}

/// Flattens sea-orm's transaction error wrapper back into ServiceError.
pub(crate) fn unwrap_txn_err(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
