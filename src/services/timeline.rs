use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::TenantContext,
    db::DbPool,
    entities::{
        business_user::{self, Entity as BusinessUser},
        item::{self, Entity as Item},
        stock_transaction::{self, DeductionReason, Entity as StockTransaction, TransactionType},
    },
    errors::ServiceError,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TimelineQuery {
    pub transaction_type: Option<TransactionType>,
    pub deduction_reason: Option<DeductionReason>,
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

/// Ledger row enriched with the item and user fields the feed renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineRow {
    #[serde(flatten)]
    pub transaction: stock_transaction::Model,
    pub item_name: String,
    pub item_sku: String,
    pub item_unit: String,
    pub user_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineStats {
    pub today_count: u64,
    pub week_count: u64,
    pub week_additions: Decimal,
    pub week_deductions: Decimal,
}

/// Read side of the append-only stock ledger.
#[derive(Clone)]
pub struct TimelineService {
    db: Arc<DbPool>,
}

impl TimelineService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        query: &TimelineQuery,
    ) -> Result<(Vec<TimelineRow>, u64), ServiceError> {
        let mut finder = StockTransaction::find()
            .filter(stock_transaction::Column::BranchId.eq(ctx.branch_id));

        if let Some(t) = query.transaction_type {
            finder = finder.filter(stock_transaction::Column::TransactionType.eq(t));
        }
        if let Some(reason) = query.deduction_reason {
            finder = finder.filter(stock_transaction::Column::DeductionReason.eq(reason));
        }

        let paginator = finder
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .paginate(self.db.as_ref(), query.limit.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((self.enrich(rows).await?, total))
    }

    #[instrument(skip(self, ctx))]
    pub async fn item_timeline(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<TimelineRow>, u64), ServiceError> {
        let paginator = StockTransaction::find()
            .filter(stock_transaction::Column::BranchId.eq(ctx.branch_id))
            .filter(stock_transaction::Column::ItemId.eq(item_id))
            .order_by_desc(stock_transaction::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((self.enrich(rows).await?, total))
    }

    /// Today/week row counts and addition vs deduction volume, aggregated
    /// server-side so they stay consistent with the paginated feed.
    #[instrument(skip(self, ctx))]
    pub async fn stats(&self, ctx: &TenantContext) -> Result<TimelineStats, ServiceError> {
        let now = Utc::now();
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        let week_start = today_start - Duration::days(6);

        let rows = StockTransaction::find()
            .filter(stock_transaction::Column::BranchId.eq(ctx.branch_id))
            .filter(stock_transaction::Column::CreatedAt.gte(week_start))
            .all(self.db.as_ref())
            .await?;

        let mut stats = TimelineStats {
            today_count: 0,
            week_count: rows.len() as u64,
            week_additions: Decimal::ZERO,
            week_deductions: Decimal::ZERO,
        };
        for row in &rows {
            if row.created_at >= today_start {
                stats.today_count += 1;
            }
            if row.quantity_after >= row.quantity_before {
                stats.week_additions += row.quantity;
            } else {
                stats.week_deductions += row.quantity;
            }
        }
        Ok(stats)
    }

    /// Batched enrichment: one query for the items, one for the users.
    async fn enrich(
        &self,
        rows: Vec<stock_transaction::Model>,
    ) -> Result<Vec<TimelineRow>, ServiceError> {
        let item_ids: Vec<Uuid> = rows.iter().map(|r| r.item_id).collect();
        let user_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();

        let items: HashMap<Uuid, item::Model> = Item::find()
            .filter(item::Column::Id.is_in(item_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let users: HashMap<Uuid, business_user::Model> = BusinessUser::find()
            .filter(business_user::Column::Id.is_in(user_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(rows
            .into_iter()
            .map(|transaction| {
                let item = items.get(&transaction.item_id);
                let user = users.get(&transaction.user_id);
                TimelineRow {
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    item_sku: item.map(|i| i.sku.clone()).unwrap_or_default(),
                    item_unit: item.map(|i| i.unit.clone()).unwrap_or_default(),
                    user_name: user
                        .map(|u| u.display_name.clone().unwrap_or_else(|| u.username.clone()))
                        .unwrap_or_default(),
                    transaction,
                }
            })
            .collect())
    }
}
