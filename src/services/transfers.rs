use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
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
        branch::{self, Entity as Branch},
        business::{self, Entity as Business},
        business_user::{self, Entity as BusinessUser, UserRole},
        item::{self, Entity as Item},
        stock_transaction::TransactionType,
        transfer::{self, Entity as Transfer, TransferStatus},
        transfer_line::{self, Entity as TransferLine},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::stock::{post_ledger_entry, unwrap_txn_err, LedgerEntry};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransferLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransferCommand {
    /// Defaults to the acting business; owners may target another of
    /// their businesses.
    pub to_business_id: Option<Uuid>,
    pub to_branch_id: Uuid,
    pub transfer_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<TransferLineInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferListQuery {
    pub status: Option<TransferStatus>,
    /// "in", "out", or absent for both directions.
    pub direction: Option<String>,
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

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferLineView {
    #[serde(flatten)]
    pub line: transfer_line::Model,
    pub item_name: String,
    pub item_sku: String,
    pub item_unit: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferView {
    #[serde(flatten)]
    pub transfer: transfer::Model,
    pub lines: Vec<TransferLineView>,
    /// Whether the acting branch may receive this transfer.
    pub can_receive: bool,
    /// Whether the acting branch may cancel this transfer.
    pub can_cancel: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DestinationBranch {
    pub branch_id: Uuid,
    pub branch_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DestinationBusiness {
    pub business_id: Uuid,
    pub business_name: String,
    pub branches: Vec<DestinationBranch>,
}

/// Branch-to-branch stock movement with a pending -> received|cancelled
/// lifecycle. Source stock is deducted at creation; the availability the
/// client saw at selection time is advisory and re-validated here.
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Branches the acting context may transfer to. Owners see every
    /// branch of every business they own; other roles the branches of
    /// their own business.
    #[instrument(skip(self, ctx))]
    pub async fn destinations(
        &self,
        ctx: &TenantContext,
        username: &str,
    ) -> Result<Vec<DestinationBusiness>, ServiceError> {
        let business_ids: Vec<Uuid> = if ctx.role == UserRole::Owner {
            BusinessUser::find()
                .filter(business_user::Column::Username.eq(username))
                .filter(business_user::Column::Role.eq(UserRole::Owner))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|u| u.business_id)
                .collect()
        } else {
            vec![ctx.business_id]
        };

        let businesses = Business::find()
            .filter(business::Column::Id.is_in(business_ids.clone()))
            .all(self.db.as_ref())
            .await?;
        let branches = Branch::find()
            .filter(branch::Column::BusinessId.is_in(business_ids))
            .all(self.db.as_ref())
            .await?;

        let mut grouped: HashMap<Uuid, Vec<DestinationBranch>> = HashMap::new();
        for b in branches {
            grouped.entry(b.business_id).or_default().push(DestinationBranch {
                branch_id: b.id,
                branch_name: b.name,
            });
        }

        Ok(businesses
            .into_iter()
            .map(|b| DestinationBusiness {
                branches: grouped.remove(&b.id).unwrap_or_default(),
                business_id: b.id,
                business_name: b.name,
            })
            .collect())
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        command: CreateTransferCommand,
    ) -> Result<TransferView, ServiceError> {
        command.validate()?;

        let to_business_id = command.to_business_id.unwrap_or(ctx.business_id);
        if command.to_branch_id == ctx.branch_id {
            return Err(ServiceError::ValidationError(
                "source and destination branch must differ".into(),
            ));
        }

        let destination = Branch::find_by_id(command.to_branch_id)
            .filter(branch::Column::BusinessId.eq(to_business_id))
            .one(self.db.as_ref())
            .await?;
        if destination.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Destination branch {} not found",
                command.to_branch_id
            )));
        }

        for line in &command.lines {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "line quantities must be positive".into(),
                ));
            }
            let exists = Item::find_by_id(line.item_id)
                .filter(item::Column::BusinessId.eq(ctx.business_id))
                .one(self.db.as_ref())
                .await?;
            if exists.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "Item {} not found",
                    line.item_id
                )));
            }
        }

        let transfer_id = Uuid::new_v4();
        let transfer_number =
            format!("TR-{}", &transfer_id.simple().to_string()[..8].to_uppercase());
        let now = Utc::now();
        let from_business_id = ctx.business_id;
        let from_branch_id = ctx.branch_id;
        let to_branch_id = command.to_branch_id;
        let transfer_date = command.transfer_date.unwrap_or(now);
        let notes = command.notes.clone();
        let user_id = ctx.user_id;
        let lines = command.lines;

        let created = self
            .db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Deduct the source branch up front; the ledger write
                    // re-validates availability under the transaction.
                    for line in &lines {
                        post_ledger_entry(
                            txn,
                            LedgerEntry::new(
                                line.item_id,
                                from_branch_id,
                                TransactionType::TransferOut,
                                line.quantity,
                                user_id,
                            )
                            .with_reference(transfer_id, "transfer"),
                        )
                        .await?;
                    }

                    let created = transfer::ActiveModel {
                        id: Set(transfer_id),
                        transfer_number: Set(transfer_number),
                        from_business_id: Set(from_business_id),
                        from_branch_id: Set(from_branch_id),
                        to_business_id: Set(to_business_id),
                        to_branch_id: Set(to_branch_id),
                        transfer_date: Set(transfer_date),
                        status: Set(TransferStatus::Pending),
                        notes: Set(notes),
                        created_by: Set(user_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for line in lines {
                        transfer_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transfer_id: Set(transfer_id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                        }
                        .insert(txn)
                        .await?;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        crate::metrics::TRANSFERS_CREATED.inc();
        info!(transfer_id = %created.id, transfer_number = %created.transfer_number, "Transfer created");
        self.event_sender.publish(Event::TransferCreated(created.id)).await;

        self.view(ctx, created).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferView, ServiceError> {
        let transfer = self.find_visible(ctx, transfer_id).await?;
        self.view(ctx, transfer).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        query: &TransferListQuery,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        let direction_condition = match query.direction.as_deref() {
            Some("in") => Condition::all().add(transfer::Column::ToBranchId.eq(ctx.branch_id)),
            Some("out") => Condition::all().add(transfer::Column::FromBranchId.eq(ctx.branch_id)),
            _ => Condition::any()
                .add(transfer::Column::FromBranchId.eq(ctx.branch_id))
                .add(transfer::Column::ToBranchId.eq(ctx.branch_id)),
        };

        let mut finder = Transfer::find().filter(direction_condition);
        if let Some(status) = query.status {
            finder = finder.filter(transfer::Column::Status.eq(status));
        }

        let paginator = finder
            .order_by_desc(transfer::Column::TransferDate)
            .paginate(self.db.as_ref(), query.limit.max(1));
        let total = paginator.num_items().await?;
        let transfers = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((transfers, total))
    }

    /// Only a principal acting for the destination branch may receive.
    #[instrument(skip(self, ctx))]
    pub async fn receive(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferView, ServiceError> {
        let transfer = self.find_visible(ctx, transfer_id).await?;

        if transfer.status != TransferStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Transfer in status {} cannot be received",
                transfer.status
            )));
        }
        if !ctx.acts_for_branch(transfer.to_branch_id) {
            return Err(ServiceError::Forbidden(
                "Only the receiving branch may receive this transfer".into(),
            ));
        }

        let lines = TransferLine::find()
            .filter(transfer_line::Column::TransferId.eq(transfer.id))
            .all(self.db.as_ref())
            .await?;

        let to_branch_id = transfer.to_branch_id;
        let user_id = ctx.user_id;
        let transfer_model = transfer.clone();

        let updated = self
            .db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    for line in &lines {
                        post_ledger_entry(
                            txn,
                            LedgerEntry::new(
                                line.item_id,
                                to_branch_id,
                                TransactionType::TransferIn,
                                line.quantity,
                                user_id,
                            )
                            .with_reference(transfer_model.id, "transfer"),
                        )
                        .await?;
                    }

                    let mut active: transfer::ActiveModel = transfer_model.into();
                    active.status = Set(TransferStatus::Received);
                    active.updated_at = Set(Utc::now());
                    Ok(active.update(txn).await?)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(transfer_id = %updated.id, "Transfer received");
        self.event_sender.publish(Event::TransferReceived(updated.id)).await;

        self.view(ctx, updated).await
    }

    /// Only a principal acting for the sending branch may cancel; the
    /// source deduction is reversed.
    #[instrument(skip(self, ctx))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        reason: Option<String>,
    ) -> Result<TransferView, ServiceError> {
        let transfer = self.find_visible(ctx, transfer_id).await?;

        if transfer.status != TransferStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Transfer in status {} cannot be cancelled",
                transfer.status
            )));
        }
        if !ctx.acts_for_branch(transfer.from_branch_id) {
            return Err(ServiceError::Forbidden(
                "Only the sending branch may cancel this transfer".into(),
            ));
        }

        let lines = TransferLine::find()
            .filter(transfer_line::Column::TransferId.eq(transfer.id))
            .all(self.db.as_ref())
            .await?;

        let from_branch_id = transfer.from_branch_id;
        let user_id = ctx.user_id;
        let transfer_model = transfer.clone();
        let cancel_notes = reason.clone();

        let updated = self
            .db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    for line in &lines {
                        post_ledger_entry(
                            txn,
                            LedgerEntry::new(
                                line.item_id,
                                from_branch_id,
                                TransactionType::TransferIn,
                                line.quantity,
                                user_id,
                            )
                            .with_reference(transfer_model.id, "transfer_cancel")
                            .with_notes(Some("transfer cancelled, stock returned".into())),
                        )
                        .await?;
                    }

                    let mut active: transfer::ActiveModel = transfer_model.into();
                    active.status = Set(TransferStatus::Cancelled);
                    if let Some(reason) = cancel_notes {
                        active.notes = Set(Some(reason));
                    }
                    active.updated_at = Set(Utc::now());
                    Ok(active.update(txn).await?)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(transfer_id = %updated.id, "Transfer cancelled");
        self.event_sender.publish(Event::TransferCancelled(updated.id)).await;

        self.view(ctx, updated).await
    }

    async fn find_visible(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<transfer::Model, ServiceError> {
        Transfer::find_by_id(transfer_id)
            .filter(
                Condition::any()
                    .add(transfer::Column::FromBranchId.eq(ctx.branch_id))
                    .add(transfer::Column::ToBranchId.eq(ctx.branch_id))
                    .add(transfer::Column::FromBusinessId.eq(ctx.business_id))
                    .add(transfer::Column::ToBusinessId.eq(ctx.business_id)),
            )
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))
    }

    async fn view(
        &self,
        ctx: &TenantContext,
        transfer: transfer::Model,
    ) -> Result<TransferView, ServiceError> {
        let lines = TransferLine::find()
            .filter(transfer_line::Column::TransferId.eq(transfer.id))
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
                TransferLineView {
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    item_sku: item.map(|i| i.sku.clone()).unwrap_or_default(),
                    item_unit: item.map(|i| i.unit.clone()).unwrap_or_default(),
                    line,
                }
            })
            .collect();

        let pending = transfer.status == TransferStatus::Pending;
        Ok(TransferView {
            can_receive: pending && ctx.acts_for_branch(transfer.to_branch_id),
            can_cancel: pending && ctx.acts_for_branch(transfer.from_branch_id),
            transfer,
            lines: line_views,
        })
    }
}
