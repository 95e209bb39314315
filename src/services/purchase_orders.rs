use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
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
        item::{self, Entity as Item},
        po_activity::{self, Entity as PoActivity},
        po_template::{self, Entity as PoTemplate},
        po_template_line::{self, Entity as PoTemplateLine},
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        vendor::{self, Entity as Vendor, VendorStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::stock::unwrap_txn_err;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

/// Order creation captures quantities only; costs arrive with the invoice
/// at receiving time.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderCommand {
    pub vendor_id: Uuid,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<PurchaseOrderLineInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderCommand {
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    /// Replaces the line set; only while the order is editable.
    pub lines: Option<Vec<PurchaseOrderLineInput>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusCommand {
    pub status: PurchaseOrderStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseOrderListQuery {
    pub status: Option<PurchaseOrderStatus>,
    pub vendor_id: Option<Uuid>,
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
pub struct PurchaseOrderLineView {
    #[serde(flatten)]
    pub line: purchase_order_line::Model,
    pub item_name: String,
    pub item_sku: String,
    pub item_unit: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderView {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub vendor_name: String,
    pub lines: Vec<PurchaseOrderLineView>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TemplateCommand {
    pub vendor_id: Uuid,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub name_ar: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateView {
    #[serde(flatten)]
    pub template: po_template::Model,
    pub lines: Vec<po_template_line::Model>,
}

/// Purchase order lifecycle, activity log, and templates.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        command: CreatePurchaseOrderCommand,
    ) -> Result<PurchaseOrderView, ServiceError> {
        command.validate()?;
        self.validate_lines(ctx, &command.lines).await?;

        let vendor = Vendor::find_by_id(command.vendor_id)
            .filter(vendor::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor {} not found", command.vendor_id))
            })?;
        if vendor.status != VendorStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Vendor is inactive".into(),
            ));
        }
        if !vendor.visible_to_branch(ctx.branch_id) {
            return Err(ServiceError::Forbidden(
                "Vendor is not available to this branch".into(),
            ));
        }

        let order_id = Uuid::new_v4();
        let order_number = format!("PO-{}", &order_id.simple().to_string()[..8].to_uppercase());
        let now = Utc::now();
        let business_id = ctx.business_id;
        let branch_id = ctx.branch_id;
        let user_id = ctx.user_id;
        let vendor_id = vendor.id;
        let expected_date = command.expected_date;
        let notes = command.notes.clone();
        let lines = command.lines;

        let order = self
            .db
            .transaction::<_, purchase_order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = purchase_order::ActiveModel {
                        id: Set(order_id),
                        order_number: Set(order_number),
                        business_id: Set(business_id),
                        branch_id: Set(branch_id),
                        vendor_id: Set(vendor_id),
                        order_date: Set(now),
                        expected_date: Set(expected_date),
                        status: Set(PurchaseOrderStatus::Draft),
                        subtotal: Set(Decimal::ZERO),
                        tax_amount: Set(Decimal::ZERO),
                        total_amount: Set(Decimal::ZERO),
                        invoice_image: Set(None),
                        notes: Set(notes),
                        created_by: Set(user_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for line in lines {
                        purchase_order_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(order.id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                            unit_cost: Set(None),
                            total_cost: Set(None),
                            received_quantity: Set(None),
                            variance_reason: Set(None),
                            variance_note: Set(None),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }

                    append_activity(txn, order.id, user_id, "created", None, Some("draft"), None, None)
                        .await?;

                    Ok(order)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        crate::metrics::PO_CREATIONS.inc();
        info!(purchase_order_id = %order.id, order_number = %order.order_number, "Purchase order created");
        self.event_sender
            .publish(Event::PurchaseOrderCreated(order.id))
            .await;

        self.get(ctx, order.id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let order = self.find_owned(ctx, order_id).await?;
        let vendor = Vendor::find_by_id(order.vendor_id).one(self.db.as_ref()).await?;
        let lines = self.load_line_views(order.id).await?;

        Ok(PurchaseOrderView {
            order,
            vendor_name: vendor.map(|v| v.name).unwrap_or_default(),
            lines,
        })
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        query: &PurchaseOrderListQuery,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let mut finder = PurchaseOrder::find()
            .filter(purchase_order::Column::BusinessId.eq(ctx.business_id))
            .filter(purchase_order::Column::BranchId.eq(ctx.branch_id));

        if let Some(status) = query.status {
            finder = finder.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(vendor_id) = query.vendor_id {
            finder = finder.filter(purchase_order::Column::VendorId.eq(vendor_id));
        }

        let paginator = finder
            .order_by_desc(purchase_order::Column::OrderDate)
            .paginate(self.db.as_ref(), query.limit.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    /// Details are editable only while the order is draft or pending.
    #[instrument(skip(self, ctx, command))]
    pub async fn update(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        command: UpdatePurchaseOrderCommand,
    ) -> Result<PurchaseOrderView, ServiceError> {
        command.validate()?;
        let order = self.find_owned(ctx, order_id).await?;

        if !order.status.is_editable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Purchase order in status {} cannot be edited",
                order.status
            )));
        }
        if let Some(lines) = &command.lines {
            if lines.is_empty() {
                return Err(ServiceError::ValidationError(
                    "at least one line is required".into(),
                ));
            }
            self.validate_lines(ctx, lines).await?;
        }

        let mut changes: Vec<String> = Vec::new();
        if command.expected_date.is_some() {
            changes.push("expected_date".into());
        }
        if command.notes.is_some() {
            changes.push("notes".into());
        }
        if command.lines.is_some() {
            changes.push("lines".into());
        }
        let changes_json = serde_json::to_string(&changes).ok();

        let user_id = ctx.user_id;
        let replacement_lines = command.lines;
        let expected_date = command.expected_date;
        let notes = command.notes;
        let order_id = order.id;
        let now = Utc::now();

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut active: purchase_order::ActiveModel = order.into();
                    if let Some(date) = expected_date {
                        active.expected_date = Set(Some(date));
                    }
                    if let Some(notes) = notes {
                        active.notes = Set(Some(notes));
                    }
                    active.updated_at = Set(now);
                    active.update(txn).await?;

                    if let Some(lines) = replacement_lines {
                        PurchaseOrderLine::delete_many()
                            .filter(purchase_order_line::Column::PurchaseOrderId.eq(order_id))
                            .exec(txn)
                            .await?;
                        for line in lines {
                            purchase_order_line::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                purchase_order_id: Set(order_id),
                                item_id: Set(line.item_id),
                                quantity: Set(line.quantity),
                                unit_cost: Set(None),
                                total_cost: Set(None),
                                received_quantity: Set(None),
                                variance_reason: Set(None),
                                variance_note: Set(None),
                                created_at: Set(now),
                                updated_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                        }
                    }

                    append_activity(
                        txn,
                        order_id,
                        user_id,
                        "updated",
                        None,
                        None,
                        None,
                        changes_json,
                    )
                    .await?;

                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.get(ctx, order_id).await
    }

    /// Drives the manual part of the state machine. Receipt-driven
    /// transitions happen in the receiving engine.
    #[instrument(skip(self, ctx, command))]
    pub async fn update_status(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        command: UpdateStatusCommand,
    ) -> Result<purchase_order::Model, ServiceError> {
        command.validate()?;
        let order = self.find_owned(ctx, order_id).await?;
        let old_status = order.status;
        let new_status = command.status;

        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move purchase order from {} to {}",
                old_status, new_status
            )));
        }

        let user_id = ctx.user_id;
        let notes = command.notes.clone();
        let updated = self
            .db
            .transaction::<_, purchase_order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut active: purchase_order::ActiveModel = order.into();
                    active.status = Set(new_status);
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(txn).await?;

                    let action = if new_status == PurchaseOrderStatus::Cancelled {
                        "cancelled"
                    } else {
                        "status_changed"
                    };
                    append_activity(
                        txn,
                        updated.id,
                        user_id,
                        action,
                        Some(&old_status.to_string()),
                        Some(&new_status.to_string()),
                        notes,
                        None,
                    )
                    .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            purchase_order_id = %updated.id,
            old_status = %old_status,
            new_status = %updated.status,
            "Purchase order status changed"
        );
        self.event_sender
            .publish(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status: old_status.to_string(),
                new_status: updated.status.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Audit log, newest first.
    #[instrument(skip(self, ctx))]
    pub async fn activity(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
    ) -> Result<Vec<po_activity::Model>, ServiceError> {
        let order = self.find_owned(ctx, order_id).await?;
        Ok(PoActivity::find()
            .filter(po_activity::Column::PurchaseOrderId.eq(order.id))
            .order_by_desc(po_activity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    // Templates

    #[instrument(skip(self, ctx))]
    pub async fn list_templates(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<TemplateView>, ServiceError> {
        let templates = PoTemplate::find()
            .filter(po_template::Column::BusinessId.eq(ctx.business_id))
            .order_by_asc(po_template::Column::Name)
            .all(self.db.as_ref())
            .await?;

        let ids: Vec<Uuid> = templates.iter().map(|t| t.id).collect();
        let mut lines_by_template: HashMap<Uuid, Vec<po_template_line::Model>> = HashMap::new();
        for line in PoTemplateLine::find()
            .filter(po_template_line::Column::TemplateId.is_in(ids))
            .all(self.db.as_ref())
            .await?
        {
            lines_by_template.entry(line.template_id).or_default().push(line);
        }

        Ok(templates
            .into_iter()
            .map(|template| {
                let lines = lines_by_template.remove(&template.id).unwrap_or_default();
                TemplateView { template, lines }
            })
            .collect())
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn create_template(
        &self,
        ctx: &TenantContext,
        command: TemplateCommand,
    ) -> Result<TemplateView, ServiceError> {
        command.validate()?;
        self.validate_lines(ctx, &command.lines).await?;

        let vendor = Vendor::find_by_id(command.vendor_id)
            .filter(vendor::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor {} not found", command.vendor_id))
            })?;

        let template_id = Uuid::new_v4();
        let now = Utc::now();
        let business_id = ctx.business_id;
        let user_id = ctx.user_id;
        let vendor_id = vendor.id;
        let name = command.name;
        let name_ar = command.name_ar;
        let notes = command.notes;
        let lines = command.lines;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    po_template::ActiveModel {
                        id: Set(template_id),
                        business_id: Set(business_id),
                        vendor_id: Set(vendor_id),
                        name: Set(name),
                        name_ar: Set(name_ar),
                        notes: Set(notes),
                        created_by: Set(user_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for line in lines {
                        po_template_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            template_id: Set(template_id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.get_template(ctx, template_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_template(
        &self,
        ctx: &TenantContext,
        template_id: Uuid,
    ) -> Result<TemplateView, ServiceError> {
        let template = PoTemplate::find_by_id(template_id)
            .filter(po_template::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Template {} not found", template_id))
            })?;

        let lines = PoTemplateLine::find()
            .filter(po_template_line::Column::TemplateId.eq(template.id))
            .all(self.db.as_ref())
            .await?;

        Ok(TemplateView { template, lines })
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn update_template(
        &self,
        ctx: &TenantContext,
        template_id: Uuid,
        command: TemplateCommand,
    ) -> Result<TemplateView, ServiceError> {
        command.validate()?;
        self.validate_lines(ctx, &command.lines).await?;
        let existing = self.get_template(ctx, template_id).await?.template;

        let vendor_id = command.vendor_id;
        let name = command.name;
        let name_ar = command.name_ar;
        let notes = command.notes;
        let lines = command.lines;
        let id = existing.id;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut active: po_template::ActiveModel = existing.into();
                    active.vendor_id = Set(vendor_id);
                    active.name = Set(name);
                    active.name_ar = Set(name_ar);
                    active.notes = Set(notes);
                    active.updated_at = Set(Utc::now());
                    active.update(txn).await?;

                    PoTemplateLine::delete_many()
                        .filter(po_template_line::Column::TemplateId.eq(id))
                        .exec(txn)
                        .await?;
                    for line in lines {
                        po_template_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            template_id: Set(id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.get_template(ctx, template_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_template(
        &self,
        ctx: &TenantContext,
        template_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.get_template(ctx, template_id).await?.template;
        let id = existing.id;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    PoTemplateLine::delete_many()
                        .filter(po_template_line::Column::TemplateId.eq(id))
                        .exec(txn)
                        .await?;
                    PoTemplate::delete_by_id(id).exec(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    pub(crate) async fn find_owned(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        PurchaseOrder::find_by_id(order_id)
            .filter(purchase_order::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })
    }

    pub(crate) async fn load_line_views(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<PurchaseOrderLineView>, ServiceError> {
        let lines = PurchaseOrderLine::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_line::Column::CreatedAt)
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

        Ok(lines
            .into_iter()
            .map(|line| {
                let item = items.get(&line.item_id);
                PurchaseOrderLineView {
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    item_sku: item.map(|i| i.sku.clone()).unwrap_or_default(),
                    item_unit: item.map(|i| i.unit.clone()).unwrap_or_default(),
                    line,
                }
            })
            .collect())
    }

    async fn validate_lines(
        &self,
        ctx: &TenantContext,
        lines: &[PurchaseOrderLineInput],
    ) -> Result<(), ServiceError> {
        for line in lines {
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
        Ok(())
    }
}

/// Appends one audit row; used by the PO service and the receiving engine.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn append_activity<C: sea_orm::ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
    user_id: Uuid,
    action: &str,
    old_status: Option<&str>,
    new_status: Option<&str>,
    notes: Option<String>,
    changes: Option<String>,
) -> Result<po_activity::Model, ServiceError> {
    Ok(po_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        action: Set(action.to_string()),
        old_status: Set(old_status.map(str::to_string)),
        new_status: Set(new_status.map(str::to_string)),
        notes: Set(notes),
        changes: Set(changes),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}
