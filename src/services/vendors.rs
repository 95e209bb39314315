use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::TenantContext,
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        vendor::{self, Entity as Vendor, VendorStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorListQuery {
    pub search: Option<String>,
    pub status: Option<VendorStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVendorCommand {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub name_ar: Option<String>,
    pub code: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub tax_number: Option<String>,
    #[validate(range(min = 0, message = "payment_terms must not be negative"))]
    pub payment_terms: Option<i32>,
    /// Restrict the vendor to one branch; absent means all branches.
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVendorCommand {
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub code: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub tax_number: Option<String>,
    pub payment_terms: Option<i32>,
    #[serde(default)]
    pub branch_id: Option<Option<Uuid>>,
    pub status: Option<VendorStatus>,
}

/// Vendor CRUD with branch visibility scoping.
#[derive(Clone)]
pub struct VendorService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl VendorService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Vendors visible to the acting branch: unrestricted vendors plus
    /// those pinned to this branch.
    #[instrument(skip(self, ctx))]
    pub async fn list_vendors(
        &self,
        ctx: &TenantContext,
        query: &VendorListQuery,
    ) -> Result<Vec<vendor::Model>, ServiceError> {
        let mut finder = Vendor::find()
            .filter(vendor::Column::BusinessId.eq(ctx.business_id))
            .filter(
                Condition::any()
                    .add(vendor::Column::BranchId.is_null())
                    .add(vendor::Column::BranchId.eq(ctx.branch_id)),
            );

        if let Some(status) = query.status {
            finder = finder.filter(vendor::Column::Status.eq(status));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            finder = finder.filter(
                Condition::any()
                    .add(vendor::Column::Name.contains(needle))
                    .add(vendor::Column::NameAr.contains(needle))
                    .add(vendor::Column::Code.contains(needle)),
            );
        }

        Ok(finder
            .order_by_asc(vendor::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn create_vendor(
        &self,
        ctx: &TenantContext,
        command: CreateVendorCommand,
    ) -> Result<vendor::Model, ServiceError> {
        command.validate()?;
        if command.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "name must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let model = vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(ctx.business_id),
            branch_id: Set(command.branch_id),
            name: Set(command.name.trim().to_string()),
            name_ar: Set(command.name_ar),
            code: Set(command.code),
            contact_name: Set(command.contact_name),
            email: Set(command.email),
            phone: Set(command.phone),
            country: Set(command.country),
            tax_number: Set(command.tax_number),
            payment_terms: Set(command.payment_terms.unwrap_or(30)),
            status: Set(VendorStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;

        info!(vendor_id = %model.id, "Vendor created");
        self.event_sender.publish(Event::VendorCreated(model.id)).await;

        Ok(model)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_vendor(
        &self,
        ctx: &TenantContext,
        vendor_id: Uuid,
    ) -> Result<vendor::Model, ServiceError> {
        self.find_owned(ctx, vendor_id).await
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn update_vendor(
        &self,
        ctx: &TenantContext,
        vendor_id: Uuid,
        command: UpdateVendorCommand,
    ) -> Result<vendor::Model, ServiceError> {
        let existing = self.find_owned(ctx, vendor_id).await?;

        if let Some(name) = command.name.as_deref() {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be empty".into(),
                ));
            }
        }
        if let Some(terms) = command.payment_terms {
            if terms < 0 {
                return Err(ServiceError::ValidationError(
                    "payment_terms must not be negative".into(),
                ));
            }
        }

        let mut active: vendor::ActiveModel = existing.into();
        if let Some(name) = command.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(name_ar) = command.name_ar {
            active.name_ar = Set(Some(name_ar));
        }
        if let Some(code) = command.code {
            active.code = Set(Some(code));
        }
        if let Some(contact_name) = command.contact_name {
            active.contact_name = Set(Some(contact_name));
        }
        if let Some(email) = command.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = command.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(country) = command.country {
            active.country = Set(Some(country));
        }
        if let Some(tax_number) = command.tax_number {
            active.tax_number = Set(Some(tax_number));
        }
        if let Some(terms) = command.payment_terms {
            active.payment_terms = Set(terms);
        }
        if let Some(branch_id) = command.branch_id {
            active.branch_id = Set(branch_id);
        }
        if let Some(status) = command.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        self.event_sender.publish(Event::VendorUpdated(updated.id)).await;

        Ok(updated)
    }

    /// Deleting a vendor with open purchase orders is rejected; cancel or
    /// receive them first.
    #[instrument(skip(self, ctx))]
    pub async fn delete_vendor(
        &self,
        ctx: &TenantContext,
        vendor_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.find_owned(ctx, vendor_id).await?;

        let open_po = PurchaseOrder::find()
            .filter(purchase_order::Column::VendorId.eq(existing.id))
            .filter(
                purchase_order::Column::Status
                    .is_not_in([PurchaseOrderStatus::Received, PurchaseOrderStatus::Cancelled]),
            )
            .one(self.db.as_ref())
            .await?;
        if open_po.is_some() {
            return Err(ServiceError::Conflict(
                "Vendor has open purchase orders".into(),
            ));
        }

        Vendor::delete_by_id(existing.id).exec(self.db.as_ref()).await?;
        self.event_sender.publish(Event::VendorDeleted(existing.id)).await;

        Ok(())
    }

    async fn find_owned(
        &self,
        ctx: &TenantContext,
        vendor_id: Uuid,
    ) -> Result<vendor::Model, ServiceError> {
        Vendor::find_by_id(vendor_id)
            .filter(vendor::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))
    }
}
