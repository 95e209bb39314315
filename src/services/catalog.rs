use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
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
    entities::item::{self, Entity as Item, ItemStatus},
    entities::item_component::{self, Entity as ItemComponent},
    errors::ServiceError,
    events::{Event, EventSender},
};

use super::stock::unwrap_txn_err;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemListQuery {
    pub category: Option<String>,
    pub item_type: Option<String>,
    pub search: Option<String>,
    pub status: Option<ItemStatus>,
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

/// Item payload with the server-computed effective price attached.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: item::Model,
    pub effective_price: Decimal,
}

impl From<item::Model> for ItemView {
    fn from(item: item::Model) -> Self {
        let effective_price = item.effective_price();
        Self {
            item,
            effective_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentView {
    pub component_item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    /// Consumed per single production batch.
    pub quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompositeItemView {
    #[serde(flatten)]
    pub item: ItemView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentView>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemCommand {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub name_ar: Option<String>,
    pub category: Option<String>,
    pub item_type: Option<String>,
    #[validate(length(min = 1, message = "unit must not be empty"))]
    pub unit: String,
    pub storage_unit: Option<String>,
    #[validate(length(min = 1, message = "sku must not be empty"))]
    pub sku: String,
    pub cost_per_unit: Option<Decimal>,
    pub default_price: Option<Decimal>,
    pub business_price: Option<Decimal>,
    #[serde(default)]
    pub is_composite: bool,
    pub batch_quantity: Option<Decimal>,
    pub batch_unit: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemCommand {
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub category: Option<String>,
    pub item_type: Option<String>,
    pub unit: Option<String>,
    pub storage_unit: Option<String>,
    pub default_price: Option<Decimal>,
    /// Absent leaves the override untouched; explicit null clears it back
    /// to the default price.
    #[serde(default)]
    pub business_price: Option<Option<Decimal>>,
    pub batch_quantity: Option<Decimal>,
    pub batch_unit: Option<String>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ComponentInput {
    pub component_item_id: Uuid,
    pub quantity: Decimal,
}

/// Catalog CRUD plus composite recipe management.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_items(
        &self,
        ctx: &TenantContext,
        query: &ItemListQuery,
    ) -> Result<(Vec<ItemView>, u64), ServiceError> {
        let mut finder = Item::find().filter(item::Column::BusinessId.eq(ctx.business_id));

        if let Some(category) = query.category.as_deref() {
            finder = finder.filter(item::Column::Category.eq(category));
        }
        if let Some(item_type) = query.item_type.as_deref() {
            finder = finder.filter(item::Column::ItemType.eq(item_type));
        }
        if let Some(status) = query.status {
            finder = finder.filter(item::Column::Status.eq(status));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim();
            finder = finder.filter(
                Condition::any()
                    .add(item::Column::Name.contains(needle))
                    .add(item::Column::NameAr.contains(needle))
                    .add(item::Column::Sku.contains(needle)),
            );
        }

        let paginator = finder
            .order_by_asc(item::Column::Name)
            .paginate(self.db.as_ref(), query.limit.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(ItemView::from).collect(), total))
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn create_item(
        &self,
        ctx: &TenantContext,
        command: CreateItemCommand,
    ) -> Result<ItemView, ServiceError> {
        command.validate()?;

        if command.is_composite && command.batch_quantity.map_or(true, |q| q <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "composite items require a positive batch_quantity".into(),
            ));
        }

        let duplicate = Item::find()
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .filter(item::Column::Sku.eq(command.sku.clone()))
            .one(self.db.as_ref())
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} already exists",
                command.sku
            )));
        }

        let now = Utc::now();
        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(ctx.business_id),
            name: Set(command.name),
            name_ar: Set(command.name_ar),
            category: Set(command.category),
            item_type: Set(command.item_type),
            unit: Set(command.unit),
            storage_unit: Set(command.storage_unit),
            sku: Set(command.sku),
            cost_per_unit: Set(command.cost_per_unit.unwrap_or(Decimal::ZERO)),
            default_price: Set(command.default_price.unwrap_or(Decimal::ZERO)),
            business_price: Set(command.business_price),
            is_composite: Set(command.is_composite),
            batch_quantity: Set(command.batch_quantity),
            batch_unit: Set(command.batch_unit),
            status: Set(ItemStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;

        info!(item_id = %model.id, sku = %model.sku, "Item created");
        self.event_sender.publish(Event::ItemCreated(model.id)).await;

        Ok(model.into())
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_item(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<ItemView, ServiceError> {
        self.find_owned(ctx, item_id).await.map(ItemView::from)
    }

    #[instrument(skip(self, ctx, command))]
    pub async fn update_item(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        command: UpdateItemCommand,
    ) -> Result<ItemView, ServiceError> {
        let existing = self.find_owned(ctx, item_id).await?;

        if let Some(name) = command.name.as_deref() {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be empty".into(),
                ));
            }
        }

        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = command.name {
            active.name = Set(name);
        }
        if let Some(name_ar) = command.name_ar {
            active.name_ar = Set(Some(name_ar));
        }
        if let Some(category) = command.category {
            active.category = Set(Some(category));
        }
        if let Some(item_type) = command.item_type {
            active.item_type = Set(Some(item_type));
        }
        if let Some(unit) = command.unit {
            active.unit = Set(unit);
        }
        if let Some(storage_unit) = command.storage_unit {
            active.storage_unit = Set(Some(storage_unit));
        }
        if let Some(default_price) = command.default_price {
            active.default_price = Set(default_price);
        }
        if let Some(business_price) = command.business_price {
            active.business_price = Set(business_price);
        }
        if let Some(batch_quantity) = command.batch_quantity {
            active.batch_quantity = Set(Some(batch_quantity));
        }
        if let Some(batch_unit) = command.batch_unit {
            active.batch_unit = Set(Some(batch_unit));
        }
        if let Some(status) = command.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        self.event_sender.publish(Event::ItemUpdated(updated.id)).await;

        Ok(updated.into())
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_item(&self, ctx: &TenantContext, item_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_owned(ctx, item_id).await?;

        let used_as_component = ItemComponent::find()
            .filter(item_component::Column::ComponentItemId.eq(existing.id))
            .one(self.db.as_ref())
            .await?;
        if used_as_component.is_some() {
            return Err(ServiceError::Conflict(
                "Item is a component of a composite item".into(),
            ));
        }

        let id = existing.id;
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    ItemComponent::delete_many()
                        .filter(item_component::Column::CompositeItemId.eq(id))
                        .exec(txn)
                        .await?;
                    Item::delete_by_id(id).exec(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.event_sender.publish(Event::ItemDeleted(id)).await;
        Ok(())
    }

    /// Composite items, optionally with their component lists expanded.
    /// Expansion is batched: one query for the page of items, one for all
    /// their components, one for the component item fields.
    #[instrument(skip(self, ctx))]
    pub async fn list_composite_items(
        &self,
        ctx: &TenantContext,
        expand_components: bool,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<CompositeItemView>, u64), ServiceError> {
        let paginator = Item::find()
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .filter(item::Column::IsComposite.eq(true))
            .order_by_asc(item::Column::Name)
            .paginate(self.db.as_ref(), limit.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        if !expand_components {
            let views = items
                .into_iter()
                .map(|i| CompositeItemView {
                    item: i.into(),
                    components: None,
                })
                .collect();
            return Ok((views, total));
        }

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut components = self.load_components(&ids).await?;

        let views = items
            .into_iter()
            .map(|i| {
                let components = components.remove(&i.id).unwrap_or_default();
                CompositeItemView {
                    item: i.into(),
                    components: Some(components),
                }
            })
            .collect();

        Ok((views, total))
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_composite_item(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<CompositeItemView, ServiceError> {
        let item = self.find_owned(ctx, item_id).await?;
        if !item.is_composite {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is not a composite item",
                item_id
            )));
        }

        let components = self
            .load_components(&[item.id])
            .await?
            .remove(&item.id)
            .unwrap_or_default();

        Ok(CompositeItemView {
            item: item.into(),
            components: Some(components),
        })
    }

    /// Replaces a composite item's recipe.
    #[instrument(skip(self, ctx, components))]
    pub async fn replace_components(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        components: Vec<ComponentInput>,
    ) -> Result<CompositeItemView, ServiceError> {
        let item = self.find_owned(ctx, item_id).await?;
        if !item.is_composite {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is not a composite item",
                item_id
            )));
        }
        if components.is_empty() {
            return Err(ServiceError::ValidationError(
                "a composite item requires at least one component".into(),
            ));
        }

        for component in &components {
            if component.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "component quantities must be positive".into(),
                ));
            }
            if component.component_item_id == item.id {
                return Err(ServiceError::ValidationError(
                    "a composite item cannot contain itself".into(),
                ));
            }
            let exists = Item::find_by_id(component.component_item_id)
                .filter(item::Column::BusinessId.eq(ctx.business_id))
                .one(self.db.as_ref())
                .await?;
            match exists {
                None => {
                    return Err(ServiceError::NotFound(format!(
                        "Component item {} not found",
                        component.component_item_id
                    )))
                }
                Some(c) if c.is_composite => {
                    return Err(ServiceError::ValidationError(
                        "composite items cannot nest other composite items".into(),
                    ))
                }
                Some(_) => {}
            }
        }

        let composite_id = item.id;
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    ItemComponent::delete_many()
                        .filter(item_component::Column::CompositeItemId.eq(composite_id))
                        .exec(txn)
                        .await?;
                    for component in components {
                        item_component::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            composite_item_id: Set(composite_id),
                            component_item_id: Set(component.component_item_id),
                            quantity: Set(component.quantity),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        self.event_sender.publish(Event::ItemUpdated(composite_id)).await;
        self.get_composite_item(ctx, composite_id).await
    }

    async fn find_owned(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<item::Model, ServiceError> {
        Item::find_by_id(item_id)
            .filter(item::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    async fn load_components(
        &self,
        composite_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<ComponentView>>, ServiceError> {
        if composite_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ItemComponent::find()
            .filter(item_component::Column::CompositeItemId.is_in(composite_ids.to_vec()))
            .all(self.db.as_ref())
            .await?;

        let component_ids: Vec<Uuid> = rows.iter().map(|r| r.component_item_id).collect();
        let component_items: HashMap<Uuid, item::Model> = Item::find()
            .filter(item::Column::Id.is_in(component_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let mut grouped: HashMap<Uuid, Vec<ComponentView>> = HashMap::new();
        for row in rows {
            if let Some(component) = component_items.get(&row.component_item_id) {
                grouped
                    .entry(row.composite_item_id)
                    .or_default()
                    .push(ComponentView {
                        component_item_id: component.id,
                        name: component.name.clone(),
                        sku: component.sku.clone(),
                        unit: component.unit.clone(),
                        quantity: row.quantity,
                    });
            }
        }

        Ok(grouped)
    }
}
