use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthService, TenantContext},
    db::DbPool,
    entities::{
        branch::{self, Entity as Branch},
        business::{self, Entity as Business},
        business_user::{self, Entity as BusinessUser, UserRole, UserStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserCommand {
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub username: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserCommand {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Creation response; the only place the initial password is ever shown.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUser {
    pub user: business_user::Model,
    pub initial_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetPassword {
    pub user_id: Uuid,
    pub new_password: String,
}

/// Workspace user management: seat cap, owner immutability, default
/// password issue and reset.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    default_password: String,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, default_password: String) -> Self {
        Self {
            db,
            event_sender,
            default_password,
        }
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<business_user::Model>, ServiceError> {
        Ok(BusinessUser::find()
            .filter(business_user::Column::BusinessId.eq(ctx.business_id))
            .order_by_asc(business_user::Column::Username)
            .all(self.db.as_ref())
            .await?)
    }

    /// Creates a user with the configured default password. The client's
    /// disabled "Add" button is advisory; the seat cap is enforced here.
    #[instrument(skip(self, ctx, command))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        command: CreateUserCommand,
    ) -> Result<CreatedUser, ServiceError> {
        command.validate()?;

        if !ctx.role.can_manage_users() {
            return Err(ServiceError::Forbidden(
                "Only owners and managers may manage users".into(),
            ));
        }
        if command.role == UserRole::Owner {
            return Err(ServiceError::ValidationError(
                "a business has exactly one owner".into(),
            ));
        }

        let business = Business::find_by_id(ctx.business_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Business {} not found", ctx.business_id))
            })?;

        let current = BusinessUser::find()
            .filter(business_user::Column::BusinessId.eq(ctx.business_id))
            .count(self.db.as_ref())
            .await?;
        if current >= business.max_users as u64 {
            return Err(ServiceError::Conflict(format!(
                "user limit of {} reached",
                business.max_users
            )));
        }

        // Usernames are the login key, so they are globally unique.
        let taken = BusinessUser::find()
            .filter(business_user::Column::Username.eq(command.username.clone()))
            .one(self.db.as_ref())
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "username {} is already taken",
                command.username
            )));
        }

        let now = Utc::now();
        let user = business_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(ctx.business_id),
            username: Set(command.username),
            password_hash: Set(AuthService::hash_password(&self.default_password)?),
            role: Set(command.role),
            status: Set(UserStatus::Active),
            display_name: Set(command.display_name),
            email: Set(command.email),
            phone: Set(command.phone),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;

        info!(user_id = %user.id, "User created");
        self.event_sender.publish(Event::UserCreated(user.id)).await;

        Ok(CreatedUser {
            user,
            initial_password: self.default_password.clone(),
        })
    }

    /// Updates a user. The owner row is immutable for role and status no
    /// matter who asks; non-managers may only edit their own contact
    /// fields.
    #[instrument(skip(self, ctx, command))]
    pub async fn update(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        command: UpdateUserCommand,
    ) -> Result<business_user::Model, ServiceError> {
        let target = self.find_owned(ctx, user_id).await?;
        let self_edit = ctx.user_id == target.id;

        if !self_edit && !ctx.role.can_manage_users() {
            return Err(ServiceError::Forbidden(
                "Only owners and managers may manage users".into(),
            ));
        }
        if target.role == UserRole::Owner && (command.role.is_some() || command.status.is_some()) {
            return Err(ServiceError::Forbidden(
                "The owner's role and status cannot be changed".into(),
            ));
        }
        if command.role == Some(UserRole::Owner) {
            return Err(ServiceError::ValidationError(
                "a business has exactly one owner".into(),
            ));
        }
        if self_edit && !ctx.role.can_manage_users() && (command.role.is_some() || command.status.is_some())
        {
            return Err(ServiceError::Forbidden(
                "You may only edit your contact details".into(),
            ));
        }

        let mut active: business_user::ActiveModel = target.into();
        if let Some(role) = command.role {
            active.role = Set(role);
        }
        if let Some(status) = command.status {
            active.status = Set(status);
        }
        if let Some(display_name) = command.display_name {
            active.display_name = Set(Some(display_name));
        }
        if let Some(email) = command.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = command.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        self.event_sender.publish(Event::UserUpdated(updated.id)).await;

        Ok(updated)
    }

    /// Deleting the owner is forbidden for everyone, managers included.
    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &TenantContext, user_id: Uuid) -> Result<(), ServiceError> {
        let target = self.find_owned(ctx, user_id).await?;

        if !ctx.role.can_manage_users() {
            return Err(ServiceError::Forbidden(
                "Only owners and managers may manage users".into(),
            ));
        }
        if target.role == UserRole::Owner {
            return Err(ServiceError::Forbidden(
                "The owner account cannot be deleted".into(),
            ));
        }
        if target.id == ctx.user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own account".into(),
            ));
        }

        BusinessUser::delete_by_id(target.id).exec(self.db.as_ref()).await?;
        self.event_sender.publish(Event::UserDeleted(target.id)).await;

        Ok(())
    }

    /// Resets to the configured default password, returned exactly once.
    /// The owner's password may only be reset by the owner themselves.
    #[instrument(skip(self, ctx))]
    pub async fn reset_password(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
    ) -> Result<ResetPassword, ServiceError> {
        let target = self.find_owned(ctx, user_id).await?;
        let self_reset = ctx.user_id == target.id;

        if target.role == UserRole::Owner && !self_reset {
            return Err(ServiceError::Forbidden(
                "Only the owner may reset the owner's password".into(),
            ));
        }
        if !self_reset && !ctx.role.can_manage_users() {
            return Err(ServiceError::Forbidden(
                "Only owners and managers may manage users".into(),
            ));
        }

        let id = target.id;
        let mut active: business_user::ActiveModel = target.into();
        active.password_hash = Set(AuthService::hash_password(&self.default_password)?);
        active.updated_at = Set(Utc::now());
        active.update(self.db.as_ref()).await?;

        info!(user_id = %id, "Password reset");
        self.event_sender.publish(Event::UserPasswordReset(id)).await;

        Ok(ResetPassword {
            user_id: id,
            new_password: self.default_password.clone(),
        })
    }

    /// Businesses owned by the given username; feeds the workspace picker.
    #[instrument(skip(self))]
    pub async fn businesses_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<business::Model>, ServiceError> {
        let owner_rows = BusinessUser::find()
            .filter(business_user::Column::Username.eq(username))
            .filter(business_user::Column::Role.eq(UserRole::Owner))
            .all(self.db.as_ref())
            .await?;
        let ids: Vec<Uuid> = owner_rows.into_iter().map(|u| u.business_id).collect();

        Ok(Business::find()
            .filter(business::Column::Id.is_in(ids))
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn branches(&self, business_id: Uuid) -> Result<Vec<branch::Model>, ServiceError> {
        Ok(Branch::find()
            .filter(branch::Column::BusinessId.eq(business_id))
            .order_by_asc(branch::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    async fn find_owned(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
    ) -> Result<business_user::Model, ServiceError> {
        BusinessUser::find_by_id(user_id)
            .filter(business_user::Column::BusinessId.eq(ctx.business_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}
