use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::business_user::{self, UserRole, UserStatus},
    errors::ServiceError,
};

/// Header carrying the acting branch. Branch-scoped operations require it;
/// the context is an explicit parameter on every service call, never
/// ambient state.
pub const BRANCH_HEADER: &str = "x-branch-id";
/// Header an owner uses to act on one of their other businesses.
pub const BUSINESS_HEADER: &str = "x-business-id";

/// Token configuration for the HS256 signer.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        issuer: String,
        audience: String,
        token_ttl: Duration,
    ) -> Result<Self, ServiceError> {
        if jwt_secret.len() < 32 {
            return Err(ServiceError::ValidationError(
                "JWT secret must be at least 32 characters".into(),
            ));
        }
        Ok(Self {
            jwt_secret,
            issuer,
            audience,
            token_ttl,
        })
    }
}

/// JWT claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub business_id: Uuid,
    pub role: UserRole,
    pub username: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies access tokens, and checks credentials against the
/// business_users table.
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: business_user::Model,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| ServiceError::HashError(e.to_string()))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn issue_token(&self, user: &business_user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            business_id: user.business_id,
            role: user.role,
            username: user.username.clone(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now
                + chrono::Duration::from_std(self.config.token_ttl)
                    .unwrap_or_else(|_| chrono::Duration::seconds(3600)))
            .timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.config.token_ttl.as_secs()
    }

    /// Checks credentials and returns the active user row.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<business_user::Model, ServiceError> {
        let user = business_user::Entity::find()
            .filter(business_user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".into()))?;

        if !Self::verify_password(password, &user.password_hash)? {
            warn!(username = %username, "Login failed: bad password");
            return Err(ServiceError::Unauthorized("Invalid credentials".into()));
        }
        if user.status != UserStatus::Active {
            return Err(ServiceError::Forbidden("Account is inactive".into()));
        }

        Ok(user)
    }
}

/// POST /auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    payload.validate()?;

    let user = auth.authenticate(&payload.username, &payload.password).await?;
    let token = auth.issue_token(&user)?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_in: auth.token_ttl_secs(),
        user,
    }))
}

pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new().route("/login", post(login))
}

/// The verified principal of the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub role: UserRole,
    pub username: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            business_id: claims.business_id,
            role: claims.role,
            username: claims.username,
        }
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| ServiceError::InternalError("AuthService not installed".into()))?;

        let token = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;

        let claims = auth_service.verify_token(token)?;
        Ok(claims.into())
    }
}

/// The tenant scope a request acts in: who, for which business, at which
/// branch. Passed explicitly into every branch-scoped service call.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub branch_id: Uuid,
    pub role: UserRole,
}

impl TenantContext {
    pub fn acts_for_branch(&self, branch_id: Uuid) -> bool {
        self.branch_id == branch_id
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        let branch_id = parts
            .headers
            .get(BRANCH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("{} header is required", BRANCH_HEADER))
            })
            .and_then(|raw| {
                Uuid::parse_str(raw).map_err(|_| {
                    ServiceError::ValidationError(format!("{} must be a UUID", BRANCH_HEADER))
                })
            })?;

        // Owners may act on another business they own; everyone else is
        // pinned to the business in their token.
        let business_id = match parts
            .headers
            .get(BUSINESS_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(raw) if user.role == UserRole::Owner => Uuid::parse_str(raw).map_err(|_| {
                ServiceError::ValidationError(format!("{} must be a UUID", BUSINESS_HEADER))
            })?,
            _ => user.business_id,
        };

        Ok(TenantContext {
            user_id: user.user_id,
            business_id,
            branch_id,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> business_user::Model {
        business_user::Model {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            username: "amal".into(),
            password_hash: String::new(),
            role: UserRole::Manager,
            status: UserStatus::Active,
            display_name: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service() -> AuthService {
        let config = AuthConfig::new(
            "a".repeat(64),
            "silo-api".into(),
            "silo-clients".into(),
            Duration::from_secs(3600),
        )
        .unwrap();
        // The db handle is unused by the token paths under test
        let db = Arc::new(DbPool::Disconnected);
        AuthService::new(config, db)
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let svc = service();
        let user = test_user();
        let token = svc.issue_token(&user).unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.business_id, user.business_id);
        assert_eq!(claims.role, UserRole::Manager);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let user = test_user();
        let mut token = svc.issue_token(&user).unwrap();
        token.push('x');
        assert!(svc.verify_token(&token).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = AuthService::hash_password("s3cret!").unwrap();
        assert!(AuthService::verify_password("s3cret!", &hash).unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(AuthConfig::new(
            "short".into(),
            "iss".into(),
            "aud".into(),
            Duration::from_secs(60)
        )
        .is_err());
    }
}
