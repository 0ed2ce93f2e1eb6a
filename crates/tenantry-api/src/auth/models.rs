use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantry_access::{IssuedToken, RequestContext};
use tenantry_core::models::Role;
use tenantry_core::AppError;
use utoipa::ToSchema;
use uuid::Uuid;

/// Resolved request context, inserted by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthContext(pub RequestContext);

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthenticated(
                    "route is missing the auth middleware".to_string(),
                ))
            })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user_id: issued.claims.sub,
            tenant_id: issued.claims.tenant_id,
            role: issued.claims.role,
        }
    }
}

/// Identity behind the presented token.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}

impl From<&RequestContext> for MeResponse {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            user_id: ctx.user_id(),
            tenant_id: ctx.tenant_id(),
            role: ctx.role(),
        }
    }
}
