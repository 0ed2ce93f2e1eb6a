//! Tenant user management

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tenantry_access::{AccessRequest, Action, NewUserInput};
use tenantry_core::models::{Role, User};
use utoipa::ToSchema;
use uuid::Uuid;

/// User as returned by the API (never includes the password hash).
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/users",
    tag = "users",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Users of the tenant", body = Vec<UserResponse>),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<UserResponse>>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::UserRead, tenant_id))
        .await?;
    let users = grant.users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user in the tenant. Counts against the tenant's user quota.
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/users",
    tag = "users",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Not permitted or user quota exhausted", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %request.role))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::UserCreate, tenant_id))
        .await?;
    let user = grant
        .create_user(NewUserInput {
            email: request.email,
            password: request.password,
            role: request.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/users/{user_id}/role",
    tag = "users",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "User not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, user_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::UserUpdateRole, tenant_id))
        .await?;
    let user = grant.update_user_role(user_id, request.role).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/users/{user_id}",
    tag = "users",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "User not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::UserDelete, tenant_id))
        .await?;
    grant.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
