//! Tenant registration and settings

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::users::UserResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tenantry_access::{AccessRequest, Action, NewTenantInput};
use tenantry_core::models::{
    ResourceUsage, SubscriptionTier, Tenant, TenantSettingsUpdate, TenantStatus,
};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTenantRequest {
    pub name: String,
    pub subdomain: String,
    pub subscription_tier: SubscriptionTier,
    /// Overrides the tier's user limit.
    pub max_users: Option<i64>,
    /// Overrides the tier's project limit.
    pub max_projects: Option<i64>,
    pub admin_email: String,
    pub admin_password: String,
}

impl From<CreateTenantRequest> for NewTenantInput {
    fn from(request: CreateTenantRequest) -> Self {
        NewTenantInput {
            name: request.name,
            subdomain: request.subdomain,
            subscription_tier: request.subscription_tier,
            max_users: request.max_users,
            max_projects: request.max_projects,
            admin_email: request.admin_email,
            admin_password: request.admin_password,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTenantResponse {
    pub tenant: Tenant,
    pub admin: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
}

impl From<UpdateTenantRequest> for TenantSettingsUpdate {
    fn from(request: UpdateTenantRequest) -> Self {
        TenantSettingsUpdate {
            name: request.name,
            subscription_tier: request.subscription_tier,
            max_users: request.max_users,
            max_projects: request.max_projects,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTenantStatusRequest {
    pub status: TenantStatus,
}

/// List all tenants (super admin only)
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "All tenants", body = Vec<Tenant>),
        (status = 403, description = "Not a super admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
) -> Result<Json<Vec<Tenant>>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::system(Action::TenantList))
        .await?;
    Ok(Json(grant.list_tenants().await?))
}

/// Register a tenant together with its first tenant admin (super admin only)
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    tag = "tenants",
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant created", body = CreateTenantResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not a super admin", body = ErrorResponse),
        (status = 409, description = "Subdomain or email already taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, ctx, request), fields(subdomain = %request.subdomain))]
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    ValidatedJson(request): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::system(Action::TenantCreate))
        .await?;
    let (tenant, admin) = grant.create_tenant(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTenantResponse {
            tenant,
            admin: admin.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 403, description = "Tenant outside the caller's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Tenant>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::TenantRead, tenant_id))
        .await?;
    Ok(Json(grant.tenant().await?))
}

/// Change name, tier or limits
#[utoipa::path(
    patch,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Updated tenant", body = Tenant),
        (status = 400, description = "Invalid settings", body = ErrorResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_tenant(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateTenantRequest>,
) -> Result<Json<Tenant>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(
            &ctx,
            AccessRequest::tenant(Action::TenantUpdateSettings, tenant_id),
        )
        .await?;
    Ok(Json(grant.update_tenant_settings(request.into()).await?))
}

/// Activate or suspend a tenant (super admin only)
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/status",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = SetTenantStatusRequest,
    responses(
        (status = 200, description = "Updated tenant", body = Tenant),
        (status = 403, description = "Not a super admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_tenant_status(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SetTenantStatusRequest>,
) -> Result<Json<Tenant>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::TenantSetStatus, tenant_id))
        .await?;
    Ok(Json(grant.set_tenant_status(request.status).await?))
}

/// Current counts and limits per quota-counted resource
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/usage",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Usage per resource kind", body = Vec<ResourceUsage>),
        (status = 403, description = "Tenant outside the caller's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<ResourceUsage>>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::TenantRead, tenant_id))
        .await?;
    Ok(Json(grant.usage().await?))
}
