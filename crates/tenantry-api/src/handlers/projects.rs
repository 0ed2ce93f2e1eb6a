//! Projects
//!
//! Standard users may only create projects they are assigned to and only update projects
//! they own or are assigned to, so those two handlers establish ownership before asking
//! the gateway for the write grant.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::needs_ownership;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use tenantry_access::{AccessRequest, Action, NewProjectInput};
use tenantry_core::models::{Project, ProjectUpdate};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/projects",
    tag = "projects",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Projects of the tenant", body = Vec<Project>),
        (status = 403, description = "Tenant outside the caller's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Project>>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::ProjectRead, tenant_id))
        .await?;
    Ok(Json(grant.projects().await?))
}

/// Create a project owned by the caller. Counts against the tenant's project quota.
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/projects",
    tag = "projects",
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 403, description = "Not permitted or project quota exhausted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path(tenant_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let creator_assigned = request.assignee_ids.contains(&ctx.user_id());
    let grant = state
        .gateway
        .authorize(
            &ctx,
            AccessRequest::tenant(Action::ProjectCreate, tenant_id).owned(creator_assigned),
        )
        .await?;

    let project = grant
        .create_project(NewProjectInput {
            name: request.name,
            description: request.description,
            assignee_ids: request.assignee_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/projects/{project_id}",
    tag = "projects",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 404, description = "Project not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Project>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::ProjectRead, tenant_id))
        .await?;
    Ok(Json(grant.project(project_id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tenants/{tenant_id}/projects/{project_id}",
    tag = "projects",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated project", body = Project),
        (status = 403, description = "Not the owner or an assignee", body = ErrorResponse),
        (status = 404, description = "Project not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateProjectRequest>,
) -> Result<Json<Project>, HttpAppError> {
    let mut access = AccessRequest::tenant(Action::ProjectUpdate, tenant_id);
    if needs_ownership(&ctx, Action::ProjectUpdate) {
        let project = state
            .gateway
            .authorize(&ctx, AccessRequest::tenant(Action::ProjectRead, tenant_id))
            .await?
            .project(project_id)
            .await?;
        access = access.owned(project.is_assigned(ctx.user_id()));
    }

    let grant = state.gateway.authorize(&ctx, access).await?;
    let project = grant
        .update_project(
            project_id,
            ProjectUpdate {
                name: request.name,
                description: request.description,
                assignee_ids: request.assignee_ids,
            },
        )
        .await?;
    Ok(Json(project))
}

/// Delete a project and its tasks. Frees one unit of project quota.
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/projects/{project_id}",
    tag = "projects",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "Project not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::ProjectDelete, tenant_id))
        .await?;
    grant.delete_project(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
