use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::needs_ownership;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tenantry_access::{AccessRequest, Action, NewTaskInput};
use tenantry_core::models::{Task, TaskStatus, TaskUpdate};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    /// Absent leaves the assignee unchanged; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub assignee_id: Option<Option<Uuid>>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/projects/{project_id}/tasks",
    tag = "tasks",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Tasks of the project", body = Vec<Task>),
        (status = 403, description = "Tenant outside the caller's scope", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Task>>, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::TaskRead, tenant_id))
        .await?;
    Ok(Json(grant.tasks(Some(project_id)).await?))
}

/// Create a task in a project. Standard users must be assigned to the project.
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/projects/{project_id}/tasks",
    tag = "tasks",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "Not permitted, or the project belongs to another tenant", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut access = AccessRequest::tenant(Action::TaskCreate, tenant_id);
    if needs_ownership(&ctx, Action::TaskCreate) {
        let project = state
            .gateway
            .authorize(&ctx, AccessRequest::tenant(Action::ProjectRead, tenant_id))
            .await?
            .project(project_id)
            .await?;
        access = access.owned(project.is_assigned(ctx.user_id()));
    }

    let grant = state.gateway.authorize(&ctx, access).await?;
    let task = grant
        .create_task(NewTaskInput {
            project_id,
            title: request.title,
            status: request.status,
            assignee_id: request.assignee_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tenants/{tenant_id}/tasks/{task_id}",
    tag = "tasks",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 403, description = "Not the creator or the assignee", body = ErrorResponse),
        (status = 404, description = "Task not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, task_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateTaskRequest>,
) -> Result<Json<Task>, HttpAppError> {
    let mut access = AccessRequest::tenant(Action::TaskUpdate, tenant_id);
    if needs_ownership(&ctx, Action::TaskUpdate) {
        let task = state
            .gateway
            .authorize(&ctx, AccessRequest::tenant(Action::TaskRead, tenant_id))
            .await?
            .task(task_id)
            .await?;
        access = access.owned(task.is_owned_by(ctx.user_id()));
    }

    let grant = state.gateway.authorize(&ctx, access).await?;
    let task = grant
        .update_task(
            task_id,
            TaskUpdate {
                title: request.title,
                status: request.status,
                assignee_id: request.assignee_id,
            },
        )
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/tasks/{task_id}",
    tag = "tasks",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "Task not found in this tenant", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthContext(ctx): AuthContext,
    Path((tenant_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let grant = state
        .gateway
        .authorize(&ctx, AccessRequest::tenant(Action::TaskDelete, tenant_id))
        .await?;
    grant.delete_task(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
