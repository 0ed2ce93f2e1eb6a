//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::models;
use crate::error;
use crate::handlers;
use tenantry_core::models as core_models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenantry API",
        version = "0.1.0",
        description = "Multi-tenant access control: session tokens, tenant isolation, role capabilities and per-tenant quotas. All endpoints are versioned under /api/v1/."
    ),
    modifiers(&BearerAuth),
    paths(
        // Auth
        handlers::auth::login,
        handlers::auth::me,
        // Tenants
        handlers::tenants::list_tenants,
        handlers::tenants::create_tenant,
        handlers::tenants::get_tenant,
        handlers::tenants::update_tenant,
        handlers::tenants::set_tenant_status,
        handlers::tenants::get_usage,
        // Users
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::update_user_role,
        handlers::users::delete_user,
        // Projects
        handlers::projects::list_projects,
        handlers::projects::create_project,
        handlers::projects::get_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        // Tasks
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
    ),
    components(
        schemas(
            // Core models
            core_models::Tenant,
            core_models::TenantStatus,
            core_models::SubscriptionTier,
            core_models::ResourceKind,
            core_models::ResourceUsage,
            core_models::Role,
            core_models::Project,
            core_models::Task,
            core_models::TaskStatus,
            // Auth
            models::LoginRequest,
            models::LoginResponse,
            models::MeResponse,
            // Requests and responses
            handlers::tenants::CreateTenantRequest,
            handlers::tenants::CreateTenantResponse,
            handlers::tenants::UpdateTenantRequest,
            handlers::tenants::SetTenantStatusRequest,
            handlers::users::UserResponse,
            handlers::users::CreateUserRequest,
            handlers::users::UpdateRoleRequest,
            handlers::projects::CreateProjectRequest,
            handlers::projects::UpdateProjectRequest,
            handlers::tasks::CreateTaskRequest,
            handlers::tasks::UpdateTaskRequest,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login and token introspection"),
        (name = "tenants", description = "Tenant registration, settings, status and usage"),
        (name = "users", description = "Users and roles within a tenant"),
        (name = "projects", description = "Tenant-scoped projects"),
        (name = "tasks", description = "Tasks within projects")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_versioned_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/auth/login"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/v1/tenants/{tenant_id}/projects/{project_id}/tasks"));
        assert!(spec
            .paths
            .paths
            .keys()
            .all(|path| path.starts_with("/api/v1/")));
    }
}
