//! Storage ports consumed by the enforcement core
//!
//! Every tenant-scoped call takes the tenant id explicitly. Implementations must filter on
//! it rather than trusting the caller to have loaded the right row.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tenantry_core::models::{
    NewProject, NewTask, NewTenant, NewUser, Project, ProjectUpdate, ResourceKind, Role, Task,
    TaskUpdate, Tenant, TenantSettingsUpdate, TenantStatus, User,
};
use tenantry_core::AppError;
use uuid::Uuid;

/// Result of a conditional counter increment. Both arms carry the observed count and the
/// limit in force at the time of the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Incremented { current: i64, limit: i64 },
    LimitReached { current: i64, limit: i64 },
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError>;

    /// Insert a tenant together with zeroed resource counters.
    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, AppError>;

    /// Apply the fields present in `update`. Returns `None` when the tenant does not exist.
    async fn update_tenant_settings(
        &self,
        id: Uuid,
        update: &TenantSettingsUpdate,
    ) -> Result<Option<Tenant>, AppError>;

    async fn set_tenant_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Lookup by normalized email; emails are globally unique.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError>;

    async fn update_user_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError>;

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn count_resources(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<i64, AppError>;

    /// Atomically increment the counter only while it is below the tenant's limit.
    async fn increment_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<CounterUpdate, AppError>;

    /// Decrement the counter, never below zero.
    async fn decrement_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: NewProject) -> Result<Project, AppError>;

    async fn get_project(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Project>, AppError>;

    async fn list_projects(&self, tenant_id: Uuid) -> Result<Vec<Project>, AppError>;

    async fn update_project(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Option<Project>, AppError>;

    /// Delete a project and its tasks.
    async fn delete_project(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Owning tenant of a project, unscoped. Only used to check task linkage.
    async fn project_tenant(&self, id: Uuid) -> Result<Option<Uuid>, AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError>;

    async fn get_task(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn list_tasks(
        &self,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Task>, AppError>;

    async fn update_task(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError>;

    async fn delete_task(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

/// Everything the gateway needs from persistence.
pub trait Store: TenantStore + UserStore + QuotaStore + ProjectStore + TaskStore {}

impl<T> Store for T where T: TenantStore + UserStore + QuotaStore + ProjectStore + TaskStore {}
