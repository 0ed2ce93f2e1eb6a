//! PostgreSQL implementation of the storage ports

use async_trait::async_trait;
use sqlx::PgPool;
use tenantry_access::{CounterUpdate, ProjectStore, QuotaStore, TaskStore, TenantStore, UserStore};
use tenantry_core::models::{
    NewProject, NewTask, NewTenant, NewUser, Project, ProjectUpdate, ResourceKind, Role, Task,
    TaskUpdate, Tenant, TenantSettingsUpdate, TenantStatus, User,
};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::{
    ProjectRepository, QuotaRepository, TaskRepository, TenantRepository, UserRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tenants: TenantRepository,
    users: UserRepository,
    quota: QuotaRepository,
    projects: ProjectRepository,
    tasks: TaskRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tenants: TenantRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            quota: QuotaRepository::new(pool.clone()),
            projects: ProjectRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        self.tenants.get_tenant(id).await
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        self.tenants.list_tenants().await
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, AppError> {
        self.tenants.create_tenant(tenant).await
    }

    async fn update_tenant_settings(
        &self,
        id: Uuid,
        update: &TenantSettingsUpdate,
    ) -> Result<Option<Tenant>, AppError> {
        self.tenants.update_tenant_settings(id, update).await
    }

    async fn set_tenant_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError> {
        self.tenants.set_tenant_status(id, status).await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.users.get_user(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users.get_user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.users.create_user(user).await
    }

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        self.users.list_users(tenant_id).await
    }

    async fn update_user_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError> {
        self.users.update_user_role(tenant_id, user_id, role).await
    }

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        self.users.delete_user(tenant_id, user_id).await
    }
}

#[async_trait]
impl QuotaStore for PgStore {
    async fn count_resources(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<i64, AppError> {
        self.quota.count_resources(tenant_id, kind).await
    }

    async fn increment_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<CounterUpdate, AppError> {
        self.quota.increment_resource_count(tenant_id, kind).await
    }

    async fn decrement_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        self.quota.decrement_resource_count(tenant_id, kind).await
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, AppError> {
        self.projects.create_project(project).await
    }

    async fn get_project(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Project>, AppError> {
        self.projects.get_project(tenant_id, id).await
    }

    async fn list_projects(&self, tenant_id: Uuid) -> Result<Vec<Project>, AppError> {
        self.projects.list_projects(tenant_id).await
    }

    async fn update_project(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Option<Project>, AppError> {
        self.projects.update_project(tenant_id, id, update).await
    }

    async fn delete_project(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        self.projects.delete_project(tenant_id, id).await
    }

    async fn project_tenant(&self, id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.projects.project_tenant(id).await
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        self.tasks.create_task(task).await
    }

    async fn get_task(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        self.tasks.get_task(tenant_id, id).await
    }

    async fn list_tasks(
        &self,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Task>, AppError> {
        self.tasks.list_tasks(tenant_id, project_id).await
    }

    async fn update_task(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        self.tasks.update_task(tenant_id, id, update).await
    }

    async fn delete_task(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        self.tasks.delete_task(tenant_id, id).await
    }
}
