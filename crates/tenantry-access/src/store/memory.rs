//! In-process store
//!
//! Backs the service when `STORE_BACKEND=memory` and every test that does not need
//! PostgreSQL. Entity maps sit behind one `RwLock`; resource counters are per
//! `(tenant, kind)` atomics updated with a compare-and-swap loop, so reservations for
//! different tenants never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tenantry_core::models::{
    NewProject, NewTask, NewTenant, NewUser, Project, ProjectUpdate, ResourceKind, Role, Task,
    TaskUpdate, Tenant, TenantSettingsUpdate, TenantStatus, User,
};
use tenantry_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CounterUpdate, ProjectStore, QuotaStore, TaskStore, TenantStore, UserStore};

#[derive(Default)]
struct MemoryState {
    tenants: HashMap<Uuid, Tenant>,
    subdomains: HashMap<String, Uuid>,
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    counters: HashMap<(Uuid, ResourceKind), Arc<AtomicI64>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter handle and current limit for `(tenant_id, kind)`.
    async fn counter(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(Arc<AtomicI64>, i64), AppError> {
        let state = self.state.read().await;
        let tenant = state
            .tenants
            .get(&tenant_id)
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))?;
        let counter = state
            .counters
            .get(&(tenant_id, kind))
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(format!("Missing {} counter for tenant {}", kind, tenant_id))
            })?;
        Ok((counter, tenant.limit_for(kind)))
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        Ok(self.state.read().await.tenants.get(&id).cloned())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        let state = self.state.read().await;
        let mut tenants: Vec<Tenant> = state.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(tenants)
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, AppError> {
        let mut state = self.state.write().await;
        if state.subdomains.contains_key(&tenant.subdomain) {
            return Err(AppError::Conflict(format!(
                "Subdomain '{}' is already taken",
                tenant.subdomain
            )));
        }

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: tenant.name,
            subdomain: tenant.subdomain,
            subscription_tier: tenant.subscription_tier,
            max_users: tenant.max_users,
            max_projects: tenant.max_projects,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };

        for kind in ResourceKind::ALL {
            state
                .counters
                .insert((tenant.id, kind), Arc::new(AtomicI64::new(0)));
        }
        state.subdomains.insert(tenant.subdomain.clone(), tenant.id);
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn update_tenant_settings(
        &self,
        id: Uuid,
        update: &TenantSettingsUpdate,
    ) -> Result<Option<Tenant>, AppError> {
        let mut state = self.state.write().await;
        let Some(tenant) = state.tenants.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            tenant.name = name.clone();
        }
        if let Some(tier) = update.subscription_tier {
            tenant.subscription_tier = tier;
        }
        if let Some(max_users) = update.max_users {
            tenant.max_users = max_users;
        }
        if let Some(max_projects) = update.max_projects {
            tenant.max_projects = max_projects;
        }
        tenant.updated_at = Utc::now();
        Ok(Some(tenant.clone()))
    }

    async fn set_tenant_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.tenants.get_mut(&id).map(|tenant| {
            tenant.status = status;
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.write().await;
        if state.emails.contains_key(&user.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }
        if let Some(tenant_id) = user.tenant_id {
            if !state.tenants.contains_key(&tenant_id) {
                return Err(AppError::NotFound(format!("Tenant {} not found", tenant_id)));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: user.tenant_id,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.emails.insert(user.email.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.tenant_id == Some(tenant_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn update_user_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&user_id)
            .filter(|u| u.tenant_id == Some(tenant_id))
            .map(|user| {
                user.role = role;
                user.updated_at = Utc::now();
                user.clone()
            }))
    }

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let owned = state
            .users
            .get(&user_id)
            .is_some_and(|u| u.tenant_id == Some(tenant_id));
        if !owned {
            return Ok(false);
        }
        if let Some(user) = state.users.remove(&user_id) {
            state.emails.remove(&user.email);
        }
        Ok(true)
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn count_resources(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<i64, AppError> {
        let (counter, _) = self.counter(tenant_id, kind).await?;
        Ok(counter.load(Ordering::Acquire))
    }

    async fn increment_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<CounterUpdate, AppError> {
        let (counter, limit) = self.counter(tenant_id, kind).await?;

        loop {
            let current = counter.load(Ordering::Acquire);
            if current >= limit {
                return Ok(CounterUpdate::LimitReached { current, limit });
            }

            if counter
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(CounterUpdate::Incremented {
                    current: current + 1,
                    limit,
                });
            }
        }
    }

    async fn decrement_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        let (counter, _) = self.counter(tenant_id, kind).await?;

        loop {
            let current = counter.load(Ordering::Acquire);
            if current <= 0 {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    kind = %kind,
                    "Resource counter already at zero, decrement ignored"
                );
                return Ok(());
            }

            if counter
                .compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, AppError> {
        let mut state = self.state.write().await;
        if !state.tenants.contains_key(&project.tenant_id) {
            return Err(AppError::NotFound(format!(
                "Tenant {} not found",
                project.tenant_id
            )));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            tenant_id: project.tenant_id,
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            assignee_ids: project.assignee_ids,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Project>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_projects(&self, tenant_id: Uuid) -> Result<Vec<Project>, AppError> {
        let state = self.state.read().await;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update_project(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Option<Project>, AppError> {
        let mut state = self.state.write().await;
        Ok(state
            .projects
            .get_mut(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .map(|project| {
                if let Some(name) = &update.name {
                    project.name = name.clone();
                }
                if let Some(description) = &update.description {
                    project.description = Some(description.clone());
                }
                if let Some(assignees) = &update.assignee_ids {
                    project.assignee_ids = assignees.clone();
                }
                project.updated_at = Utc::now();
                project.clone()
            }))
    }

    async fn delete_project(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let owned = state
            .projects
            .get(&id)
            .is_some_and(|p| p.tenant_id == tenant_id);
        if !owned {
            return Ok(false);
        }
        state.projects.remove(&id);
        state.tasks.retain(|_, task| task.project_id != id);
        Ok(true)
    }

    async fn project_tenant(&self, id: Uuid) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .projects
            .get(&id)
            .map(|p| p.tenant_id))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let mut state = self.state.write().await;
        let linked = state
            .projects
            .get(&task.project_id)
            .is_some_and(|p| p.tenant_id == task.tenant_id);
        if !linked {
            return Err(AppError::NotFound(format!(
                "Project {} not found",
                task.project_id
            )));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            tenant_id: task.tenant_id,
            project_id: task.project_id,
            title: task.title,
            status: task.status,
            created_by: task.created_by,
            assignee_id: task.assignee_id,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(&id)
            .filter(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_tasks(
        &self,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Task>, AppError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .filter(|t| project_id.map_or(true, |p| t.project_id == p))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn update_task(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let mut state = self.state.write().await;
        Ok(state
            .tasks
            .get_mut(&id)
            .filter(|t| t.tenant_id == tenant_id)
            .map(|task| {
                if let Some(title) = &update.title {
                    task.title = title.clone();
                }
                if let Some(status) = update.status {
                    task.status = status;
                }
                if let Some(assignee) = update.assignee_id {
                    task.assignee_id = assignee;
                }
                task.updated_at = Utc::now();
                task.clone()
            }))
    }

    async fn delete_task(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let owned = state
            .tasks
            .get(&id)
            .is_some_and(|t| t.tenant_id == tenant_id);
        if owned {
            state.tasks.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantry_core::models::SubscriptionTier;

    async fn tenant(store: &MemoryStore, subdomain: &str, max_projects: i64) -> Tenant {
        store
            .create_tenant(NewTenant {
                name: subdomain.to_string(),
                subdomain: subdomain.to_string(),
                subscription_tier: SubscriptionTier::Free,
                max_users: 5,
                max_projects,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_counters_start_at_zero_and_respect_limit() {
        let store = MemoryStore::new();
        let t = tenant(&store, "demo", 2).await;

        assert_eq!(store.count_resources(t.id, ResourceKind::Project).await.unwrap(), 0);
        assert_eq!(
            store.increment_resource_count(t.id, ResourceKind::Project).await.unwrap(),
            CounterUpdate::Incremented { current: 1, limit: 2 }
        );
        assert_eq!(
            store.increment_resource_count(t.id, ResourceKind::Project).await.unwrap(),
            CounterUpdate::Incremented { current: 2, limit: 2 }
        );
        assert_eq!(
            store.increment_resource_count(t.id, ResourceKind::Project).await.unwrap(),
            CounterUpdate::LimitReached { current: 2, limit: 2 }
        );
    }

    #[tokio::test]
    async fn test_decrement_floors_at_zero() {
        let store = MemoryStore::new();
        let t = tenant(&store, "demo", 2).await;
        store
            .decrement_resource_count(t.id, ResourceKind::User)
            .await
            .unwrap();
        assert_eq!(store.count_resources(t.id, ResourceKind::User).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counter_for_unknown_tenant_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .increment_resource_count(Uuid::new_v4(), ResourceKind::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_subdomain_and_email_conflict() {
        let store = MemoryStore::new();
        let t = tenant(&store, "demo", 2).await;
        assert!(matches!(
            store
                .create_tenant(NewTenant {
                    name: "Other".to_string(),
                    subdomain: "demo".to_string(),
                    subscription_tier: SubscriptionTier::Free,
                    max_users: 1,
                    max_projects: 1,
                })
                .await,
            Err(AppError::Conflict(_))
        ));

        let new_user = || NewUser {
            tenant_id: Some(t.id),
            email: "dup@demo.test".to_string(),
            password_hash: "x".to_string(),
            role: Role::StandardUser,
        };
        store.create_user(new_user()).await.unwrap();
        assert!(matches!(
            store.create_user(new_user()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_scoped_reads_filter_by_tenant() {
        let store = MemoryStore::new();
        let demo = tenant(&store, "demo", 5).await;
        let acme = tenant(&store, "acme", 5).await;
        let project = store
            .create_project(NewProject {
                tenant_id: demo.id,
                name: "Roadmap".to_string(),
                description: None,
                owner_id: Uuid::new_v4(),
                assignee_ids: vec![],
            })
            .await
            .unwrap();

        assert!(store.get_project(demo.id, project.id).await.unwrap().is_some());
        assert!(store.get_project(acme.id, project.id).await.unwrap().is_none());
        assert!(!store.delete_project(acme.id, project.id).await.unwrap());
        assert!(store.list_projects(acme.id).await.unwrap().is_empty());
        assert_eq!(store.project_tenant(project.id).await.unwrap(), Some(demo.id));
    }

    #[tokio::test]
    async fn test_deleting_project_removes_its_tasks() {
        let store = MemoryStore::new();
        let demo = tenant(&store, "demo", 5).await;
        let project = store
            .create_project(NewProject {
                tenant_id: demo.id,
                name: "Roadmap".to_string(),
                description: None,
                owner_id: Uuid::new_v4(),
                assignee_ids: vec![],
            })
            .await
            .unwrap();
        store
            .create_task(NewTask {
                tenant_id: demo.id,
                project_id: project.id,
                title: "Draft".to_string(),
                status: Default::default(),
                created_by: project.owner_id,
                assignee_id: None,
            })
            .await
            .unwrap();

        assert!(store.delete_project(demo.id, project.id).await.unwrap());
        assert!(store.list_tasks(demo.id, None).await.unwrap().is_empty());
    }
}
