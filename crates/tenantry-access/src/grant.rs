//! Authorized access to tenant data
//!
//! A [`Grant`] is what the gateway hands out after a successful authorization. It is the
//! only way to reach the store: every method scopes its query to the grant's target tenant
//! and refuses to run unless the authorized action covers it.

use std::sync::Arc;

use serde::Deserialize;
use tenantry_core::models::{
    normalize_email, NewProject, NewTask, NewTenant, NewUser, Project, ProjectUpdate,
    ResourceKind, ResourceUsage, Role, SubscriptionTier, Task, TaskStatus, TaskUpdate, Tenant,
    TenantSettingsUpdate, TenantStatus, User,
};
use tenantry_core::{AppError, QuotaTiers};
use uuid::Uuid;
use validator::Validate;

use crate::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::context::RequestContext;
use crate::password::{hash_password, validate_password};
use crate::permission::{Action, TenantScope};
use crate::quota::{QuotaEnforcer, Reservation};
use crate::store::{ProjectStore, Store, TaskStore, TenantStore, UserStore};

/// Registration of a tenant together with its first tenant admin.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTenantInput {
    #[validate(length(min = 1, max = 200, message = "Tenant name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 63, message = "Subdomain must be between 1 and 63 characters"))]
    pub subdomain: String,
    pub subscription_tier: SubscriptionTier,
    /// Overrides the tier default when set.
    #[validate(range(min = 0))]
    pub max_users: Option<i64>,
    #[validate(range(min = 0))]
    pub max_projects: Option<i64>,
    #[validate(email)]
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUserInput {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProjectInput {
    #[validate(length(min = 1, max = 200, message = "Project name must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTaskInput {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Task title must be between 1 and 500 characters"))]
    pub title: String,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
}

const SUPER_ADMIN_NOT_GRANTABLE: &str = "The super admin role cannot be granted";

pub struct Grant {
    context: RequestContext,
    action: Action,
    scope: TenantScope,
    reservation: Option<Reservation>,
    store: Arc<dyn Store>,
    quota: QuotaEnforcer,
    audit: Arc<dyn AuditSink>,
    tiers: QuotaTiers,
}

impl Grant {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        context: RequestContext,
        action: Action,
        scope: TenantScope,
        reservation: Option<Reservation>,
        store: Arc<dyn Store>,
        quota: QuotaEnforcer,
        audit: Arc<dyn AuditSink>,
        tiers: QuotaTiers,
    ) -> Self {
        Self {
            context,
            action,
            scope,
            reservation,
            store,
            quota,
            audit,
            tiers,
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn scope(&self) -> TenantScope {
        self.scope
    }

    fn require(&self, allowed: &[Action]) -> Result<(), AppError> {
        if allowed.contains(&self.action) {
            Ok(())
        } else {
            Err(self.deny(format!(
                "grant for {} does not cover this operation",
                self.action
            )))
        }
    }

    /// Record an `AccessDenied` entry and return the matching `Forbidden`.
    fn deny(&self, reason: impl Into<String>) -> AppError {
        let reason = reason.into();
        tracing::debug!(
            user_id = %self.context.user_id(),
            action = %self.action,
            reason = %reason,
            "Operation denied"
        );
        self.audit
            .record(self.audit_entry(AuditEventType::AccessDenied).with_failure(reason.clone()));
        AppError::Forbidden(reason)
    }

    fn target(&self) -> Result<Uuid, AppError> {
        self.scope.tenant_id().ok_or_else(|| {
            AppError::BadRequest("operation requires a tenant-scoped grant".to_string())
        })
    }

    fn audit_entry(&self, event_type: AuditEventType) -> AuditRecord {
        let mut entry = AuditRecord::new(event_type)
            .with_actor(&self.context)
            .with_action(self.action);
        if let Some(tenant_id) = self.scope.tenant_id() {
            entry = entry.with_target_tenant(tenant_id);
            if !self.context.belongs_to(tenant_id) {
                entry = entry.cross_tenant();
            }
        }
        entry
    }

    fn take_reservation(&mut self) -> Result<Reservation, AppError> {
        self.reservation
            .take()
            .ok_or_else(|| AppError::Internal(format!("No quota reservation held for {}", self.action)))
    }

    async fn ensure_tenant_users(&self, tenant_id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let members = self.store.list_users(tenant_id).await?;
        if let Some(missing) = user_ids
            .iter()
            .find(|id| !members.iter().any(|u| u.id == **id))
        {
            return Err(AppError::InvalidInput(format!(
                "User {} is not a member of this tenant",
                missing
            )));
        }
        Ok(())
    }

    // Tenant management

    pub async fn tenant(&self) -> Result<Tenant, AppError> {
        self.require(&[
            Action::TenantRead,
            Action::TenantUpdateSettings,
            Action::TenantSetStatus,
        ])?;
        let tenant_id = self.target()?;
        self.store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))
    }

    /// All tenants. Each tenant is recorded as a cross-tenant read.
    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        self.require(&[Action::TenantList])?;
        let tenants = self.store.list_tenants().await?;
        let ids: Vec<Uuid> = tenants.iter().map(|t| t.id).collect();
        self.record_cross_tenant_reads(&ids);
        Ok(tenants)
    }

    /// One audit record per tenant touched by a super admin read spanning tenants.
    pub fn record_cross_tenant_reads(&self, tenant_ids: &[Uuid]) {
        if !self.context.is_super_admin() {
            return;
        }
        for tenant_id in tenant_ids {
            self.audit.record(
                AuditRecord::new(AuditEventType::CrossTenantAccess)
                    .with_actor(&self.context)
                    .with_action(self.action)
                    .with_target_tenant(*tenant_id)
                    .cross_tenant(),
            );
        }
    }

    /// Register a tenant and its initial tenant admin.
    pub async fn create_tenant(self, mut input: NewTenantInput) -> Result<(Tenant, User), AppError> {
        self.require(&[Action::TenantCreate])?;

        input.subdomain = input.subdomain.trim().to_lowercase();
        input.admin_email = normalize_email(&input.admin_email);
        input.validate()?;
        validate_subdomain(&input.subdomain)?;
        validate_password(&input.admin_password)?;

        if self.store.get_user_by_email(&input.admin_email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                input.admin_email
            )));
        }
        let password_hash = hash_password(&input.admin_password)?;

        let defaults = self.tiers.for_tier(input.subscription_tier);
        let max_users = input.max_users.unwrap_or(defaults.max_users);
        if max_users < 1 {
            return Err(AppError::InvalidInput(
                "A tenant needs room for at least its admin user".to_string(),
            ));
        }
        let tenant = self
            .store
            .create_tenant(NewTenant {
                name: input.name.trim().to_string(),
                subdomain: input.subdomain,
                subscription_tier: input.subscription_tier,
                max_users,
                max_projects: input.max_projects.unwrap_or(defaults.max_projects),
            })
            .await?;

        self.audit.record(
            self.audit_entry(AuditEventType::TenantCreated)
                .with_target_tenant(tenant.id)
                .with_details(serde_json::json!({
                    "subdomain": tenant.subdomain,
                    "subscription_tier": tenant.subscription_tier,
                    "max_users": tenant.max_users,
                    "max_projects": tenant.max_projects,
                })),
        );

        let reservation = self
            .quota
            .reserve(&self.context, self.action, tenant.id, ResourceKind::User)
            .await?;
        let admin = match self
            .store
            .create_user(NewUser {
                tenant_id: Some(tenant.id),
                email: input.admin_email,
                password_hash,
                role: Role::TenantAdmin,
            })
            .await
        {
            Ok(user) => {
                reservation.commit();
                user
            }
            Err(e) => {
                tracing::error!(error = %e, tenant_id = %tenant.id, "Failed to create initial tenant admin");
                if let Err(release_err) = reservation.release().await {
                    tracing::error!(error = %release_err, "Failed to release user reservation");
                }
                return Err(e);
            }
        };

        tracing::info!(tenant_id = %tenant.id, admin_id = %admin.id, "Tenant created");
        Ok((tenant, admin))
    }

    /// Update name, tier or limits. A tier change re-derives the limits unless they are
    /// given explicitly. Limits may not drop below current usage.
    pub async fn update_tenant_settings(
        &self,
        mut update: TenantSettingsUpdate,
    ) -> Result<Tenant, AppError> {
        self.require(&[Action::TenantUpdateSettings])?;
        let tenant_id = self.target()?;

        if update.is_empty() {
            return Err(AppError::InvalidInput("No settings to update".to_string()));
        }
        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > 200 {
                return Err(AppError::InvalidInput(
                    "Tenant name must be between 1 and 200 characters".to_string(),
                ));
            }
            update.name = Some(name.to_string());
        }

        if let Some(tier) = update.subscription_tier {
            let defaults = self.tiers.for_tier(tier);
            update.max_users.get_or_insert(defaults.max_users);
            update.max_projects.get_or_insert(defaults.max_projects);
        }

        for (kind, limit) in [
            (ResourceKind::User, update.max_users),
            (ResourceKind::Project, update.max_projects),
        ] {
            let Some(limit) = limit else { continue };
            if limit < 0 {
                return Err(AppError::InvalidInput(format!(
                    "Limit for {} must not be negative",
                    kind
                )));
            }
            let current = self.quota.usage(tenant_id, kind).await?;
            if limit < current {
                return Err(AppError::InvalidInput(format!(
                    "Limit for {} ({}) is below current usage ({})",
                    kind, limit, current
                )));
            }
        }

        let tenant = self
            .store
            .update_tenant_settings(tenant_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))?;

        self.audit.record(
            self.audit_entry(AuditEventType::TenantSettingsChanged)
                .with_details(serde_json::json!({
                    "name": tenant.name,
                    "subscription_tier": tenant.subscription_tier,
                    "max_users": tenant.max_users,
                    "max_projects": tenant.max_projects,
                })),
        );
        Ok(tenant)
    }

    pub async fn set_tenant_status(&self, status: TenantStatus) -> Result<Tenant, AppError> {
        self.require(&[Action::TenantSetStatus])?;
        let tenant_id = self.target()?;
        let tenant = self
            .store
            .set_tenant_status(tenant_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))?;

        self.audit.record(
            self.audit_entry(AuditEventType::TenantStatusChanged)
                .with_details(serde_json::json!({ "status": status })),
        );
        tracing::info!(tenant_id = %tenant_id, status = %status, "Tenant status changed");
        Ok(tenant)
    }

    /// Current count and limit per quota-counted resource kind.
    pub async fn usage(&self) -> Result<Vec<ResourceUsage>, AppError> {
        self.require(&[Action::TenantRead])?;
        let tenant = self.tenant().await?;
        let mut usage = Vec::with_capacity(ResourceKind::ALL.len());
        for kind in ResourceKind::ALL {
            usage.push(ResourceUsage {
                kind,
                current: self.quota.usage(tenant.id, kind).await?,
                limit: tenant.limit_for(kind),
            });
        }
        Ok(usage)
    }

    // User management

    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        self.require(&[Action::UserRead])?;
        self.store.list_users(self.target()?).await
    }

    pub async fn user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.require(&[Action::UserRead, Action::UserUpdateRole, Action::UserDelete])?;
        let tenant_id = self.target()?;
        self.store
            .get_user(user_id)
            .await?
            .filter(|u| u.tenant_id == Some(tenant_id))
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Create a user in the target tenant against the reservation taken at authorization.
    pub async fn create_user(mut self, mut input: NewUserInput) -> Result<User, AppError> {
        self.require(&[Action::UserCreate])?;
        let tenant_id = self.target()?;
        let reservation = self.take_reservation()?;

        if input.role == Role::SuperAdmin {
            release_quietly(reservation).await;
            return Err(self.deny(SUPER_ADMIN_NOT_GRANTABLE));
        }

        input.email = normalize_email(&input.email);
        let prepared = match prepare_user(&input) {
            Ok(hash) => hash,
            Err(e) => {
                release_quietly(reservation).await;
                return Err(e);
            }
        };

        let created = self
            .store
            .create_user(NewUser {
                tenant_id: Some(tenant_id),
                email: input.email,
                password_hash: prepared,
                role: input.role,
            })
            .await;

        match created {
            Ok(user) => {
                reservation.commit();
                self.audit.record(
                    self.audit_entry(AuditEventType::UserCreated)
                        .with_details(serde_json::json!({ "user_id": user.id, "role": user.role })),
                );
                Ok(user)
            }
            Err(e) => {
                release_quietly(reservation).await;
                Err(e)
            }
        }
    }

    pub async fn update_user_role(&self, user_id: Uuid, role: Role) -> Result<User, AppError> {
        self.require(&[Action::UserUpdateRole])?;
        let tenant_id = self.target()?;
        if role == Role::SuperAdmin {
            return Err(self.deny(SUPER_ADMIN_NOT_GRANTABLE));
        }

        let previous = self.user(user_id).await?;
        let user = self
            .store
            .update_user_role(tenant_id, user_id, role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.audit.record(
            self.audit_entry(AuditEventType::RoleChanged).with_details(serde_json::json!({
                "user_id": user_id,
                "from": previous.role,
                "to": role,
            })),
        );
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.require(&[Action::UserDelete])?;
        let tenant_id = self.target()?;
        if user_id == self.context.user_id() {
            return Err(AppError::BadRequest("Users cannot delete themselves".to_string()));
        }

        if !self.store.delete_user(tenant_id, user_id).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        self.quota.release_unit(tenant_id, ResourceKind::User).await?;

        self.audit.record(
            self.audit_entry(AuditEventType::UserDeleted)
                .with_details(serde_json::json!({ "user_id": user_id })),
        );
        Ok(())
    }

    // Project management

    pub async fn projects(&self) -> Result<Vec<Project>, AppError> {
        self.require(&[Action::ProjectRead])?;
        self.store.list_projects(self.target()?).await
    }

    pub async fn project(&self, project_id: Uuid) -> Result<Project, AppError> {
        self.require(&[
            Action::ProjectRead,
            Action::ProjectUpdate,
            Action::ProjectDelete,
        ])?;
        self.store
            .get_project(self.target()?, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }

    /// Create a project owned by the caller against the reservation taken at authorization.
    pub async fn create_project(mut self, input: NewProjectInput) -> Result<Project, AppError> {
        self.require(&[Action::ProjectCreate])?;
        let tenant_id = self.target()?;
        let reservation = self.take_reservation()?;

        let checked = match input.validate() {
            Ok(()) => self.ensure_tenant_users(tenant_id, &input.assignee_ids).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = checked {
            release_quietly(reservation).await;
            return Err(e);
        }

        let created = self
            .store
            .create_project(NewProject {
                tenant_id,
                name: input.name.trim().to_string(),
                description: input.description,
                owner_id: self.context.user_id(),
                assignee_ids: dedup(input.assignee_ids),
            })
            .await;

        match created {
            Ok(project) => {
                reservation.commit();
                tracing::debug!(project_id = %project.id, tenant_id = %tenant_id, "Project created");
                Ok(project)
            }
            Err(e) => {
                release_quietly(reservation).await;
                Err(e)
            }
        }
    }

    pub async fn update_project(
        &self,
        project_id: Uuid,
        mut update: ProjectUpdate,
    ) -> Result<Project, AppError> {
        self.require(&[Action::ProjectUpdate])?;
        let tenant_id = self.target()?;

        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > 200 {
                return Err(AppError::InvalidInput(
                    "Project name must be between 1 and 200 characters".to_string(),
                ));
            }
            update.name = Some(name.to_string());
        }
        if let Some(assignees) = update.assignee_ids.take() {
            self.ensure_tenant_users(tenant_id, &assignees).await?;
            update.assignee_ids = Some(dedup(assignees));
        }

        self.store
            .update_project(tenant_id, project_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }

    /// Delete a project with its tasks and return its quota unit.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<(), AppError> {
        self.require(&[Action::ProjectDelete])?;
        let tenant_id = self.target()?;
        if !self.store.delete_project(tenant_id, project_id).await? {
            return Err(AppError::NotFound(format!("Project {} not found", project_id)));
        }
        self.quota
            .release_unit(tenant_id, ResourceKind::Project)
            .await
    }

    // Task management

    pub async fn tasks(&self, project_id: Option<Uuid>) -> Result<Vec<Task>, AppError> {
        self.require(&[Action::TaskRead])?;
        self.store.list_tasks(self.target()?, project_id).await
    }

    pub async fn task(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.require(&[Action::TaskRead, Action::TaskUpdate, Action::TaskDelete])?;
        self.store
            .get_task(self.target()?, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))
    }

    /// Create a task. The project must belong to the same tenant as the task.
    pub async fn create_task(&self, input: NewTaskInput) -> Result<Task, AppError> {
        self.require(&[Action::TaskCreate])?;
        let tenant_id = self.target()?;
        input.validate()?;

        match self.store.project_tenant(input.project_id).await? {
            None => {
                return Err(AppError::NotFound(format!(
                    "Project {} not found",
                    input.project_id
                )));
            }
            Some(project_tenant) if project_tenant != tenant_id => {
                self.audit.record(
                    self.audit_entry(AuditEventType::AccessDenied)
                        .with_details(serde_json::json!({
                            "project_id": input.project_id,
                            "project_tenant_id": project_tenant,
                        }))
                        .with_failure("task linked to a project of another tenant"),
                );
                return Err(AppError::Forbidden(
                    "Project belongs to a different tenant".to_string(),
                ));
            }
            Some(_) => {}
        }

        if let Some(assignee) = input.assignee_id {
            self.ensure_tenant_users(tenant_id, &[assignee]).await?;
        }

        self.store
            .create_task(NewTask {
                tenant_id,
                project_id: input.project_id,
                title: input.title.trim().to_string(),
                status: input.status.unwrap_or_default(),
                created_by: self.context.user_id(),
                assignee_id: input.assignee_id,
            })
            .await
    }

    pub async fn update_task(&self, task_id: Uuid, mut update: TaskUpdate) -> Result<Task, AppError> {
        self.require(&[Action::TaskUpdate])?;
        let tenant_id = self.target()?;

        if let Some(title) = &update.title {
            let title = title.trim();
            if title.is_empty() || title.chars().count() > 500 {
                return Err(AppError::InvalidInput(
                    "Task title must be between 1 and 500 characters".to_string(),
                ));
            }
            update.title = Some(title.to_string());
        }
        if let Some(Some(assignee)) = update.assignee_id {
            self.ensure_tenant_users(tenant_id, &[assignee]).await?;
        }

        self.store
            .update_task(tenant_id, task_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))
    }

    pub async fn delete_task(&self, task_id: Uuid) -> Result<(), AppError> {
        self.require(&[Action::TaskDelete])?;
        if !self.store.delete_task(self.target()?, task_id).await? {
            return Err(AppError::NotFound(format!("Task {} not found", task_id)));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grant")
            .field("context", &self.context)
            .field("action", &self.action)
            .field("scope", &self.scope)
            .field("reservation", &self.reservation)
            .finish()
    }
}

/// Validate a new user and hash its password.
fn prepare_user(input: &NewUserInput) -> Result<String, AppError> {
    input.validate()?;
    validate_password(&input.password)?;
    hash_password(&input.password)
}

async fn release_quietly(reservation: Reservation) {
    if let Err(e) = reservation.release().await {
        tracing::error!(error = %e, "Failed to release quota reservation");
    }
}

fn validate_subdomain(subdomain: &str) -> Result<(), AppError> {
    let valid = subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-');
    if !valid {
        return Err(AppError::InvalidInput(
            "Subdomain may only contain lowercase letters, digits and inner hyphens".to_string(),
        ));
    }
    Ok(())
}

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subdomain() {
        assert!(validate_subdomain("acme-corp").is_ok());
        assert!(validate_subdomain("demo42").is_ok());
        assert!(validate_subdomain("-acme").is_err());
        assert!(validate_subdomain("acme_corp").is_err());
        assert!(validate_subdomain("Acme").is_err());
    }

    #[test]
    fn test_prepare_user_checks_password() {
        let input = NewUserInput {
            email: "member@acme.test".to_string(),
            password: "short".to_string(),
            role: Role::StandardUser,
        };
        assert!(matches!(prepare_user(&input), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_dedup_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(vec![a, b, a]), vec![a, b]);
    }
}
