//! Role-based permission evaluation
//!
//! Decisions are table-driven: [`CAPABILITY_TABLE`] maps every [`Action`] to what a
//! tenant admin and a standard user may do. Super admins are allowed everything. The
//! tenant boundary is checked before the table, so no role other than super admin can act
//! outside its own tenant.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tenantry_core::models::{ResourceKind, Role};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::context::RequestContext;

/// Action categories from the capability table's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    TenantManagement,
    UserManagement,
    ProjectManagement,
    TaskManagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TenantRead,
    TenantList,
    TenantCreate,
    TenantUpdateSettings,
    TenantSetStatus,
    UserRead,
    UserCreate,
    UserUpdateRole,
    UserDelete,
    ProjectRead,
    ProjectCreate,
    ProjectUpdate,
    ProjectDelete,
    TaskRead,
    TaskCreate,
    TaskUpdate,
    TaskDelete,
}

impl Action {
    pub const ALL: [Action; 17] = [
        Action::TenantRead,
        Action::TenantList,
        Action::TenantCreate,
        Action::TenantUpdateSettings,
        Action::TenantSetStatus,
        Action::UserRead,
        Action::UserCreate,
        Action::UserUpdateRole,
        Action::UserDelete,
        Action::ProjectRead,
        Action::ProjectCreate,
        Action::ProjectUpdate,
        Action::ProjectDelete,
        Action::TaskRead,
        Action::TaskCreate,
        Action::TaskUpdate,
        Action::TaskDelete,
    ];

    pub fn category(&self) -> ActionCategory {
        match self {
            Action::TenantRead
            | Action::TenantList
            | Action::TenantCreate
            | Action::TenantUpdateSettings
            | Action::TenantSetStatus => ActionCategory::TenantManagement,
            Action::UserRead | Action::UserCreate | Action::UserUpdateRole | Action::UserDelete => {
                ActionCategory::UserManagement
            }
            Action::ProjectRead
            | Action::ProjectCreate
            | Action::ProjectUpdate
            | Action::ProjectDelete => ActionCategory::ProjectManagement,
            Action::TaskRead | Action::TaskCreate | Action::TaskUpdate | Action::TaskDelete => {
                ActionCategory::TaskManagement
            }
        }
    }

    /// Quota-counted resource created by this action, if any.
    pub fn quota_kind(&self) -> Option<ResourceKind> {
        match self {
            Action::UserCreate => Some(ResourceKind::User),
            Action::ProjectCreate => Some(ResourceKind::Project),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TenantRead => "tenant_read",
            Action::TenantList => "tenant_list",
            Action::TenantCreate => "tenant_create",
            Action::TenantUpdateSettings => "tenant_update_settings",
            Action::TenantSetStatus => "tenant_set_status",
            Action::UserRead => "user_read",
            Action::UserCreate => "user_create",
            Action::UserUpdateRole => "user_update_role",
            Action::UserDelete => "user_delete",
            Action::ProjectRead => "project_read",
            Action::ProjectCreate => "project_create",
            Action::ProjectUpdate => "project_update",
            Action::ProjectDelete => "project_delete",
            Action::TaskRead => "task_read",
            Action::TaskCreate => "task_create",
            Action::TaskUpdate => "task_update",
            Action::TaskDelete => "task_delete",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Outcome of a capability table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Allow,
    /// Allowed only when the caller-supplied ownership predicate holds.
    IfOwner,
    Deny,
}

/// Tenant an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(Uuid),
    /// Tenant-less operations such as listing or registering tenants.
    System,
}

impl TenantScope {
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::Tenant(id) => Some(*id),
            TenantScope::System => None,
        }
    }
}

/// Resource-level ownership hook supplied by the calling handler.
pub type OwnershipCheck = dyn Fn(&RequestContext) -> bool + Send + Sync;

use Capability::{Allow, Deny, IfOwner};

/// (action, tenant admin, standard user)
const CAPABILITY_TABLE: [(Action, Capability, Capability); 17] = [
    (Action::TenantRead, Allow, Deny),
    (Action::TenantList, Deny, Deny),
    (Action::TenantCreate, Deny, Deny),
    (Action::TenantUpdateSettings, Allow, Deny),
    (Action::TenantSetStatus, Deny, Deny),
    (Action::UserRead, Allow, Deny),
    (Action::UserCreate, Allow, Deny),
    (Action::UserUpdateRole, Allow, Deny),
    (Action::UserDelete, Allow, Deny),
    (Action::ProjectRead, Allow, Allow),
    (Action::ProjectCreate, Allow, IfOwner),
    (Action::ProjectUpdate, Allow, IfOwner),
    (Action::ProjectDelete, Allow, Deny),
    (Action::TaskRead, Allow, Allow),
    (Action::TaskCreate, Allow, IfOwner),
    (Action::TaskUpdate, Allow, IfOwner),
    (Action::TaskDelete, Allow, Deny),
];

/// Capability of `role` for `action` within its own tenant.
pub fn capability(role: Role, action: Action) -> Capability {
    if role == Role::SuperAdmin {
        return Allow;
    }
    CAPABILITY_TABLE
        .iter()
        .find(|(a, _, _)| *a == action)
        .map(|(_, tenant_admin, standard_user)| match role {
            Role::TenantAdmin => *tenant_admin,
            _ => *standard_user,
        })
        .unwrap_or(Deny)
}

#[derive(Clone)]
pub struct PermissionEvaluator {
    audit: Arc<dyn AuditSink>,
}

impl PermissionEvaluator {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Allow or deny `action` on `scope` for `ctx`.
    ///
    /// Order: super admin allow (audited as cross-tenant), then the tenant boundary, then
    /// the capability table. `IfOwner` entries consult `ownership`; without one they deny.
    pub fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
        scope: TenantScope,
        ownership: Option<&OwnershipCheck>,
    ) -> Result<(), AppError> {
        if ctx.is_super_admin() {
            let mut entry = AuditRecord::new(AuditEventType::CrossTenantAccess)
                .with_actor(ctx)
                .with_action(action)
                .cross_tenant();
            if let Some(tenant_id) = scope.tenant_id() {
                entry = entry.with_target_tenant(tenant_id);
            }
            self.audit.record(entry);
            return Ok(());
        }

        let target = match scope {
            TenantScope::Tenant(id) if ctx.belongs_to(id) => id,
            _ => {
                return Err(self.deny(ctx, action, scope, "target tenant differs from caller tenant"));
            }
        };

        match capability(ctx.role(), action) {
            Capability::Allow => Ok(()),
            Capability::IfOwner => match ownership {
                Some(check) if check(ctx) => Ok(()),
                Some(_) => Err(self.deny(
                    ctx,
                    action,
                    TenantScope::Tenant(target),
                    "caller does not own or is not assigned to the resource",
                )),
                None => Err(self.deny(
                    ctx,
                    action,
                    TenantScope::Tenant(target),
                    "ownership required but not established",
                )),
            },
            Capability::Deny => Err(self.deny(
                ctx,
                action,
                TenantScope::Tenant(target),
                "role lacks capability",
            )),
        }
    }

    fn deny(
        &self,
        ctx: &RequestContext,
        action: Action,
        scope: TenantScope,
        reason: &str,
    ) -> AppError {
        tracing::debug!(
            user_id = %ctx.user_id(),
            role = %ctx.role(),
            action = %action,
            reason = reason,
            "Access denied"
        );
        let mut entry = AuditRecord::new(AuditEventType::AccessDenied)
            .with_actor(ctx)
            .with_action(action)
            .with_failure(reason);
        if let Some(tenant_id) = scope.tenant_id() {
            entry = entry.with_target_tenant(tenant_id);
        }
        self.audit.record(entry);
        AppError::Forbidden(format!("{} denied: {}", action, reason))
    }
}
