use tenantry_core::models::Role;
use uuid::Uuid;

/// Trusted identity of one request.
///
/// Only the context resolver can build one, so holding a `RequestContext` proves the
/// bearer token was verified and its user and tenant were still valid at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    tenant_id: Option<Uuid>,
    user_id: Uuid,
    role: Role,
}

impl RequestContext {
    pub(crate) fn new(tenant_id: Option<Uuid>, user_id: Uuid, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
        }
    }

    /// Tenant of the acting user; `None` for the system-scoped super admin.
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn belongs_to(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == Some(tenant_id)
    }
}
