use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tenant lifecycle status. Tenants are never deleted, only suspended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "tenant_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl Display for TenantStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TenantStatus::Active => write!(f, "active"),
            TenantStatus::Suspended => write!(f, "suspended"),
        }
    }
}

/// Subscription tier; determines the default quota limits of a tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "subscription_tier", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Professional,
    Enterprise,
}

impl Display for SubscriptionTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubscriptionTier::Free => write!(f, "free"),
            SubscriptionTier::Professional => write!(f, "professional"),
            SubscriptionTier::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// Resource kinds subject to per-tenant quotas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "resource_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::User, ResourceKind::Project];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Project => "project",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Tenant (organization) entity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub subscription_tier: SubscriptionTier,
    pub max_users: i64,
    pub max_projects: i64,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// Configured limit for a quota-counted resource kind.
    pub fn limit_for(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::User => self.max_users,
            ResourceKind::Project => self.max_projects,
        }
    }
}

/// Values required to register a tenant. Limits are already resolved from the tier table.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub subscription_tier: SubscriptionTier,
    pub max_users: i64,
    pub max_projects: i64,
}

/// Settings a tenant admin may change on their own tenant.
#[derive(Debug, Clone, Default)]
pub struct TenantSettingsUpdate {
    pub name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
}

impl TenantSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.subscription_tier.is_none()
            && self.max_users.is_none()
            && self.max_projects.is_none()
    }
}

/// Current usage of one quota-counted resource kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ResourceUsage {
    pub kind: ResourceKind,
    pub current: i64,
    pub limit: i64,
}
