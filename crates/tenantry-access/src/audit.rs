//! Security audit trail
//!
//! Denials, authentication failures, exhausted quotas and every cross-tenant super admin
//! operation are recorded through an [`AuditSink`]. The default sink writes structured
//! events on the `audit` tracing target so they can be routed separately from
//! application logs.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tenantry_core::models::Role;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::permission::Action;

/// Audit event types for categorization
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    LoginSucceeded,
    LoginFailed,
    AuthenticationFailed,
    AccessDenied,
    CrossTenantAccess,
    QuotaExceeded,
    TenantCreated,
    TenantSettingsChanged,
    TenantStatusChanged,
    UserCreated,
    RoleChanged,
    UserDeleted,
}

/// Structured audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub cross_tenant: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuditRecord {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            actor_user_id: None,
            actor_tenant_id: None,
            actor_role: None,
            target_tenant_id: None,
            action: None,
            cross_tenant: false,
            success: true,
            reason: None,
            details: None,
        }
    }

    /// Copy actor identity from a resolved context
    pub fn with_actor(mut self, ctx: &RequestContext) -> Self {
        self.actor_user_id = Some(ctx.user_id());
        self.actor_tenant_id = ctx.tenant_id();
        self.actor_role = Some(ctx.role());
        self
    }

    pub fn with_actor_user(mut self, user_id: Uuid, tenant_id: Option<Uuid>) -> Self {
        self.actor_user_id = Some(user_id);
        self.actor_tenant_id = tenant_id;
        self
    }

    pub fn with_target_tenant(mut self, tenant_id: Uuid) -> Self {
        self.target_tenant_id = Some(tenant_id);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn cross_tenant(mut self) -> Self {
        self.cross_tenant = true;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failure
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.reason = Some(reason.into());
        self
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditRecord);
}

/// Writes audit records as structured events on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditRecord) {
        let json = serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_string());

        if entry.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?entry.event_type,
                actor_user_id = ?entry.actor_user_id,
                target_tenant_id = ?entry.target_tenant_id,
                cross_tenant = entry.cross_tenant,
                success = entry.success,
                "Security audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?entry.event_type,
                actor_user_id = ?entry.actor_user_id,
                target_tenant_id = ?entry.target_tenant_id,
                cross_tenant = entry.cross_tenant,
                success = entry.success,
                reason = ?entry.reason,
                "Security audit log - failure"
            );
        }
    }
}

/// Keeps records in memory. Used by tests to assert on the audit trail.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditRecord> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn entries_of(&self, event_type: AuditEventType) -> Vec<AuditRecord> {
        self.entries()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, entry: AuditRecord) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}
