//! Quota reservations
//!
//! Capacity is claimed before the resource is written: [`QuotaEnforcer::reserve`] performs
//! the store's conditional increment, and the returned [`Reservation`] is either committed
//! once the row exists or released to give the slot back.

use std::sync::Arc;

use tenantry_core::models::ResourceKind;
use tenantry_core::AppError;
use uuid::Uuid;

use crate::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::context::RequestContext;
use crate::permission::Action;
use crate::store::{CounterUpdate, QuotaStore, Store};

#[derive(Clone)]
pub struct QuotaEnforcer {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

impl QuotaEnforcer {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Atomically claim one unit of `kind` for `tenant_id` on behalf of `ctx` performing `action`.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user_id()))]
    pub async fn reserve(
        &self,
        ctx: &RequestContext,
        action: Action,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<Reservation, AppError> {
        match self.store.increment_resource_count(tenant_id, kind).await? {
            CounterUpdate::Incremented { current, limit } => {
                tracing::debug!(current = current, limit = limit, "Quota reserved");
                Ok(Reservation {
                    tenant_id,
                    kind,
                    store: Some(self.store.clone()),
                })
            }
            CounterUpdate::LimitReached { current, limit } => {
                tracing::info!(current = current, limit = limit, "Quota exceeded");
                self.audit.record(
                    AuditRecord::new(AuditEventType::QuotaExceeded)
                        .with_actor(ctx)
                        .with_action(action)
                        .with_target_tenant(tenant_id)
                        .with_details(serde_json::json!({
                            "resource": kind,
                            "current": current,
                            "limit": limit,
                        }))
                        .with_failure("quota exceeded"),
                );
                Err(AppError::QuotaExceeded {
                    resource: kind,
                    current,
                    limit,
                })
            }
        }
    }

    /// Give back one unit of `kind`, e.g. after the resource was deleted.
    pub async fn release_unit(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<(), AppError> {
        self.store.decrement_resource_count(tenant_id, kind).await
    }

    pub async fn usage(&self, tenant_id: Uuid, kind: ResourceKind) -> Result<i64, AppError> {
        self.store.count_resources(tenant_id, kind).await
    }
}

/// A claimed unit of capacity.
///
/// Dropping a pending reservation releases it on the current tokio runtime, so a request
/// cancelled between reservation and creation does not leak a slot.
#[must_use = "a reservation must be committed or released"]
pub struct Reservation {
    tenant_id: Uuid,
    kind: ResourceKind,
    /// `None` once settled.
    store: Option<Arc<dyn Store>>,
}

impl Reservation {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The resource now exists; keep the counted unit.
    pub fn commit(mut self) {
        self.store = None;
    }

    /// Creation failed; return the unit.
    pub async fn release(mut self) -> Result<(), AppError> {
        match self.store.take() {
            Some(store) => store.decrement_resource_count(self.tenant_id, self.kind).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("tenant_id", &self.tenant_id)
            .field("kind", &self.kind)
            .field("pending", &self.store.is_some())
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let Some(store) = self.store.take() else {
            return;
        };

        tracing::warn!(
            tenant_id = %self.tenant_id,
            kind = %self.kind,
            "Reservation dropped without commit or release, releasing"
        );

        let (tenant_id, kind) = (self.tenant_id, self.kind);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.decrement_resource_count(tenant_id, kind).await {
                        tracing::error!(error = %e, tenant_id = %tenant_id, "Failed to release dropped reservation");
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    tenant_id = %tenant_id,
                    kind = %kind,
                    "No runtime available to release dropped reservation; counter may drift"
                );
            }
        }
    }
}
