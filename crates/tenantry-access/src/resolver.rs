//! Bearer token to [`RequestContext`] resolution
//!
//! Tokens are stateless, so every resolution re-reads the user and tenant: a deleted user
//! or a suspended tenant stops authenticating on the next request, not at token expiry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantry_core::models::Role;
use tenantry_core::AppError;

use crate::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::context::RequestContext;
use crate::store::{Store, TenantStore, UserStore};
use crate::token::{TokenClaims, TokenSigner};

#[derive(Clone)]
pub struct ContextResolver {
    store: Arc<dyn Store>,
    signer: TokenSigner,
    audit: Arc<dyn AuditSink>,
}

impl ContextResolver {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            signer,
            audit,
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<RequestContext, AppError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Every failure is `Unauthenticated`; the reason only reaches logs and the audit trail.
    pub async fn resolve_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestContext, AppError> {
        let claims = match self.signer.verify_at(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                let reason = match &e {
                    AppError::Unauthenticated(reason) => reason.clone(),
                    other => other.to_string(),
                };
                return Err(self.reject(None, reason));
            }
        };

        match self.check_claims(&claims).await {
            Ok(ctx) => Ok(ctx),
            Err(AppError::Unauthenticated(reason)) => Err(self.reject(Some(&claims), reason)),
            Err(e) => Err(e),
        }
    }

    async fn check_claims(&self, claims: &TokenClaims) -> Result<RequestContext, AppError> {
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("user no longer exists".to_string()))?;

        if user.tenant_id != claims.tenant_id {
            return Err(AppError::Unauthenticated(
                "user tenant differs from token tenant".to_string(),
            ));
        }

        match claims.tenant_id {
            Some(tenant_id) => {
                let tenant = self.store.get_tenant(tenant_id).await?.ok_or_else(|| {
                    AppError::Unauthenticated("tenant no longer exists".to_string())
                })?;
                if !tenant.is_active() {
                    return Err(AppError::Unauthenticated("tenant is suspended".to_string()));
                }
            }
            None if claims.role != Role::SuperAdmin => {
                return Err(AppError::Unauthenticated(
                    "tenant-less token for a non super admin role".to_string(),
                ));
            }
            None => {}
        }

        Ok(RequestContext::new(claims.tenant_id, claims.sub, claims.role))
    }

    fn reject(&self, claims: Option<&TokenClaims>, reason: String) -> AppError {
        tracing::debug!(reason = %reason, "Token resolution failed");
        let mut entry = AuditRecord::new(AuditEventType::AuthenticationFailed).with_failure(&reason);
        if let Some(claims) = claims {
            entry = entry.with_actor_user(claims.sub, claims.tenant_id);
            if let Some(tenant_id) = claims.tenant_id {
                entry = entry.with_target_tenant(tenant_id);
            }
        }
        self.audit.record(entry);
        AppError::Unauthenticated(reason)
    }
}
