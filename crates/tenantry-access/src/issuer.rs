//! Login and token issuance

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantry_core::models::{normalize_email, User};
use tenantry_core::AppError;

use crate::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::password::{verify_against_dummy, verify_password, warm_dummy_hash};
use crate::store::{Store, TenantStore, UserStore};
use crate::token::{IssuedToken, TokenSigner};

#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn Store>,
    signer: TokenSigner,
    audit: Arc<dyn AuditSink>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner, audit: Arc<dyn AuditSink>) -> Self {
        warm_dummy_hash();
        Self {
            store,
            signer,
            audit,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AppError> {
        self.login_at(email, password, Utc::now()).await
    }

    /// Verify credentials and issue a token valid from `now`.
    ///
    /// Unknown email, wrong password and a non-active tenant all fail with the same
    /// `InvalidCredentials`; only the audit record carries the real reason.
    #[tracing::instrument(skip(self, password, now), fields(email = %normalize_email(email)))]
    pub async fn login_at(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let email = normalize_email(email);

        let Some(user) = self.store.get_user_by_email(&email).await? else {
            verify_against_dummy(password);
            return Err(self.reject(&email, None, "unknown email"));
        };

        if !verify_password(password, &user.password_hash) {
            return Err(self.reject(&email, Some(&user), "wrong password"));
        }

        if let Some(tenant_id) = user.tenant_id {
            let active = self
                .store
                .get_tenant(tenant_id)
                .await?
                .is_some_and(|t| t.is_active());
            if !active {
                return Err(self.reject(&email, Some(&user), "tenant missing or suspended"));
            }
        }

        let issued = self.signer.sign_at(user.id, user.tenant_id, user.role, now)?;

        let mut entry = AuditRecord::new(AuditEventType::LoginSucceeded)
            .with_actor_user(user.id, user.tenant_id);
        entry.actor_role = Some(user.role);
        self.audit.record(entry);
        tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");

        Ok(issued)
    }

    fn reject(&self, email: &str, user: Option<&User>, reason: &str) -> AppError {
        tracing::debug!(reason = reason, "Login rejected");
        let mut entry = AuditRecord::new(AuditEventType::LoginFailed)
            .with_details(serde_json::json!({ "email": email }))
            .with_failure(reason);
        if let Some(user) = user {
            entry = entry.with_actor_user(user.id, user.tenant_id);
        }
        self.audit.record(entry);
        AppError::InvalidCredentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingAuditSink;
    use crate::password::{dummy_hash_ready, hash_password};
    use crate::store::{MemoryStore, TenantStore, UserStore};
    use tenantry_core::models::{NewTenant, NewUser, Role, SubscriptionTier, TenantStatus};

    const SECRET: &str = "an-adequately-long-test-secret-for-hs256";

    async fn setup() -> (CredentialIssuer, MemoryStore, Arc<RecordingAuditSink>, uuid::Uuid) {
        let store = MemoryStore::new();
        let tenant = store
            .create_tenant(NewTenant {
                name: "Demo".to_string(),
                subdomain: "demo".to_string(),
                subscription_tier: SubscriptionTier::Free,
                max_users: 5,
                max_projects: 5,
            })
            .await
            .unwrap();
        store
            .create_user(NewUser {
                tenant_id: Some(tenant.id),
                email: "alice@demo.test".to_string(),
                password_hash: hash_password("s3cret-pass").unwrap(),
                role: Role::TenantAdmin,
            })
            .await
            .unwrap();

        let sink = Arc::new(RecordingAuditSink::new());
        let issuer = CredentialIssuer::new(
            Arc::new(store.clone()),
            TokenSigner::new(SECRET).unwrap(),
            sink.clone(),
        );
        (issuer, store, sink, tenant.id)
    }

    #[tokio::test]
    async fn test_login_issues_token_with_tenant_and_role() {
        let (issuer, _, sink, tenant_id) = setup().await;
        let issued = issuer.login("  Alice@Demo.test ", "s3cret-pass").await.unwrap();

        assert_eq!(issued.claims.tenant_id, Some(tenant_id));
        assert_eq!(issued.claims.role, Role::TenantAdmin);
        assert_eq!(sink.entries_of(AuditEventType::LoginSucceeded).len(), 1);
    }

    #[tokio::test]
    async fn test_dummy_hash_is_ready_before_first_login() {
        let (_issuer, _, sink, _) = setup().await;
        assert!(dummy_hash_ready());
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let (issuer, _, sink, _) = setup().await;

        let unknown = issuer.login("nobody@demo.test", "s3cret-pass").await.unwrap_err();
        let wrong = issuer.login("alice@demo.test", "wrong-pass").await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(sink.entries_of(AuditEventType::LoginFailed).len(), 2);
    }

    #[tokio::test]
    async fn test_suspended_tenant_cannot_login() {
        let (issuer, store, _, tenant_id) = setup().await;
        store
            .set_tenant_status(tenant_id, TenantStatus::Suspended)
            .await
            .unwrap();

        assert!(matches!(
            issuer.login("alice@demo.test", "s3cret-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
