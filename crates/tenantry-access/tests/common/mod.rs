use std::sync::Arc;

use tenantry_access::{
    AccessRequest, Action, Gateway, MemoryStore, NewTenantInput, RecordingAuditSink,
};
use tenantry_core::models::{SubscriptionTier, Tenant};
use tenantry_core::QuotaTiers;

pub const SECRET: &str = "integration-test-secret-with-enough-length";
pub const ROOT_EMAIL: &str = "root@tenantry.test";
pub const ROOT_PASSWORD: &str = "root-password";
pub const PASSWORD: &str = "member-password";

pub struct Harness {
    pub gateway: Gateway,
    pub store: MemoryStore,
    pub audit: Arc<RecordingAuditSink>,
    pub root_token: String,
}

pub async fn harness() -> Harness {
    let store = MemoryStore::new();
    let audit = Arc::new(RecordingAuditSink::new());
    let gateway = Gateway::new(
        Arc::new(store.clone()),
        audit.clone(),
        SECRET,
        QuotaTiers::default(),
    )
    .unwrap();
    gateway
        .bootstrap_super_admin(ROOT_EMAIL, ROOT_PASSWORD)
        .await
        .unwrap();
    let root_token = gateway.login(ROOT_EMAIL, ROOT_PASSWORD).await.unwrap().token;

    Harness {
        gateway,
        store,
        audit,
        root_token,
    }
}

impl Harness {
    /// Register a tenant as the super admin and log its admin in.
    pub async fn tenant(
        &self,
        subdomain: &str,
        max_users: Option<i64>,
        max_projects: Option<i64>,
    ) -> (Tenant, String) {
        let admin_email = format!("admin@{}.test", subdomain);
        let grant = self
            .gateway
            .guard(&self.root_token, AccessRequest::system(Action::TenantCreate))
            .await
            .unwrap();
        let (tenant, _) = grant
            .create_tenant(NewTenantInput {
                name: subdomain.to_string(),
                subdomain: subdomain.to_string(),
                subscription_tier: SubscriptionTier::Free,
                max_users,
                max_projects,
                admin_email: admin_email.clone(),
                admin_password: PASSWORD.to_string(),
            })
            .await
            .unwrap();

        let token = self.gateway.login(&admin_email, PASSWORD).await.unwrap().token;
        (tenant, token)
    }
}
