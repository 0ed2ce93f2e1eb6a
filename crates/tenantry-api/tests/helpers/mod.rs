//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs on the in-memory store, so these tests need no external services:
//! `cargo test -p tenantry-api`.

#![allow(dead_code)]

pub mod auth;

use axum_test::TestServer;
use std::sync::Arc;
use tenantry_access::{Gateway, MemoryStore, RecordingAuditSink};
use tenantry_api::auth::AuthFailureLimiter;
use tenantry_api::constants;
use tenantry_api::error::ErrorDetailPolicy;
use tenantry_api::setup::routes;
use tenantry_api::state::AppState;
use tenantry_core::{BaseConfig, Config, QuotaTiers, StoreBackend, TenantryConfig};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";
pub const AUTH_FAILURE_MAX_ATTEMPTS: u32 = 5;

/// API path prefix for tests (e.g. `/api/v1/tenants`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus direct handles on the store and the audit trail.
pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryStore,
    pub audit: Arc<RecordingAuditSink>,
    pub root_token: String,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn create_test_config() -> Config {
    Config(Box::new(TenantryConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            auth_failure_max_attempts: AUTH_FAILURE_MAX_ATTEMPTS,
            auth_failure_window_secs: 900,
            trusted_proxy_count: 1,
        },
        store_backend: StoreBackend::Memory,
        database_url: None,
        quota_tiers: QuotaTiers::default(),
        superadmin_email: Some(auth::ROOT_EMAIL.to_string()),
        superadmin_password: Some(auth::ROOT_PASSWORD.to_string()),
    }))
}

/// Setup test app with a fresh in-memory store and a bootstrapped super admin.
pub async fn setup_test_app() -> TestApp {
    let config = create_test_config();
    config.validate().expect("Test config must be valid");

    let store = MemoryStore::new();
    let audit = Arc::new(RecordingAuditSink::new());
    let gateway = Gateway::new(
        Arc::new(store.clone()),
        audit.clone(),
        config.jwt_secret(),
        config.quota_tiers().clone(),
    )
    .expect("Failed to build gateway");

    tenantry_api::setup::bootstrap::bootstrap_super_admin(&config, &gateway)
        .await
        .expect("Failed to bootstrap super admin");

    let state = Arc::new(AppState {
        gateway,
        auth_failure_limiter: Arc::new(AuthFailureLimiter::new(
            config.auth_failure_max_attempts(),
            config.auth_failure_window_secs(),
        )),
        trusted_proxy_count: config.trusted_proxy_count(),
        error_details: ErrorDetailPolicy::from_config(&config),
        pool: None,
    });

    let router = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    let root_token = auth::login(&server, auth::ROOT_EMAIL, auth::ROOT_PASSWORD).await;

    TestApp {
        server,
        store,
        audit,
        root_token,
    }
}
