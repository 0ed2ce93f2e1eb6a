//! Application setup and initialization

pub mod bootstrap;
pub mod database;
pub mod routes;
pub mod server;

use crate::auth::AuthFailureLimiter;
use crate::error::ErrorDetailPolicy;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tenantry_access::{Gateway, MemoryStore, Store, TracingAuditSink};
use tenantry_core::{Config, StoreBackend};
use tenantry_db::PgStore;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let (store, pool) = match config.store_backend() {
        StoreBackend::Postgres => {
            let pool = database::setup_database(&config).await?;
            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            (store, Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let gateway = Gateway::new(
        store,
        Arc::new(TracingAuditSink),
        config.jwt_secret(),
        config.quota_tiers().clone(),
    )
    .context("Failed to build the authorization gateway")?;

    bootstrap::bootstrap_super_admin(&config, &gateway).await?;

    let auth_failure_limiter = Arc::new(AuthFailureLimiter::new(
        config.auth_failure_max_attempts(),
        config.auth_failure_window_secs(),
    ));

    let state = Arc::new(AppState {
        gateway,
        auth_failure_limiter,
        trusted_proxy_count: config.trusted_proxy_count(),
        error_details: ErrorDetailPolicy::from_config(&config),
        pool,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
