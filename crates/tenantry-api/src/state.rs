//! Application state shared by every handler.

use std::sync::Arc;

use sqlx::PgPool;
use tenantry_access::Gateway;

use crate::auth::middleware::AuthFailureLimiter;
use crate::error::ErrorDetailPolicy;

pub struct AppState {
    /// The only way handlers reach tenant data.
    pub gateway: Gateway,
    pub auth_failure_limiter: Arc<AuthFailureLimiter>,
    /// Number of reverse proxies whose `X-Forwarded-For` entries are trusted.
    pub trusted_proxy_count: usize,
    pub error_details: ErrorDetailPolicy,
    /// Present when the Postgres store is in use; pinged by the health check.
    pub pool: Option<PgPool>,
}
