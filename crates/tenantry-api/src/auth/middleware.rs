use crate::auth::models::AuthContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tenantry_core::AppError;
use tokio::sync::Mutex;

/// Counts failed login attempts per client IP within a fixed window.
#[derive(Clone)]
pub struct AuthFailureLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Returns `true` once the IP has reached the failure limit.
    pub async fn record_failure(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let (count, reset_at) = guard.entry(ip.to_string()).or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    pub async fn is_blocked(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(ip) {
            if Instant::now() >= *reset_at {
                guard.remove(ip);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }

    /// Drop windows that have already expired.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.inner
            .lock()
            .await
            .retain(|_, (_, reset_at)| now < *reset_at);
    }
}

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("malformed authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("invalid authorization header format".to_string()))
}

/// Resolve the bearer token into a [`AuthContext`] stored in the request extensions.
///
/// Every failure renders the same 401 body; the reason only reaches the logs and the
/// audit trail.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match bearer_token(&request) {
        Ok(token) => state.gateway.resolve(token).await,
        Err(e) => Err(e),
    };

    match context {
        Ok(context) => {
            tracing::debug!(
                user_id = %context.user_id(),
                tenant_id = ?context.tenant_id(),
                role = %context.role(),
                "Request authenticated"
            );
            request.extensions_mut().insert(AuthContext(context));
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
