//! Route configuration and setup.

mod health;

use crate::auth::auth_middleware;
use crate::constants::{api_path, HTTP_CONCURRENCY_LIMIT, MAX_BODY_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tenantry_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    spawn_limiter_cleanup(&state);

    let protected = protected_routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let error_details = axum::middleware::from_fn_with_state(
        state.error_details,
        crate::error::error_details_middleware,
    );

    let app = public_routes()
        .merge(protected)
        .layer(error_details)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Periodically forget expired login failure windows.
fn spawn_limiter_cleanup(state: &Arc<AppState>) {
    let limiter = state.auth_failure_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup_expired().await;
        }
    });
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .route(&api_path("/auth/login"), post(handlers::auth::login))
}

fn protected_routes() -> Router<Arc<AppState>> {
    use handlers::{auth, projects, tasks, tenants, users};

    Router::new()
        .route(&api_path("/auth/me"), get(auth::me))
        .route(
            &api_path("/tenants"),
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            &api_path("/tenants/{tenant_id}"),
            get(tenants::get_tenant).patch(tenants::update_tenant),
        )
        .route(
            &api_path("/tenants/{tenant_id}/status"),
            put(tenants::set_tenant_status),
        )
        .route(
            &api_path("/tenants/{tenant_id}/usage"),
            get(tenants::get_usage),
        )
        .route(
            &api_path("/tenants/{tenant_id}/users"),
            get(users::list_users).post(users::create_user),
        )
        .route(
            &api_path("/tenants/{tenant_id}/users/{user_id}"),
            axum::routing::delete(users::delete_user),
        )
        .route(
            &api_path("/tenants/{tenant_id}/users/{user_id}/role"),
            put(users::update_user_role),
        )
        .route(
            &api_path("/tenants/{tenant_id}/projects"),
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            &api_path("/tenants/{tenant_id}/projects/{project_id}"),
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            &api_path("/tenants/{tenant_id}/projects/{project_id}/tasks"),
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route(
            &api_path("/tenants/{tenant_id}/tasks/{task_id}"),
            axum::routing::patch(tasks::update_task).delete(tasks::delete_task),
        )
}
