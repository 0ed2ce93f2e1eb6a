use crate::auth::models::{AuthContext, LoginRequest, LoginResponse, MeResponse};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::ClientIp;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tenantry_core::AppError;

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts from this address", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, client_ip, request), fields(client_ip = %client_ip.0))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpAppError> {
    let limiter = &state.auth_failure_limiter;
    if limiter.is_blocked(&client_ip.0).await {
        return Err(too_many_attempts());
    }

    match state.gateway.login(&request.email, &request.password).await {
        Ok(issued) => Ok(Json(LoginResponse::from(issued))),
        Err(AppError::InvalidCredentials) => {
            if limiter.record_failure(&client_ip.0).await {
                tracing::warn!(client_ip = %client_ip.0, "Login failure limit reached");
                return Err(too_many_attempts());
            }
            Err(AppError::InvalidCredentials.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn too_many_attempts() -> HttpAppError {
    HttpAppError(AppError::TooManyRequests(
        "Too many failed login attempts".to_string(),
    ))
}

/// Identity of the presented token
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Resolved context", body = MeResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(AuthContext(ctx): AuthContext) -> Json<MeResponse> {
    Json(MeResponse::from(&ctx))
}
