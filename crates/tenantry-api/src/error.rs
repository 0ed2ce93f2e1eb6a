//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Any [`AppError`] converts
//! with `?`, and the status, body and log level all come from its [`ErrorMetadata`].
//!
//! The body rendered by [`HttpAppError`] never carries details. Non-sensitive errors stash a
//! detailed body in the response extensions, and [`error_details_middleware`] swaps it in
//! when the [`ErrorDetailPolicy`] built from the configuration allows it.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tenantry_core::Config;
use serde::{de::DeserializeOwned, Serialize};
use tenantry_core::{AppError, ErrorMetadata, LogLevel};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rules: both IntoResponse and AppError are foreign to this crate).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

/// Whether error responses may include `details` and `error_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDetailPolicy {
    pub expose: bool,
}

impl ErrorDetailPolicy {
    /// Details are exposed everywhere except production.
    pub fn from_config(config: &Config) -> Self {
        Self {
            expose: !config.is_production(),
        }
    }
}

/// Detailed body of a non-sensitive error, waiting for [`error_details_middleware`].
#[derive(Debug, Clone)]
struct DetailedErrorBody(ErrorResponse);

fn error_body(app_error: &AppError, show_details: bool) -> ErrorResponse {
    ErrorResponse {
        error: app_error.client_message(),
        details: show_details.then(|| app_error.detailed_message()),
        error_type: show_details.then(|| app_error.error_type().to_string()),
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        suggested_action: app_error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let mut response = (status, Json(error_body(app_error, false))).into_response();
        // Sensitive errors (authentication, authorization, internals) never expose their reason.
        if !app_error.is_sensitive() {
            response
                .extensions_mut()
                .insert(DetailedErrorBody(error_body(app_error, true)));
        }
        response
    }
}

/// Replace error bodies with their detailed form when the policy allows it.
pub async fn error_details_middleware(
    State(policy): State<ErrorDetailPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let detailed = response.extensions_mut().remove::<DetailedErrorBody>();
    match detailed {
        Some(DetailedErrorBody(body)) if policy.expose => {
            (response.status(), Json(body)).into_response()
        }
        _ => response,
    }
}
