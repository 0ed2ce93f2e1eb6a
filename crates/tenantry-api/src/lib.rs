//! Tenantry API Library
//!
//! HTTP surface of the access-control service: routes, bearer-token middleware, handlers
//! and application setup. Every handler reaches tenant data only through a
//! [`tenantry_access::Grant`] obtained from the gateway.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
