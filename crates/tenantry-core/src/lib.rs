//! Tenantry Core Library
//!
//! Domain models, error types and configuration shared by every Tenantry crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, QuotaTiers, StoreBackend, TenantryConfig, TierLimits};
pub use error::{AppError, ErrorMetadata, LogLevel};
