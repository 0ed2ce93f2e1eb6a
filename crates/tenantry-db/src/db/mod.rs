//! Database repositories
//!
//! control/ holds the tenancy tables (tenants, users, resource counters), workspace/ the
//! tenant-owned data (projects, tasks). Every tenant-owned query filters on `tenant_id`.

pub mod control;
pub mod transaction;
pub mod workspace;

pub use control::{QuotaRepository, TenantRepository, UserRepository};
pub use workspace::{ProjectRepository, TaskRepository};

use tenantry_core::AppError;

/// Map a sqlx error, turning constraint violations into client errors.
pub(crate) fn db_error(e: sqlx::Error, what: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("{} already exists", what));
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(format!("Referenced {} not found", what));
        }
    }
    tracing::error!(error = %e, "Database query failed");
    AppError::Database(e)
}
