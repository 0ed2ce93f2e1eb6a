//! Tenantry Database Layer
//!
//! PostgreSQL repositories and [`PgStore`], the sqlx implementation of the storage ports
//! defined in `tenantry-access`.

pub mod db;
pub mod store;

pub use db::transaction::TransactionGuard;
pub use db::{
    ProjectRepository, QuotaRepository, TaskRepository, TenantRepository, UserRepository,
};
pub use store::PgStore;
