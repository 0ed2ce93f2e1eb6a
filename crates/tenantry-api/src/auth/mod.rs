pub mod middleware;
pub mod models;

pub use middleware::{auth_middleware, AuthFailureLimiter};
pub use models::AuthContext;
