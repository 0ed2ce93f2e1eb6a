pub mod quota;
pub mod tenant;
pub mod user;

pub use quota::QuotaRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
