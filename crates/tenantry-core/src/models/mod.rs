pub mod project;
pub mod task;
pub mod tenant;
pub mod user;

pub use project::{NewProject, Project, ProjectUpdate};
pub use task::{NewTask, Task, TaskStatus, TaskUpdate};
pub use tenant::{
    NewTenant, ResourceKind, ResourceUsage, SubscriptionTier, Tenant, TenantSettingsUpdate,
    TenantStatus,
};
pub use user::{normalize_email, NewUser, Role, User};
