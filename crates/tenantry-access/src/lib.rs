//! Tenantry access-control core
//!
//! Every request passes through the [`Gateway`]: the token is resolved into an immutable
//! [`RequestContext`], the [`PermissionEvaluator`] checks the tenant boundary and the role
//! capability table, and creations reserve capacity with the [`QuotaEnforcer`] before any
//! row is written. Storage is only reachable through the [`Grant`] the gateway returns,
//! so a handler cannot touch tenant data with a context it assembled itself.

pub mod audit;
pub mod context;
pub mod gateway;
pub mod grant;
pub mod issuer;
pub mod password;
pub mod permission;
pub mod quota;
pub mod resolver;
pub mod store;
pub mod token;

pub use audit::{AuditEventType, AuditRecord, AuditSink, RecordingAuditSink, TracingAuditSink};
pub use context::RequestContext;
pub use gateway::{AccessRequest, Gateway};
pub use grant::{Grant, NewProjectInput, NewTaskInput, NewTenantInput, NewUserInput};
pub use issuer::CredentialIssuer;
pub use permission::{
    Action, ActionCategory, Capability, OwnershipCheck, PermissionEvaluator, TenantScope,
};
pub use quota::{QuotaEnforcer, Reservation};
pub use resolver::ContextResolver;
pub use store::{
    CounterUpdate, MemoryStore, ProjectStore, QuotaStore, Store, TaskStore, TenantStore,
    UserStore,
};
pub use token::{IssuedToken, TokenClaims, TokenSigner};
