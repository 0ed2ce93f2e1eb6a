pub mod auth;
pub mod projects;
pub mod tasks;
pub mod tenants;
pub mod users;

use tenantry_access::permission::capability;
use tenantry_access::{Action, Capability, RequestContext};

/// Whether `action` is granted to this caller only on resources they own, in which case
/// the handler has to load the resource before asking the gateway.
pub(crate) fn needs_ownership(ctx: &RequestContext, action: Action) -> bool {
    capability(ctx.role(), action) == Capability::IfOwner
}
