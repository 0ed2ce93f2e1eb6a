//! API constants
//!
//! Every route except health checks and the OpenAPI document lives under [`API_PREFIX`].

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Current API version
pub const API_VERSION: &str = "v1";

/// Versioned prefix for all tenant-facing routes
pub const API_PREFIX: &str = "/api/v1";

/// Largest JSON body accepted by any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Requests handled concurrently before new ones wait. Password hashing dominates login cost.
pub const HTTP_CONCURRENCY_LIMIT: usize = 256;

/// Prefix a route path with [`API_PREFIX`].
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_versioned_base() {
        assert_eq!(API_PREFIX, format!("{}/{}", API_BASE, API_VERSION));
        assert_eq!(api_path("/tenants"), "/api/v1/tenants");
    }
}
