//! Fixed values that are part of the access-control contract and therefore not configurable.

/// Lifetime of every issued access token.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Minimum length accepted for the token signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Minimum password length enforced when users are created.
pub const MIN_PASSWORD_LEN: usize = 8;
