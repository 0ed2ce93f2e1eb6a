//! Signed session tokens (HS256)

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tenantry_core::constants::{MIN_JWT_SECRET_LEN, TOKEN_LIFETIME_HOURS};
use tenantry_core::models::Role;
use tenantry_core::AppError;
use uuid::Uuid;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// User ID
    pub sub: Uuid,
    /// `None` only for the super admin.
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub claims: TokenClaims,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(AppError::InvalidInput(format!(
                "JWT secret must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }

        // Expiry is checked against the caller's clock in `verify_at`, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn sign(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
    ) -> Result<IssuedToken, AppError> {
        self.sign_at(user_id, tenant_id, role, Utc::now())
    }

    /// Issue a token valid from `now` (truncated to whole seconds) for exactly
    /// [`TOKEN_LIFETIME_HOURS`].
    pub fn sign_at(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let iat = now.timestamp();
        let exp = iat + Duration::hours(TOKEN_LIFETIME_HOURS).num_seconds();
        let claims = TokenClaims {
            sub: user_id,
            tenant_id,
            role,
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            claims,
        })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature and validity window. A token is accepted while
    /// `iat <= now < exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AppError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::Unauthenticated("Invalid token signature".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                        AppError::Unauthenticated("Unsupported token algorithm".to_string())
                    }
                    _ => AppError::Unauthenticated(format!("Malformed token: {}", e)),
                }
            },
        )?;

        let claims = data.claims;
        let now = now.timestamp();
        if now >= claims.exp {
            return Err(AppError::Unauthenticated("Token has expired".to_string()));
        }
        if claims.iat > now {
            return Err(AppError::Unauthenticated(
                "Token issued in the future".to_string(),
            ));
        }

        Ok(claims)
    }
}
