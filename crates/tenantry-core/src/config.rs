//! Configuration module
//!
//! Configuration is read once at process start by [`Config::from_env`] and then passed
//! explicitly to every component that needs it (signing secret, quota tiers, storage
//! backend). Nothing here is a process-wide global.

use std::env;
use std::str::FromStr;

use crate::constants::MIN_JWT_SECRET_LEN;
use crate::models::SubscriptionTier;

// Common constants
const SERVER_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const AUTH_FAILURE_MAX_ATTEMPTS: u32 = 10;
const AUTH_FAILURE_WINDOW_SECS: u64 = 900;
const TRUSTED_PROXY_COUNT: usize = 1;

const FREE_MAX_USERS: i64 = 5;
const FREE_MAX_PROJECTS: i64 = 3;
const PROFESSIONAL_MAX_USERS: i64 = 25;
const PROFESSIONAL_MAX_PROJECTS: i64 = 15;
const ENTERPRISE_MAX_USERS: i64 = 100;
const ENTERPRISE_MAX_PROJECTS: i64 = 50;

/// Where tenant data is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!(
                "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

/// Quota limits granted by one subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_users: i64,
    pub max_projects: i64,
}

/// Tier → limits table applied when a tenant is created or changes tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTiers {
    pub free: TierLimits,
    pub professional: TierLimits,
    pub enterprise: TierLimits,
}

impl QuotaTiers {
    pub fn for_tier(&self, tier: SubscriptionTier) -> TierLimits {
        match tier {
            SubscriptionTier::Free => self.free,
            SubscriptionTier::Professional => self.professional,
            SubscriptionTier::Enterprise => self.enterprise,
        }
    }

    fn from_env() -> Self {
        Self {
            free: TierLimits {
                max_users: env_or("FREE_MAX_USERS", FREE_MAX_USERS),
                max_projects: env_or("FREE_MAX_PROJECTS", FREE_MAX_PROJECTS),
            },
            professional: TierLimits {
                max_users: env_or("PROFESSIONAL_MAX_USERS", PROFESSIONAL_MAX_USERS),
                max_projects: env_or("PROFESSIONAL_MAX_PROJECTS", PROFESSIONAL_MAX_PROJECTS),
            },
            enterprise: TierLimits {
                max_users: env_or("ENTERPRISE_MAX_USERS", ENTERPRISE_MAX_USERS),
                max_projects: env_or("ENTERPRISE_MAX_PROJECTS", ENTERPRISE_MAX_PROJECTS),
            },
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        for (tier, limits) in [
            (SubscriptionTier::Free, self.free),
            (SubscriptionTier::Professional, self.professional),
            (SubscriptionTier::Enterprise, self.enterprise),
        ] {
            if limits.max_users < 1 || limits.max_projects < 0 {
                return Err(anyhow::anyhow!(
                    "Quota limits for tier '{}' must allow at least one user and a non-negative project count",
                    tier
                ));
            }
        }
        Ok(())
    }
}

impl Default for QuotaTiers {
    fn default() -> Self {
        Self {
            free: TierLimits {
                max_users: FREE_MAX_USERS,
                max_projects: FREE_MAX_PROJECTS,
            },
            professional: TierLimits {
                max_users: PROFESSIONAL_MAX_USERS,
                max_projects: PROFESSIONAL_MAX_PROJECTS,
            },
            enterprise: TierLimits {
                max_users: ENTERPRISE_MAX_USERS,
                max_projects: ENTERPRISE_MAX_PROJECTS,
            },
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
    pub auth_failure_max_attempts: u32,
    pub auth_failure_window_secs: u64,
    pub trusted_proxy_count: usize,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct TenantryConfig {
    pub base: BaseConfig,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub quota_tiers: QuotaTiers,
    pub superadmin_email: Option<String>,
    pub superadmin_password: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<TenantryConfig>);

impl Config {
    fn inner(&self) -> &TenantryConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.inner().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = TenantryConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn auth_failure_max_attempts(&self) -> u32 {
        self.inner().base.auth_failure_max_attempts
    }

    pub fn auth_failure_window_secs(&self) -> u64 {
        self.inner().base.auth_failure_window_secs
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.inner().base.trusted_proxy_count
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.inner().store_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn quota_tiers(&self) -> &QuotaTiers {
        &self.inner().quota_tiers
    }

    /// Super admin bootstrap credentials, when both are configured.
    pub fn superadmin_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.inner().superadmin_email.as_deref(),
            self.inner().superadmin_password.as_deref(),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        }
    }
}

fn env_or<T: FromStr + ToString>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

impl TenantryConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
            auth_failure_max_attempts: env_or(
                "AUTH_FAILURE_MAX_ATTEMPTS",
                AUTH_FAILURE_MAX_ATTEMPTS,
            ),
            auth_failure_window_secs: env_or("AUTH_FAILURE_WINDOW_SECS", AUTH_FAILURE_WINDOW_SECS),
            trusted_proxy_count: env_or("TRUSTED_PROXY_COUNT", TRUSTED_PROXY_COUNT),
        };

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse::<StoreBackend>()?;

        Ok(Self {
            base,
            store_backend,
            database_url: env::var("DATABASE_URL").ok(),
            quota_tiers: QuotaTiers::from_env(),
            superadmin_email: env::var("SUPERADMIN_EMAIL").ok(),
            superadmin_password: env::var("SUPERADMIN_PASSWORD").ok(),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if self.base.db_max_connections == 0 || self.base.db_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "DB_MAX_CONNECTIONS and DB_TIMEOUT_SECONDS must be greater than zero"
            ));
        }

        if self.store_backend == StoreBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string when STORE_BACKEND=postgres"
                    ))
                }
            }
        }

        if self.superadmin_email.is_some() != self.superadmin_password.is_some() {
            return Err(anyhow::anyhow!(
                "SUPERADMIN_EMAIL and SUPERADMIN_PASSWORD must be set together"
            ));
        }

        self.quota_tiers.validate()
    }
}
