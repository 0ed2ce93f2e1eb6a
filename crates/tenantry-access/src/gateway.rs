//! Authorization gateway
//!
//! The single entry point for obtaining a trusted context and, through the returned
//! [`Grant`], access to tenant data: `guard` resolves the bearer token, evaluates the
//! permission and reserves quota for creations, in that order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantry_core::models::{normalize_email, NewUser, ResourceKind, Role, User};
use tenantry_core::{AppError, QuotaTiers};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::context::RequestContext;
use crate::grant::Grant;
use crate::issuer::CredentialIssuer;
use crate::password::{hash_password, validate_password};
use crate::permission::{Action, OwnershipCheck, PermissionEvaluator, TenantScope};
use crate::quota::QuotaEnforcer;
use crate::resolver::ContextResolver;
use crate::store::{Store, UserStore};
use crate::token::{IssuedToken, TokenSigner};

/// What the caller wants to do, and on which tenant.
pub struct AccessRequest {
    action: Action,
    scope: TenantScope,
    ownership: Option<Box<OwnershipCheck>>,
}

impl AccessRequest {
    /// An action on the data of `tenant_id`.
    pub fn tenant(action: Action, tenant_id: Uuid) -> Self {
        Self {
            action,
            scope: TenantScope::Tenant(tenant_id),
            ownership: None,
        }
    }

    /// A tenant-less action, such as listing or registering tenants.
    pub fn system(action: Action) -> Self {
        Self {
            action,
            scope: TenantScope::System,
            ownership: None,
        }
    }

    /// Ownership predicate consulted for `IfOwner` capabilities.
    pub fn owned_if<F>(mut self, check: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.ownership = Some(Box::new(check));
        self
    }

    /// Ownership already established by the caller.
    pub fn owned(self, owned: bool) -> Self {
        self.owned_if(move |_| owned)
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn scope(&self) -> TenantScope {
        self.scope
    }

    /// Quota-counted resource this request will create in its target tenant.
    pub fn creates(&self) -> Option<ResourceKind> {
        match self.scope {
            TenantScope::Tenant(_) => self.action.quota_kind(),
            TenantScope::System => None,
        }
    }
}

impl std::fmt::Debug for AccessRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessRequest")
            .field("action", &self.action)
            .field("scope", &self.scope)
            .field("ownership", &self.ownership.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn Store>,
    issuer: CredentialIssuer,
    resolver: ContextResolver,
    evaluator: PermissionEvaluator,
    quota: QuotaEnforcer,
    audit: Arc<dyn AuditSink>,
    tiers: QuotaTiers,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
        jwt_secret: &str,
        tiers: QuotaTiers,
    ) -> Result<Self, AppError> {
        let signer = TokenSigner::new(jwt_secret)?;
        Ok(Self {
            issuer: CredentialIssuer::new(store.clone(), signer.clone(), audit.clone()),
            resolver: ContextResolver::new(store.clone(), signer, audit.clone()),
            evaluator: PermissionEvaluator::new(audit.clone()),
            quota: QuotaEnforcer::new(store.clone(), audit.clone()),
            store,
            audit,
            tiers,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AppError> {
        self.issuer.login(email, password).await
    }

    pub async fn login_at(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        self.issuer.login_at(email, password, now).await
    }

    pub async fn resolve(&self, token: &str) -> Result<RequestContext, AppError> {
        self.resolver.resolve(token).await
    }

    pub async fn resolve_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestContext, AppError> {
        self.resolver.resolve_at(token, now).await
    }

    /// Resolve, authorize and (for creations) reserve quota.
    pub async fn guard(&self, token: &str, request: AccessRequest) -> Result<Grant, AppError> {
        let ctx = self.resolve(token).await?;
        self.authorize(&ctx, request).await
    }

    pub async fn guard_at(
        &self,
        token: &str,
        request: AccessRequest,
        now: DateTime<Utc>,
    ) -> Result<Grant, AppError> {
        let ctx = self.resolve_at(token, now).await?;
        self.authorize(&ctx, request).await
    }

    /// Authorize an already resolved context.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user_id(), action = %request.action()))]
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        request: AccessRequest,
    ) -> Result<Grant, AppError> {
        self.evaluator.authorize(
            ctx,
            request.action,
            request.scope,
            request.ownership.as_deref(),
        )?;

        let reservation = match (request.creates(), request.scope) {
            (Some(kind), TenantScope::Tenant(tenant_id)) => {
                Some(self.quota.reserve(ctx, request.action, tenant_id, kind).await?)
            }
            _ => None,
        };

        Ok(Grant::new(
            ctx.clone(),
            request.action,
            request.scope,
            reservation,
            self.store.clone(),
            self.quota.clone(),
            self.audit.clone(),
            self.tiers.clone(),
        ))
    }

    /// Create the system super admin if it does not exist yet.
    ///
    /// Idempotent for an existing super admin with the same email; an email already used by
    /// a tenant user is a conflict.
    pub async fn bootstrap_super_admin(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        if let Some(existing) = self.store.get_user_by_email(&email).await? {
            if existing.role == Role::SuperAdmin {
                tracing::info!(user_id = %existing.id, "Super admin already present");
                return Ok(existing);
            }
            return Err(AppError::Conflict(format!(
                "Email '{}' belongs to a tenant user",
                email
            )));
        }

        validate_password(password)?;
        let user = self
            .store
            .create_user(NewUser {
                tenant_id: None,
                email,
                password_hash: hash_password(password)?,
                role: Role::SuperAdmin,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Super admin created");
        Ok(user)
    }
}
