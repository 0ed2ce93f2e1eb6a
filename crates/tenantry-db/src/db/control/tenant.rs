use sqlx::{PgPool, Postgres};
use tenantry_core::models::{NewTenant, ResourceKind, Tenant, TenantSettingsUpdate, TenantStatus};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::db_error;
use crate::db::transaction::TransactionGuard;

/// Repository for tenants and their counter rows
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select", db.record_id = %id))]
    pub async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            r#"
            SELECT id, name, subdomain, subscription_tier, max_users, max_projects, status,
                   created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "tenant"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            r#"
            SELECT id, name, subdomain, subscription_tier, max_users, max_projects, status,
                   created_at, updated_at
            FROM tenants
            ORDER BY created_at ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "tenant"))
    }

    /// Insert the tenant and one zeroed counter per resource kind in a single transaction.
    #[tracing::instrument(skip(self, tenant), fields(db.table = "tenants", db.operation = "insert", subdomain = %tenant.subdomain))]
    pub async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let created = sqlx::query_as::<Postgres, Tenant>(
            r#"
            INSERT INTO tenants (name, subdomain, subscription_tier, max_users, max_projects)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, subdomain, subscription_tier, max_users, max_projects, status,
                      created_at, updated_at
            "#,
        )
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(tenant.subscription_tier)
        .bind(tenant.max_users)
        .bind(tenant.max_projects)
        .fetch_one(tx.conn()?)
        .await
        .map_err(|e| db_error(e, "subdomain"))?;

        for kind in ResourceKind::ALL {
            sqlx::query(
                "INSERT INTO tenant_resource_counters (tenant_id, kind, used) VALUES ($1, $2, 0)",
            )
            .bind(created.id)
            .bind(kind)
            .execute(tx.conn()?)
            .await
            .map_err(|e| db_error(e, "resource counter"))?;
        }

        tx.commit().await?;
        tracing::info!(tenant_id = %created.id, "Tenant inserted");
        Ok(created)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn update_tenant_settings(
        &self,
        id: Uuid,
        update: &TenantSettingsUpdate,
    ) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET name = COALESCE($2, name),
                subscription_tier = COALESCE($3, subscription_tier),
                max_users = COALESCE($4, max_users),
                max_projects = COALESCE($5, max_projects),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, subdomain, subscription_tier, max_users, max_projects, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.subscription_tier)
        .bind(update.max_users)
        .bind(update.max_projects)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "tenant"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn set_tenant_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, subdomain, subscription_tier, max_users, max_projects, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "tenant"))
    }
}
