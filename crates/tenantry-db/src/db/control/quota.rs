//! Resource counters
//!
//! The increment is one conditional `UPDATE`: the row lock on
//! `(tenant_id, kind)` serializes concurrent reservations for the same tenant, and the
//! `WHERE used < limit` predicate is re-evaluated after the lock is acquired, so two
//! requests can never both take the last slot.

use sqlx::{PgPool, Postgres};
use tenantry_access::CounterUpdate;
use tenantry_core::models::ResourceKind;
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::db_error;

#[derive(Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenant_resource_counters", db.operation = "select"))]
    pub async fn count_resources(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<Postgres, i64>(
            "SELECT used FROM tenant_resource_counters WHERE tenant_id = $1 AND kind = $2",
        )
        .bind(tenant_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "resource counter"))?
        .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenant_resource_counters", db.operation = "update"))]
    pub async fn increment_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<CounterUpdate, AppError> {
        let incremented = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            UPDATE tenant_resource_counters c
            SET used = c.used + 1
            FROM tenants t
            WHERE c.tenant_id = $1
              AND c.kind = $2
              AND t.id = c.tenant_id
              AND c.used < CASE c.kind WHEN 'user' THEN t.max_users ELSE t.max_projects END
            RETURNING c.used,
                      CASE c.kind WHEN 'user' THEN t.max_users ELSE t.max_projects END AS quota_limit
            "#,
        )
        .bind(tenant_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "resource counter"))?;

        if let Some((current, limit)) = incremented {
            return Ok(CounterUpdate::Incremented { current, limit });
        }

        // No row updated: either the limit is reached or the tenant does not exist.
        let observed = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            SELECT c.used,
                   CASE c.kind WHEN 'user' THEN t.max_users ELSE t.max_projects END AS quota_limit
            FROM tenant_resource_counters c
            JOIN tenants t ON t.id = c.tenant_id
            WHERE c.tenant_id = $1 AND c.kind = $2
            "#,
        )
        .bind(tenant_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "resource counter"))?;

        match observed {
            Some((current, limit)) => Ok(CounterUpdate::LimitReached { current, limit }),
            None => Err(AppError::NotFound(format!("Tenant {} not found", tenant_id))),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenant_resource_counters", db.operation = "update"))]
    pub async fn decrement_resource_count(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_resource_counters
            SET used = used - 1
            WHERE tenant_id = $1 AND kind = $2 AND used > 0
            "#,
        )
        .bind(tenant_id)
        .bind(kind)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, "resource counter"))?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                tenant_id = %tenant_id,
                kind = %kind,
                "Resource counter already at zero, decrement ignored"
            );
        }
        Ok(())
    }
}
