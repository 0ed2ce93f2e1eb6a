use sqlx::{PgPool, Postgres};
use tenantry_core::models::{NewUser, Role, User};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::db_error;

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "user"))
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "users", db.operation = "select"))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "user"))
    }

    #[tracing::instrument(skip(self, user), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (tenant_id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tenant_id, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(user.tenant_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, "email"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE tenant_id = $1
            ORDER BY created_at ASC, email ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "user"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    pub async fn update_user_role(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET role = $3, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $1
            RETURNING id, tenant_id, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "user"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "delete", db.record_id = %user_id))]
    pub async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $2 AND tenant_id = $1")
            .bind(tenant_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "user"))?;

        Ok(result.rows_affected() > 0)
    }
}
