use sqlx::{PgPool, Postgres};
use tenantry_core::models::{NewTask, Task, TaskUpdate};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::db_error;

/// Repository for tasks (tenant-scoped)
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The `(project_id, tenant_id)` foreign key rejects a project of another tenant.
    #[tracing::instrument(skip(self, task), fields(db.table = "tasks", db.operation = "insert", tenant_id = %task.tenant_id))]
    pub async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        sqlx::query_as::<Postgres, Task>(
            r#"
            INSERT INTO tasks (tenant_id, project_id, title, status, created_by, assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, tenant_id, project_id, title, status, created_by, assignee_id,
                      created_at, updated_at
            "#,
        )
        .bind(task.tenant_id)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(task.status)
        .bind(task.created_by)
        .bind(task.assignee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, "project"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "select", db.record_id = %id))]
    pub async fn get_task(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT id, tenant_id, project_id, title, status, created_by, assignee_id,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "task"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "select"))]
    pub async fn list_tasks(
        &self,
        tenant_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Task>, AppError> {
        sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT id, tenant_id, project_id, title, status, created_by, assignee_id,
                   created_at, updated_at
            FROM tasks
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR project_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "task"))
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "tasks", db.operation = "update", db.record_id = %id))]
    pub async fn update_task(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        // $5 distinguishes "leave assignee" from "set assignee to $6 (possibly NULL)".
        sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                status = COALESCE($4, status),
                assignee_id = CASE WHEN $5 THEN $6 ELSE assignee_id END,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, project_id, title, status, created_by, assignee_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(update.title.as_deref())
        .bind(update.status)
        .bind(update.assignee_id.is_some())
        .bind(update.assignee_id.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "task"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_task(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "task"))?;

        Ok(result.rows_affected() > 0)
    }
}
