use sqlx::{PgPool, Postgres};
use tenantry_core::models::{NewProject, Project, ProjectUpdate};
use tenantry_core::AppError;
use uuid::Uuid;

use crate::db::db_error;

/// Repository for projects (tenant-scoped)
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, project), fields(db.table = "projects", db.operation = "insert", tenant_id = %project.tenant_id))]
    pub async fn create_project(&self, project: NewProject) -> Result<Project, AppError> {
        sqlx::query_as::<Postgres, Project>(
            r#"
            INSERT INTO projects (tenant_id, name, description, owner_id, assignee_ids)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, tenant_id, name, description, owner_id, assignee_ids, created_at, updated_at
            "#,
        )
        .bind(project.tenant_id)
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.owner_id)
        .bind(&project.assignee_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, "tenant"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "select", db.record_id = %id))]
    pub async fn get_project(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Project>, AppError> {
        sqlx::query_as::<Postgres, Project>(
            r#"
            SELECT id, tenant_id, name, description, owner_id, assignee_ids, created_at, updated_at
            FROM projects
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "project"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "select"))]
    pub async fn list_projects(&self, tenant_id: Uuid) -> Result<Vec<Project>, AppError> {
        sqlx::query_as::<Postgres, Project>(
            r#"
            SELECT id, tenant_id, name, description, owner_id, assignee_ids, created_at, updated_at
            FROM projects
            WHERE tenant_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "project"))
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "projects", db.operation = "update", db.record_id = %id))]
    pub async fn update_project(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: &ProjectUpdate,
    ) -> Result<Option<Project>, AppError> {
        sqlx::query_as::<Postgres, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                assignee_ids = COALESCE($5, assignee_ids),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, name, description, owner_id, assignee_ids, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.assignee_ids.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "project"))
    }

    /// Tasks go with the project through the cascading foreign key.
    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_project(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "project"))?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "projects", db.operation = "select", db.record_id = %id))]
    pub async fn project_tenant(&self, id: Uuid) -> Result<Option<Uuid>, AppError> {
        sqlx::query_scalar::<Postgres, Uuid>("SELECT tenant_id FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, "project"))
    }
}
