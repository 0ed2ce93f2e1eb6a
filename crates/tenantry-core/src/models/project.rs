use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Project entity. `tenant_id` is inherited from the creator's context and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub assignee_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Owner or listed assignee.
    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.assignee_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee_ids: Option<Vec<Uuid>>,
}
