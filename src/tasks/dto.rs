use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::PublicUser;
use crate::tasks::repo_types::Task;

/// Body for creating or updating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    /// `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
    pub deadline: String,
    #[serde(default)]
    pub assigned_to: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub assigned_to: Vec<PublicUser>,
}

impl TaskResponse {
    pub fn new(task: Task, assigned_to: Vec<PublicUser>) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            deadline: task.deadline,
            created_at: task.created_at,
            updated_at: task.updated_at,
            assigned_to,
        }
    }
}
