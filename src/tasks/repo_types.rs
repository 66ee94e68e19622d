use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::PublicUser;

/// Task record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid, // fixed at creation
    pub title: String,
    pub description: String,
    pub status: String, // free-form
    pub deadline: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Join row linking a task to a user responsible for it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskAssignment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: OffsetDateTime,
}

/// One assignee of one task, already projected to public fields.
#[derive(Debug, Clone, FromRow)]
pub struct AssigneeRow {
    pub task_id: Uuid,
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl AssigneeRow {
    pub fn into_public(self) -> (Uuid, PublicUser) {
        (
            self.task_id,
            PublicUser {
                id: self.id,
                username: self.username,
                email: self.email,
            },
        )
    }
}

/// Field values written by create and update.
#[derive(Debug, Clone)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: String,
    pub deadline: OffsetDateTime,
}
