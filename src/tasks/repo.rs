use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{PgStore, StoreError, StoreResult};
use crate::tasks::repo_types::{AssigneeRow, Task, TaskFields};

#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Tasks in projects the user owns, plus tasks the user is assigned to.
    async fn list_tasks_visible_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn list_assignees(&self, task_ids: &[Uuid]) -> StoreResult<Vec<AssigneeRow>>;

    /// Insert the task and its assignments as one unit. Every assignee must be
    /// the owner or a collaborator at commit time, else [`StoreError::NotMember`].
    async fn create_task(
        &self,
        project_id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Task>;

    /// Overwrite the fields and replace the full assignment set as one unit.
    /// `None` when the task does not exist.
    async fn update_task(
        &self,
        id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Option<Task>>;

    /// Remove the task's assignments and then the task as one unit.
    async fn delete_task_cascade(&self, id: Uuid) -> StoreResult<bool>;
}

const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, deadline, created_at, updated_at";

/// Take a share lock on the project row. Collaborator removal takes the
/// exclusive lock, so membership cannot change under an open task write.
async fn lock_project_tx(tx: &mut Transaction<'_, Postgres>, project_id: Uuid) -> StoreResult<()> {
    sqlx::query("SELECT id FROM projects WHERE id = $1 FOR SHARE")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::MissingReference("project"))?;
    Ok(())
}

/// Insert one assignment per user, each guarded by a membership check
/// evaluated inside the transaction.
async fn insert_assignments_tx(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Uuid,
    task_id: Uuid,
    assignees: &[Uuid],
    at: OffsetDateTime,
) -> StoreResult<()> {
    for &user_id in assignees {
        let inserted = sqlx::query(
            r#"
            INSERT INTO task_assignments (task_id, user_id, assigned_at)
            SELECT $1, $2, $3
             WHERE EXISTS (SELECT 1 FROM projects WHERE id = $4 AND owner_id = $2)
                OR EXISTS (
                    SELECT 1 FROM project_collaborators
                     WHERE project_id = $4 AND user_id = $2
                )
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(at)
        .bind(project_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(StoreError::NotMember(user_id));
        }
    }
    Ok(())
}

#[async_trait]
impl TaskRepo for PgStore {
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(task)
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_tasks_visible_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.deadline,
                   t.created_at, t.updated_at
              FROM tasks t
              JOIN projects p ON p.id = t.project_id
             WHERE p.owner_id = $1
                OR t.id IN (SELECT task_id FROM task_assignments WHERE user_id = $1)
             ORDER BY t.created_at ASC, t.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_assignees(&self, task_ids: &[Uuid]) -> StoreResult<Vec<AssigneeRow>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT ta.task_id, u.id, u.username, u.email
              FROM task_assignments ta
              JOIN users u ON u.id = ta.user_id
             WHERE ta.task_id = ANY($1)
             ORDER BY ta.assigned_at ASC, u.username ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_task(
        &self,
        project_id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Task> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.db.begin().await?;
        lock_project_tx(&mut tx, project_id).await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks
                (id, project_id, title, description, status, deadline, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.status)
        .bind(fields.deadline)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_assignments_tx(&mut tx, project_id, task.id, assignees, now).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Option<Task>> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.db.begin().await?;

        let project_id: Option<Uuid> =
            sqlx::query_scalar("SELECT project_id FROM tasks WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(project_id) = project_id else {
            return Ok(None);
        };
        lock_project_tx(&mut tx, project_id).await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
               SET title = $2, description = $3, status = $4, deadline = $5, updated_at = $6
             WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.status)
        .bind(fields.deadline)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(task) = task else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_assignments_tx(&mut tx, project_id, id, assignees, now).await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn delete_task_cascade(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}
