use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::PublicUser;
use crate::projects::repo_types::Project;
use crate::store::{PgStore, StoreResult};

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Projects the user owns or collaborates on.
    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>>;

    async fn list_collaborators(&self, project_id: Uuid) -> StoreResult<Vec<PublicUser>>;

    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Project>;

    /// `None` when the project does not exist.
    async fn update_project(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<Project>>;

    /// Remove collaborators, task assignments, tasks and the project as one unit.
    /// Returns `false` when the project did not exist.
    async fn delete_project_cascade(&self, id: Uuid) -> StoreResult<bool>;

    async fn add_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    /// Drop the user's assignments on the project's tasks and then the
    /// collaborator row, as one unit. Returns `false`, changing nothing, when
    /// the user was not a collaborator.
    async fn remove_collaborator_cascade(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<bool>;
}

#[async_trait]
impl ProjectRepo for PgStore {
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, owner_id, name, description, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(project)
    }

    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.owner_id, p.name, p.description, p.created_at, p.updated_at
              FROM projects p
             WHERE p.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM project_collaborators pc
                     WHERE pc.project_id = p.id AND pc.user_id = $1
                )
             ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_collaborators(&self, project_id: Uuid) -> StoreResult<Vec<PublicUser>> {
        let rows = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT u.id, u.username, u.email
              FROM project_collaborators pc
              JOIN users u ON u.id = pc.user_id
             WHERE pc.project_id = $1
             ORDER BY pc.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Project> {
        let now = OffsetDateTime::now_utc();
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, owner_id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, owner_id, name, description, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
               SET name = $2, description = $3, updated_at = $4
             WHERE id = $1
            RETURNING id, owner_id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await?;
        Ok(project)
    }

    async fn delete_project_cascade(&self, id: Uuid) -> StoreResult<bool> {
        // Any early return drops `tx` uncommitted, which rolls the whole unit back.
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM project_collaborators WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            DELETE FROM task_assignments
             WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn add_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_collaborators (project_id, user_id, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove_collaborator_cascade(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;

        // Serializes against task writes on this project, which take a share lock.
        sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;

        let removed = sqlx::query(
            "DELETE FROM project_collaborators WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if removed == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            DELETE FROM task_assignments
             WHERE user_id = $2
               AND task_id IN (SELECT id FROM tasks WHERE project_id = $1)
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
