use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{
    repo::UserRepo,
    repo_types::{NewUser, PublicUser, User},
};
use crate::projects::{repo::ProjectRepo, repo_types::Project};
use crate::store::{StoreError, StoreResult};
use crate::tasks::{
    repo::TaskRepo,
    repo_types::{AssigneeRow, Task, TaskAssignment, TaskFields},
};

#[derive(Debug, Clone)]
struct CollaboratorRow {
    project_id: Uuid,
    user_id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    collaborators: Vec<CollaboratorRow>,
    tasks: Vec<Task>,
    assignments: Vec<TaskAssignment>,
}

impl Tables {
    fn public_user(&self, id: Uuid) -> Option<PublicUser> {
        self.users.iter().find(|u| u.id == id).map(PublicUser::from)
    }

    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn is_member(&self, project_id: Uuid, user_id: Uuid) -> bool {
        self.projects
            .iter()
            .any(|p| p.id == project_id && p.owner_id == user_id)
            || self
                .collaborators
                .iter()
                .any(|c| c.project_id == project_id && c.user_id == user_id)
    }

    /// Assignees must be distinct, must exist, and must belong to the project.
    fn check_assignees(&self, project_id: Uuid, assignees: &[Uuid]) -> StoreResult<()> {
        for (i, &id) in assignees.iter().enumerate() {
            if assignees[..i].contains(&id) {
                return Err(StoreError::Duplicate("assignment"));
            }
            if !self.user_exists(id) {
                return Err(StoreError::MissingReference("user"));
            }
            if !self.is_member(project_id, id) {
                return Err(StoreError::NotMember(id));
            }
        }
        Ok(())
    }

    fn assign(&mut self, task_id: Uuid, assignees: &[Uuid], at: OffsetDateTime) {
        self.assignments.extend(assignees.iter().map(|&user_id| TaskAssignment {
            task_id,
            user_id,
            assigned_at: at,
        }));
    }
}

/// Store kept entirely in process memory.
///
/// A single lock guards all tables; every trait method holds it for its whole
/// body, so composite writes are atomic. Each write validates everything it
/// needs before mutating anything.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate("username"));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl ProjectRepo for MemoryStore {
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let t = self.tables.lock().await;
        Ok(t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let t = self.tables.lock().await;
        Ok(t.projects
            .iter()
            .filter(|p| {
                p.owner_id == user_id
                    || t.collaborators
                        .iter()
                        .any(|c| c.project_id == p.id && c.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn list_collaborators(&self, project_id: Uuid) -> StoreResult<Vec<PublicUser>> {
        let t = self.tables.lock().await;
        Ok(t.collaborators
            .iter()
            .filter(|c| c.project_id == project_id)
            .filter_map(|c| t.public_user(c.user_id))
            .collect())
    }

    async fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Project> {
        let mut t = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        let project = Project {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<Project>> {
        let mut t = self.tables.lock().await;
        let Some(project) = t.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        project.name = name.to_string();
        project.description = description.to_string();
        project.updated_at = OffsetDateTime::now_utc();
        Ok(Some(project.clone()))
    }

    async fn delete_project_cascade(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.projects.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let task_ids: Vec<Uuid> = t
            .tasks
            .iter()
            .filter(|task| task.project_id == id)
            .map(|task| task.id)
            .collect();

        t.collaborators.retain(|c| c.project_id != id);
        t.assignments.retain(|a| !task_ids.contains(&a.task_id));
        t.tasks.retain(|task| task.project_id != id);
        t.projects.retain(|p| p.id != id);
        Ok(true)
    }

    async fn add_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::MissingReference("project"));
        }
        if !t.user_exists(user_id) {
            return Err(StoreError::MissingReference("user"));
        }
        if t.collaborators
            .iter()
            .any(|c| c.project_id == project_id && c.user_id == user_id)
        {
            return Err(StoreError::Duplicate("collaborator"));
        }
        t.collaborators.push(CollaboratorRow { project_id, user_id });
        Ok(())
    }

    async fn remove_collaborator_cascade(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t
            .collaborators
            .iter()
            .any(|c| c.project_id == project_id && c.user_id == user_id)
        {
            return Ok(false);
        }
        let task_ids: Vec<Uuid> = t
            .tasks
            .iter()
            .filter(|task| task.project_id == project_id)
            .map(|task| task.id)
            .collect();

        t.assignments
            .retain(|a| !(a.user_id == user_id && task_ids.contains(&a.task_id)));
        t.collaborators
            .retain(|c| !(c.project_id == project_id && c.user_id == user_id));
        Ok(true)
    }
}

#[async_trait]
impl TaskRepo for MemoryStore {
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let t = self.tables.lock().await;
        Ok(t.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let t = self.tables.lock().await;
        Ok(t.tasks
            .iter()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_tasks_visible_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let t = self.tables.lock().await;
        Ok(t.tasks
            .iter()
            .filter(|task| {
                let owns = t
                    .projects
                    .iter()
                    .any(|p| p.id == task.project_id && p.owner_id == user_id);
                owns || t
                    .assignments
                    .iter()
                    .any(|a| a.task_id == task.id && a.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn list_assignees(&self, task_ids: &[Uuid]) -> StoreResult<Vec<AssigneeRow>> {
        let t = self.tables.lock().await;
        Ok(t.assignments
            .iter()
            .filter(|a| task_ids.contains(&a.task_id))
            .filter_map(|a| {
                t.public_user(a.user_id).map(|u| AssigneeRow {
                    task_id: a.task_id,
                    id: u.id,
                    username: u.username,
                    email: u.email,
                })
            })
            .collect())
    }

    async fn create_task(
        &self,
        project_id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Task> {
        let mut t = self.tables.lock().await;
        if !t.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::MissingReference("project"));
        }
        t.check_assignees(project_id, assignees)?;

        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            project_id,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            deadline: fields.deadline,
            created_at: now,
            updated_at: now,
        };
        t.tasks.push(task.clone());
        t.assign(task.id, assignees, now);
        Ok(task)
    }

    async fn update_task(
        &self,
        id: Uuid,
        fields: TaskFields,
        assignees: &[Uuid],
    ) -> StoreResult<Option<Task>> {
        let mut t = self.tables.lock().await;
        let Some(project_id) = t
            .tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| task.project_id)
        else {
            return Ok(None);
        };
        t.check_assignees(project_id, assignees)?;

        let now = OffsetDateTime::now_utc();
        let Some(task) = t.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        task.title = fields.title;
        task.description = fields.description;
        task.status = fields.status;
        task.deadline = fields.deadline;
        task.updated_at = now;
        let task = task.clone();

        t.assignments.retain(|a| a.task_id != id);
        t.assign(id, assignees, now);
        Ok(Some(task))
    }

    async fn delete_task_cascade(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t.tasks.iter().any(|task| task.id == id) {
            return Ok(false);
        }
        t.assignments.retain(|a| a.task_id != id);
        t.tasks.retain(|task| task.id != id);
        Ok(true)
    }
}
