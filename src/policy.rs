//! Access policy for projects and tasks.
//!
//! Every protected operation resolves the actor's [`Role`] on the project and
//! asks [`decide`] whether the [`Action`] is allowed. The decision is a pure
//! function of the actor id, the project owner id and the collaborator set
//! (or, for single-task reads, the task's assignee set); it never touches the
//! store.
//!
//! # Roles
//!
//! | Role | Who |
//! |------|-----|
//! | `Owner` | the user who created the project |
//! | `Collaborator` | a user the owner invited |
//! | `Stranger` | everyone else |
//!
//! Ownership dominates: an owner is never demoted to collaborator, even if a
//! collaborator row for them exists.
//!
//! # Denials
//!
//! A denied read reports [`AppError::NotFound`] so that a resource the actor
//! cannot see is indistinguishable from one that does not exist. A denied
//! write reports [`AppError::Forbidden`].

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Collaborator,
    Stranger,
}

/// Operations guarded by the project's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewProject,
    EditProject,
    DeleteProject,
    AddCollaborator,
    /// Removing `target` from the collaborator list.
    RemoveCollaborator { target: Uuid },
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
}

impl Action {
    fn is_read(self) -> bool {
        matches!(self, Action::ViewProject | Action::ListTasks)
    }

    fn denial(self) -> &'static str {
        match self {
            Action::ViewProject | Action::ListTasks => "project",
            Action::EditProject => "only the project owner may edit it",
            Action::DeleteProject => "only the project owner may delete it",
            Action::AddCollaborator => "only the project owner may add collaborators",
            Action::RemoveCollaborator { .. } => {
                "only the project owner may remove other collaborators"
            }
            Action::CreateTask | Action::UpdateTask => {
                "only project members may create or update tasks"
            }
            Action::DeleteTask => "only the project owner may delete tasks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The actor may not know the resource exists.
    Hide,
    /// The actor sees the resource but may not perform the action.
    Deny,
}

/// Decide whether `actor`, holding `role` on a project, may perform `action`.
pub fn decide(role: Role, actor: Uuid, action: Action) -> Decision {
    let allowed = match (role, action) {
        (Role::Owner, _) => true,
        (
            Role::Collaborator,
            Action::ViewProject | Action::ListTasks | Action::CreateTask | Action::UpdateTask,
        ) => true,
        (Role::Collaborator, Action::RemoveCollaborator { target }) => target == actor,
        (Role::Collaborator, _) => false,
        (Role::Stranger, _) => false,
    };

    if allowed {
        Decision::Allow
    } else if action.is_read() {
        Decision::Hide
    } else {
        Decision::Deny
    }
}

/// Membership facts about one project.
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    owner_id: Uuid,
    collaborators: HashSet<Uuid>,
}

impl ProjectAccess {
    pub fn new(owner_id: Uuid, collaborators: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            owner_id,
            collaborators: collaborators.into_iter().collect(),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn role_of(&self, user: Uuid) -> Role {
        if user == self.owner_id {
            Role::Owner
        } else if self.collaborators.contains(&user) {
            Role::Collaborator
        } else {
            Role::Stranger
        }
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.role_of(user) != Role::Stranger
    }

    pub fn is_collaborator(&self, user: Uuid) -> bool {
        self.collaborators.contains(&user)
    }

    /// Authorize `actor` for `action`, returning the resolved role on success.
    pub fn authorize(&self, actor: Uuid, action: Action) -> Result<Role, AppError> {
        let role = self.role_of(actor);
        match decide(role, actor, action) {
            Decision::Allow => Ok(role),
            Decision::Hide => {
                tracing::warn!(%actor, ?action, "hidden from non-member");
                Err(AppError::NotFound(action.denial()))
            }
            Decision::Deny => {
                tracing::warn!(%actor, ?role, ?action, "denied");
                Err(AppError::Forbidden(action.denial()))
            }
        }
    }

    /// Every assignee must be the owner or a collaborator.
    pub fn check_assignees(&self, assignees: &[Uuid]) -> Result<(), AppError> {
        match assignees.iter().find(|id| !self.is_member(**id)) {
            Some(outsider) => Err(AppError::InvalidAssignee(*outsider)),
            None => Ok(()),
        }
    }
}

/// Visibility of a single task: the project owner, or anyone assigned to it.
pub fn can_view_task(actor: Uuid, project_owner: Uuid, assignees: &[Uuid]) -> bool {
    actor == project_owner || assignees.contains(&actor)
}

/// Collapse duplicate ids while keeping first-seen order.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
