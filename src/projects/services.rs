use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::auth::{repo::UserRepo, repo_types::PublicUser};
use crate::error::{AppError, AppResult};
use crate::policy::{Action, ProjectAccess};
use crate::projects::{
    dto::{ProjectDetails, ProjectInput},
    repo::ProjectRepo,
    repo_types::Project,
};
use crate::store::Store;

/// A project with its collaborator identities and the membership facts
/// derived from them.
struct LoadedProject {
    project: Project,
    collaborators: Vec<PublicUser>,
    access: ProjectAccess,
}

async fn load_project(store: &dyn Store, project_id: Uuid) -> AppResult<LoadedProject> {
    let project = store
        .find_project(project_id)
        .await?
        .ok_or(AppError::NotFound("project"))?;
    let collaborators = store.list_collaborators(project_id).await?;
    let access = ProjectAccess::new(project.owner_id, collaborators.iter().map(|u| u.id));
    Ok(LoadedProject {
        project,
        collaborators,
        access,
    })
}

/// Load a project and its membership facts. Absent projects are `NotFound`.
pub(crate) async fn load_access(
    store: &dyn Store,
    project_id: Uuid,
) -> AppResult<(Project, ProjectAccess)> {
    let loaded = load_project(store, project_id).await?;
    Ok((loaded.project, loaded.access))
}

fn validated(input: ProjectInput) -> AppResult<(String, String)> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::invalid("project name is required"));
    }
    Ok((name, input.description.trim().to_string()))
}

pub async fn list_projects(store: &dyn Store, actor: Uuid) -> AppResult<Vec<Project>> {
    let mut seen = HashSet::new();
    let projects = store
        .list_projects_for_member(actor)
        .await?
        .into_iter()
        .filter(|p| seen.insert(p.id))
        .collect();
    Ok(projects)
}

pub async fn get_project(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
) -> AppResult<ProjectDetails> {
    let loaded = load_project(store, project_id).await?;
    loaded.access.authorize(actor, Action::ViewProject)?;

    Ok(ProjectDetails {
        project: loaded.project.into(),
        collaborators: loaded.collaborators,
    })
}

pub async fn create_project(
    store: &dyn Store,
    actor: Uuid,
    input: ProjectInput,
) -> AppResult<Project> {
    let (name, description) = validated(input)?;
    let project = store.create_project(actor, &name, &description).await?;
    info!(project_id = %project.id, owner_id = %actor, "project created");
    Ok(project)
}

pub async fn update_project(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
    input: ProjectInput,
) -> AppResult<Project> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::EditProject)?;
    let (name, description) = validated(input)?;

    store
        .update_project(project_id, &name, &description)
        .await?
        .ok_or(AppError::NotFound("project"))
}

pub async fn delete_project(store: &dyn Store, project_id: Uuid, actor: Uuid) -> AppResult<()> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::DeleteProject)?;

    if !store.delete_project_cascade(project_id).await? {
        return Err(AppError::NotFound("project"));
    }
    info!(%project_id, "project deleted");
    Ok(())
}

pub async fn add_collaborator(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
    target: Uuid,
) -> AppResult<()> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::AddCollaborator)?;

    if target == access.owner_id() {
        return Err(AppError::invalid(
            "the project owner cannot be added as a collaborator",
        ));
    }
    if access.is_collaborator(target) {
        return Err(AppError::Conflict("user is already a collaborator".into()));
    }
    if store.find_user_by_id(target).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }

    store.add_collaborator(project_id, target).await?;
    info!(%project_id, user_id = %target, "collaborator added");
    Ok(())
}

/// Remove `target` from the project. Their assignments on the project's tasks
/// go with them, so a former collaborator keeps no view of any task.
pub async fn remove_collaborator(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
    target: Uuid,
) -> AppResult<()> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::RemoveCollaborator { target })?;

    if !store.remove_collaborator_cascade(project_id, target).await? {
        return Err(AppError::NotFound("collaborator"));
    }
    info!(%project_id, user_id = %target, by = %actor, "collaborator removed");
    Ok(())
}
