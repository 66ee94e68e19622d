use std::collections::HashMap;

use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::PublicUser;
use crate::error::{AppError, AppResult};
use crate::policy::{self, Action};
use crate::projects::{repo::ProjectRepo, services::load_access};
use crate::store::Store;
use crate::tasks::{
    dto::{TaskInput, TaskResponse},
    repo::TaskRepo,
    repo_types::{Task, TaskFields},
};

/// Parse a deadline given as `YYYY-MM-DD HH:MM:SS` (taken as UTC) or RFC 3339.
pub fn parse_deadline(raw: &str) -> AppResult<OffsetDateTime> {
    let raw = raw.trim();
    let plain = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(raw, plain) {
        return Ok(dt.assume_utc());
    }
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| {
        AppError::invalid(format!(
            "invalid deadline {raw:?}; expected YYYY-MM-DD HH:MM:SS or RFC 3339"
        ))
    })
}

fn validated(input: &TaskInput) -> AppResult<TaskFields> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::invalid("task title is required"));
    }
    Ok(TaskFields {
        title,
        description: input.description.trim().to_string(),
        status: input.status.trim().to_string(),
        deadline: parse_deadline(&input.deadline)?,
    })
}

/// Pair each task with its assignees' public identities.
async fn with_assignees(store: &dyn Store, tasks: Vec<Task>) -> AppResult<Vec<TaskResponse>> {
    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut by_task: HashMap<Uuid, Vec<PublicUser>> = HashMap::new();
    for row in store.list_assignees(&ids).await? {
        let (task_id, user) = row.into_public();
        by_task.entry(task_id).or_default().push(user);
    }
    Ok(tasks
        .into_iter()
        .map(|t| {
            let assigned = by_task.remove(&t.id).unwrap_or_default();
            TaskResponse::new(t, assigned)
        })
        .collect())
}

async fn single(store: &dyn Store, task: Task) -> AppResult<TaskResponse> {
    with_assignees(store, vec![task])
        .await?
        .pop()
        .ok_or(AppError::NotFound("task"))
}

pub async fn list_all_tasks(store: &dyn Store, actor: Uuid) -> AppResult<Vec<TaskResponse>> {
    let tasks = store.list_tasks_visible_to(actor).await?;
    with_assignees(store, tasks).await
}

pub async fn list_tasks_for_project(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
) -> AppResult<Vec<TaskResponse>> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::ListTasks)?;

    let tasks = store.list_tasks_for_project(project_id).await?;
    with_assignees(store, tasks).await
}

pub async fn get_task(store: &dyn Store, task_id: Uuid, actor: Uuid) -> AppResult<TaskResponse> {
    let task = store.find_task(task_id).await?.ok_or(AppError::NotFound("task"))?;
    let project = store
        .find_project(task.project_id)
        .await?
        .ok_or(AppError::NotFound("task"))?;

    let response = single(store, task).await?;
    let assignees: Vec<Uuid> = response.assigned_to.iter().map(|u| u.id).collect();
    if !policy::can_view_task(actor, project.owner_id, &assignees) {
        warn!(%actor, %task_id, "task hidden from non-assignee");
        return Err(AppError::NotFound("task"));
    }
    Ok(response)
}

pub async fn create_task(
    store: &dyn Store,
    project_id: Uuid,
    actor: Uuid,
    input: TaskInput,
) -> AppResult<TaskResponse> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::CreateTask)?;

    let fields = validated(&input)?;
    let assignees = policy::dedup_ids(&input.assigned_to);
    access.check_assignees(&assignees)?;

    let task = store.create_task(project_id, fields, &assignees).await?;
    info!(
        task_id = %task.id,
        %project_id,
        by = %actor,
        assignees = assignees.len(),
        "task created"
    );
    single(store, task).await
}

pub async fn update_task(
    store: &dyn Store,
    project_id: Uuid,
    task_id: Uuid,
    actor: Uuid,
    input: TaskInput,
) -> AppResult<TaskResponse> {
    let (_, access) = load_access(store, project_id).await?;
    access.authorize(actor, Action::UpdateTask)?;

    match store.find_task(task_id).await? {
        Some(t) if t.project_id == project_id => {}
        _ => return Err(AppError::NotFound("task")),
    }

    let fields = validated(&input)?;
    let assignees = policy::dedup_ids(&input.assigned_to);
    access.check_assignees(&assignees)?;

    let task = store
        .update_task(task_id, fields, &assignees)
        .await?
        .ok_or(AppError::NotFound("task"))?;
    info!(%task_id, %project_id, by = %actor, assignees = assignees.len(), "task updated");
    single(store, task).await
}

pub async fn delete_task(store: &dyn Store, task_id: Uuid, actor: Uuid) -> AppResult<()> {
    let task = store.find_task(task_id).await?.ok_or(AppError::NotFound("task"))?;
    let (_, access) = load_access(store, task.project_id).await?;
    access.authorize(actor, Action::DeleteTask)?;

    if !store.delete_task_cascade(task_id).await? {
        return Err(AppError::NotFound("task"));
    }
    info!(%task_id, by = %actor, "task deleted");
    Ok(())
}
