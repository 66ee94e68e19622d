use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath},
    state::AppState,
    tasks::{
        dto::{TaskInput, TaskResponse},
        services,
    },
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:project_id/tasks",
            get(list_project_tasks).post(create_task),
        )
        .route("/projects/:project_id/tasks/:task_id", put(update_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:task_id", get(get_task).delete(delete_task))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<TaskResponse>>> {
    Ok(Json(services::list_all_tasks(state.store(), user_id).await?))
}

#[instrument(skip(state))]
pub async fn list_project_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<TaskResponse>>> {
    Ok(Json(
        services::list_tasks_for_project(state.store(), project_id, user_id).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> AppResult<Json<TaskResponse>> {
    Ok(Json(services::get_task(state.store(), task_id, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TaskInput>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let task = services::create_task(state.store(), project_id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath((project_id, task_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<TaskInput>,
) -> AppResult<Json<TaskResponse>> {
    Ok(Json(
        services::update_task(state.store(), project_id, task_id, user_id, payload).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_task(state.store(), task_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
