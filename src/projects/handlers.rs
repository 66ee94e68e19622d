use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath},
    projects::{
        dto::{AddCollaboratorRequest, ProjectDetails, ProjectInput, ProjectResponse},
        services,
    },
    state::AppState,
};

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:project_id/collaborators", post(add_collaborator))
        .route(
            "/projects/:project_id/collaborators/:user_id",
            delete(remove_collaborator),
        )
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ProjectResponse>>> {
    let projects = services::list_projects(state.store(), user_id).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
) -> AppResult<Json<ProjectDetails>> {
    Ok(Json(services::get_project(state.store(), project_id, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ProjectInput>,
) -> AppResult<(StatusCode, HeaderMap, Json<ProjectResponse>)> {
    let project = services::create_project(state.store(), user_id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/projects/{}", project.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(project.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ProjectInput>,
) -> AppResult<Json<ProjectResponse>> {
    let project = services::update_project(state.store(), project_id, user_id, payload).await?;
    Ok(Json(project.into()))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_project(state.store(), project_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn add_collaborator(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AddCollaboratorRequest>,
) -> AppResult<StatusCode> {
    services::add_collaborator(state.store(), project_id, user_id, payload.user_id).await?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state))]
pub async fn remove_collaborator(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath((project_id, target)): ApiPath<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_collaborator(state.store(), project_id, user_id, target).await?;
    Ok(StatusCode::NO_CONTENT)
}
