//! Error taxonomy shared by the services and the HTTP layer.
//!
//! Services return [`AppResult`]; handlers hand the error straight back to axum,
//! which renders it through [`IntoResponse`].

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The resource is absent, or the actor has no visibility of it.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The resource is visible but the operation is not permitted.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An assignee is neither the owner nor a collaborator of the project.
    #[error("user {0} is not a member of this project")]
    InvalidAssignee(Uuid),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AppError::InvalidAssignee(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_assignee"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AppError::Conflict(format!("{what} already exists")),
            StoreError::NotMember(user_id) => AppError::InvalidAssignee(user_id),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        let cases = [
            (AppError::NotFound("project"), StatusCode::NOT_FOUND),
            (AppError::Forbidden("owner only"), StatusCode::FORBIDDEN),
            (AppError::invalid("bad deadline"), StatusCode::BAD_REQUEST),
            (AppError::InvalidAssignee(Uuid::nil()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED),
            (AppError::Internal(anyhow::anyhow!("db down")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn duplicate_store_error_becomes_conflict() {
        let err: AppError = StoreError::Duplicate("collaborator").into();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("collaborator")));
    }

    #[test]
    fn non_member_store_error_becomes_invalid_assignee() {
        let id = Uuid::new_v4();
        let err: AppError = StoreError::NotMember(id).into();
        assert!(matches!(err, AppError::InvalidAssignee(got) if got == id));
    }

    #[test]
    fn display_messages() {
        assert_eq!(AppError::NotFound("task").to_string(), "task not found");
        assert_eq!(
            AppError::Forbidden("only the project owner may delete it").to_string(),
            "forbidden: only the project owner may delete it"
        );
    }
}
