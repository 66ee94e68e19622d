//! Shared harness for the HTTP integration tests.
//!
//! Every context runs the full router over a fresh in-memory store, so tests
//! never share state and need no database.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use taskboard::app::build_app;
use taskboard::config::{AppConfig, JwtConfig};
use taskboard::state::AppState;
use tower::ServiceExt;

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "integration-test-secret".into(),
            issuer: "taskboard-test".into(),
            audience: "taskboard-test-users".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
    }
}

/// A registered user and their access token.
pub struct TestUser {
    pub id: String,
    pub token: String,
}

pub struct TestContext {
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            app: build_app(AppState::in_memory(test_config())),
        }
    }

    /// Send one request; an empty response body comes back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct horse battery",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register {username}: {body}");
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a project owned by `owner` and return its id.
    pub async fn create_project(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/projects",
                Some(&owner.token),
                Some(json!({ "name": name, "description": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn add_collaborator(&self, owner: &TestUser, project_id: &str, user: &TestUser) {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/v1/projects/{project_id}/collaborators"),
                Some(&owner.token),
                Some(json!({ "user_id": user.id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add collaborator: {body}");
    }

    pub async fn create_task(
        &self,
        actor: &TestUser,
        project_id: &str,
        title: &str,
        assigned_to: &[&TestUser],
    ) -> (StatusCode, Value) {
        let ids: Vec<&str> = assigned_to.iter().map(|u| u.id.as_str()).collect();
        self.send(
            Method::POST,
            &format!("/api/v1/projects/{project_id}/tasks"),
            Some(&actor.token),
            Some(json!({
                "title": title,
                "description": "",
                "status": "todo",
                "deadline": "2030-01-02 15:04:05",
                "assigned_to": ids,
            })),
        )
        .await
    }
}

/// Assert that no object anywhere in `value` carries a password field.
pub fn assert_no_password(value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                assert!(!key.contains("password"), "leaked {key} in {value}");
                assert_no_password(inner);
            }
        }
        Value::Array(items) => items.iter().for_each(assert_no_password),
        _ => {}
    }
}
