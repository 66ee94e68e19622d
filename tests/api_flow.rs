mod common;

use axum::http::{Method, StatusCode};
use common::{assert_no_password, TestContext};
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let ctx = TestContext::new();
    let (status, _) = ctx.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_me() {
    let ctx = TestContext::new();
    let alice = ctx.register("alice").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ALICE@example.com", "password": "correct horse battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["id"], alice.id.as_str());
    assert_no_password(&body);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = ctx
        .send(Method::GET, "/api/v1/me", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_no_password(&body);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    ctx.register("bob").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "bobby",
                "email": "bob@example.com",
                "password": "another long password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let ctx = TestContext::new();
    for uri in ["/api/v1/me", "/api/v1/projects", "/api/v1/tasks"] {
        let (status, body) = ctx.send(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = ctx
        .send(Method::GET, "/api/v1/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stranger_cannot_see_or_touch_a_project() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let stranger = ctx.register("stranger").await;
    let project = ctx.create_project(&owner, "secret plans").await;

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/projects/{project}"), Some(&stranger.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = ctx
        .send(
            Method::GET,
            &format!("/api/v1/projects/{project}/tasks"),
            Some(&stranger.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{project}"),
            Some(&stranger.token),
            Some(json!({ "name": "mine now" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.create_task(&stranger, &project, "sneaky", &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = ctx
        .send(Method::GET, "/api/v1/projects", Some(&stranger.token), None)
        .await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn collaborator_works_on_tasks_but_not_the_project() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let collab = ctx.register("collab").await;
    let project = ctx.create_project(&owner, "shared").await;
    ctx.add_collaborator(&owner, &project, &collab).await;

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/projects/{project}"), Some(&collab.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collaborators"][0]["id"], collab.id.as_str());
    assert_no_password(&body);

    let (status, task) = ctx
        .create_task(&collab, &project, "write docs", &[&collab, &owner])
        .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    assert_eq!(task["assigned_to"].as_array().unwrap().len(), 2);
    assert_no_password(&task);
    let task_id = task["id"].as_str().unwrap();

    let (status, updated) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{project}/tasks/{task_id}"),
            Some(&collab.token),
            Some(json!({
                "title": "write better docs",
                "status": "doing",
                "deadline": "2030-06-01T09:00:00Z",
                "assigned_to": [collab.id],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["status"], "doing");
    assert_eq!(updated["assigned_to"].as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/v1/tasks/{task_id}"), Some(&collab.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/v1/projects/{project}"), Some(&collab.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{project}/collaborators"),
            Some(&collab.token),
            Some(json!({ "user_id": owner.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn collaborator_may_leave_but_not_evict_others() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let first = ctx.register("first").await;
    let second = ctx.register("second").await;
    let project = ctx.create_project(&owner, "crowded").await;
    ctx.add_collaborator(&owner, &project, &first).await;
    ctx.add_collaborator(&owner, &project, &second).await;

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/projects/{project}/collaborators/{}", second.id),
            Some(&first.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/projects/{project}/collaborators/{}", first.id),
            Some(&first.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/v1/projects/{project}"), Some(&first.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignees_must_be_project_members() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let outsider = ctx.register("outsider").await;
    let project = ctx.create_project(&owner, "closed").await;

    let (status, body) = ctx
        .create_task(&owner, &project, "impossible", &[&outsider])
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"], "invalid_assignee");

    let (_, tasks) = ctx
        .send(
            Method::GET,
            &format!("/api/v1/projects/{project}/tasks"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(tasks, json!([]));
}

#[tokio::test]
async fn single_task_is_visible_to_owner_and_assignees_only() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let assignee = ctx.register("assignee").await;
    let bystander = ctx.register("bystander").await;
    let project = ctx.create_project(&owner, "visibility").await;
    ctx.add_collaborator(&owner, &project, &assignee).await;
    ctx.add_collaborator(&owner, &project, &bystander).await;

    let (_, task) = ctx
        .create_task(&owner, &project, "focused", &[&assignee])
        .await;
    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

    for (user, expected) in [
        (&owner, StatusCode::OK),
        (&assignee, StatusCode::OK),
        (&bystander, StatusCode::NOT_FOUND),
    ] {
        let (status, _) = ctx.send(Method::GET, &uri, Some(&user.token), None).await;
        assert_eq!(status, expected);
    }

    let (_, mine) = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&assignee.token), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, theirs) = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&bystander.token), None)
        .await;
    assert_eq!(theirs, json!([]));
}

#[tokio::test]
async fn deleting_a_project_takes_its_tasks_along() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let doomed = ctx.create_project(&owner, "doomed").await;
    let survivor = ctx.create_project(&owner, "survivor").await;

    let (_, task) = ctx.create_task(&owner, &doomed, "gone soon", &[&owner]).await;
    let task_id = task["id"].as_str().unwrap().to_string();
    ctx.create_task(&owner, &survivor, "stays", &[]).await;

    let (status, body) = ctx
        .send(Method::DELETE, &format!("/api/v1/projects/{doomed}"), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/v1/tasks/{task_id}"), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, remaining) = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&owner.token), None)
        .await;
    let remaining = remaining.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["title"], "stays");
}

#[tokio::test]
async fn malformed_deadline_is_rejected() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let project = ctx.create_project(&owner, "dates").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{project}/tasks"),
            Some(&owner.token),
            Some(json!({ "title": "when?", "deadline": "next tuesday" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn removed_collaborator_loses_sight_of_assigned_tasks() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let collab = ctx.register("collab").await;
    let project = ctx.create_project(&owner, "shared").await;
    ctx.add_collaborator(&owner, &project, &collab).await;

    let (_, task) = ctx
        .create_task(&owner, &project, "secret", &[&owner, &collab])
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/projects/{project}/collaborators/{}", collab.id),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/v1/tasks/{task_id}"), Some(&collab.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&collab.token), None)
        .await;
    assert_eq!(listed, json!([]));

    let (status, seen) = ctx
        .send(Method::GET, &format!("/api/v1/tasks/{task_id}"), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = seen["assigned_to"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["id"].as_str())
        .collect();
    assert_eq!(ids, vec![owner.id.as_str()]);

    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{project}/tasks/{task_id}"),
            Some(&owner.token),
            Some(json!({
                "title": "secret",
                "deadline": "2030-01-02 15:04:05",
                "assigned_to": ids,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn malformed_requests_use_the_error_body() {
    let ctx = TestContext::new();
    let owner = ctx.register("owner").await;
    let project = ctx.create_project(&owner, "shapes").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{project}/tasks"),
            Some(&owner.token),
            Some(json!({ "title": "no deadline" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{project}/tasks"),
            Some(&owner.token),
            Some(json!({
                "title": "bad assignee",
                "deadline": "2030-01-02 15:04:05",
                "assigned_to": ["not-a-uuid"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = ctx
        .send(Method::GET, "/api/v1/projects/not-a-uuid", Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}
