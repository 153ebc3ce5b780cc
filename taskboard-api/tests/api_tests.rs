/// HTTP-level tests over in-memory stores
///
/// Each test builds its own app, so they share no state.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let ctx = TestContext::new();
    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_failure_envelope() {
    let ctx = TestContext::new();
    let (status, body) = ctx.send(Method::GET, "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send(Method::GET, "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized, no token provided");

    let (status, body) = ctx
        .send(Method::GET, "/api/auth/me", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();
    let email = "ada@example.com";

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "ADA@Example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], email);
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": email, "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists with this email");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, body) = ctx.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ada");
}

#[tokio::test]
async fn test_register_validation_reports_fields() {
    let ctx = TestContext::new();
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "nope", "password": "123" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "name", "password"]);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register("Ada").await;

    let (status, body) = ctx
        .send(Method::POST, "/api/projects", Some(&token), Some(json!({ "name": 42 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_project_crud_and_ownership() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.register("Alice").await;
    let (_, bob) = ctx.register("Bob").await;

    let project_id = ctx.create_project(&alice, "Website").await;

    // Same name for the same owner conflicts; another owner may reuse it
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/projects",
            Some(&alice),
            Some(json!({ "name": "Website", "description": "Duplicate name" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Project with this name already exists");
    ctx.create_project(&bob, "Website").await;

    let uri = format!("/api/projects/{}", project_id);
    let (status, body) = ctx.send(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&alice), Some(json!({ "status": "on-hold", "color": "#10B981" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "on-hold");
    assert_eq!(body["data"]["color"], "#10B981");

    let (status, body) = ctx.send(Method::GET, "/api/projects?limit=1", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, _) = ctx
        .send(Method::GET, "/api/projects/not-a-uuid", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.send(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.send(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.register("Alice").await;
    let (_, bob) = ctx.register("Bob").await;
    let project_id = ctx.create_project(&alice, "Backend").await;

    // A past deadline is only accepted for a task that is already done
    let past = (Utc::now() - Duration::days(2)).to_rfc3339();
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/tasks",
            Some(&alice),
            Some(json!({ "title": "Old work", "deadline": past, "projectId": project_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Deadline cannot be in the past");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/tasks",
            Some(&alice),
            Some(json!({ "title": "Old work", "deadline": past, "projectId": project_id, "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["completedAt"].is_string());

    let future = (Utc::now() + Duration::days(3)).to_rfc3339();
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/tasks",
            Some(&alice),
            Some(json!({ "title": "Write API", "deadline": future, "projectId": project_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "todo");
    let task_id = body["data"]["id"].as_str().expect("task id").to_string();
    let task_uri = format!("/api/tasks/{}", task_id);

    // Bob can neither read the task nor add tasks to Alice's project
    let (status, _) = ctx.send(Method::GET, &task_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/tasks",
            Some(&bob),
            Some(json!({ "title": "Sneaky", "deadline": future, "projectId": project_id })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .send(
            Method::PATCH,
            &format!("{}/status", task_uri),
            Some(&alice),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completedAt"].is_string());

    let (status, body) = ctx
        .send(
            Method::PATCH,
            &format!("{}/move", task_uri),
            Some(&alice),
            Some(json!({ "status": "in-progress", "position": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completedAt"].is_null());
    assert_eq!(body["data"]["position"], 2);

    let kanban_uri = format!("/api/tasks/project/{}/kanban", project_id);
    let (status, body) = ctx.send(Method::GET, &kanban_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["columns"]["in-progress"]["tasks"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["columns"]["done"]["tasks"].as_array().map(Vec::len), Some(1));

    // Projects with tasks can't be deleted
    let project_uri = format!("/api/projects/{}", project_id);
    let (status, body) = ctx.send(Method::DELETE, &project_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete project with existing tasks");
}

#[tokio::test]
async fn test_upcoming_rejects_out_of_range_days() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register("Ada").await;

    let (status, body) = ctx
        .send(Method::GET, "/api/tasks/upcoming?days=100000000", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["field"], "days");

    let (status, body) = ctx
        .send(Method::GET, "/api/tasks/upcoming?days=30", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Upcoming tasks for next 30 days retrieved successfully");
}

#[tokio::test]
async fn test_dashboard_for_new_user_is_zeroed() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register("Ada").await;

    let (status, body) = ctx
        .send(Method::GET, "/api/dashboard/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalProjects"], 0);
    assert_eq!(body["data"]["totalTasks"], 0);
    assert_eq!(body["data"]["overdueTasks"], 0);

    let (status, body) = ctx
        .send(Method::GET, "/api/dashboard/quick-stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hasProjects"], false);
    assert_eq!(body["data"]["hasTasks"], false);
}

#[tokio::test]
async fn test_deactivated_account_loses_access() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register("Ada").await;

    let (status, _) = ctx
        .send(Method::PUT, "/api/auth/deactivate", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account has been deactivated");
}
