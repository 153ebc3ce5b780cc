/// Task endpoints
///
/// Tasks are reached through their project: only the project owner may read
/// or change them. Deadlines in the past are allowed only for tasks created
/// or kept in the done state, which the core decides.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{created, ok, path_id, tag_errors, validate_request, ExtraRules},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    envelope::Envelope,
    error::FieldError,
    models::{CreateTask, Priority, TaskDetails, TaskQuery, TaskStatus, UpdateTask},
    services::task::{KanbanBoard, TaskStatsSummary},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Task title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub deadline: DateTime<Utc>,
    pub project_id: Uuid,
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(range(min = 0.0, max = 1000.0, message = "Estimated hours must be between 0 and 1000"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0, message = "Position must be a non-negative integer"))]
    pub position: Option<i32>,
}

impl ExtraRules for CreateTaskRequest {
    fn extra_errors(&self) -> Vec<FieldError> {
        tag_errors(Some(&self.tags))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Task title must be between 3 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub tags: Option<Vec<String>>,

    #[validate(range(min = 0.0, max = 1000.0, message = "Estimated hours must be between 0 and 1000"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0.0, message = "Actual hours cannot be negative"))]
    pub actual_hours: Option<f64>,

    #[validate(range(min = 0, message = "Position must be a non-negative integer"))]
    pub position: Option<i32>,
}

impl ExtraRules for UpdateTaskRequest {
    fn extra_errors(&self) -> Vec<FieldError> {
        tag_errors(self.tags.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MoveRequest {
    pub status: TaskStatus,

    #[validate(range(min = 0, message = "Position must be a non-negative integer"))]
    pub position: Option<i32>,
}

impl ExtraRules for MoveRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpcomingQuery {
    #[validate(range(min = 0, max = 365, message = "Days must be between 0 and 365"))]
    pub days: Option<i64>,
}

impl ExtraRules for UpcomingQuery {}

/// Create a task in one of the caller's projects
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or a past deadline on a task that isn't done
/// - `404 Not Found`: The project is missing or belongs to someone else
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<TaskDetails>>)> {
    let Json(req) = body?;
    validate_request(&req)?;

    let input = CreateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        deadline: req.deadline,
        project_id: req.project_id,
        assigned_to: req.assigned_to,
        tags: req.tags,
        estimated_hours: req.estimated_hours,
        position: req.position,
    };
    Ok(created(state.services.tasks.create_task(auth.user_id, input).await?))
}

/// Paginated tasks of one project
///
/// Query parameters: `page`, `limit`, `status`, `priority`, `assignedTo`,
/// `search`, `deadlineFrom`, `deadlineTo`, `sortBy`, `sortOrder`.
pub async fn project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    project_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<TaskDetails>>>> {
    let project_id = path_id(project_id)?;
    let Query(query) = query?;
    Ok(ok(state
        .services
        .tasks
        .get_tasks_by_project(project_id, auth.user_id, query)
        .await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<TaskDetails>>> {
    let id = path_id(id)?;
    Ok(ok(state.services.tasks.get_task_by_id(id, auth.user_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<TaskDetails>>> {
    let id = path_id(id)?;
    let Json(req) = body?;
    validate_request(&req)?;

    let changes = UpdateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        deadline: req.deadline,
        assigned_to: req.assigned_to,
        tags: req.tags,
        estimated_hours: req.estimated_hours,
        actual_hours: req.actual_hours,
        position: req.position,
    };
    Ok(ok(state.services.tasks.update_task(id, auth.user_id, changes).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<TaskDetails>>> {
    let id = path_id(id)?;
    let Json(req) = body?;
    Ok(ok(state
        .services
        .tasks
        .update_task_status(id, auth.user_id, req.status)
        .await?))
}

/// Move a task to a kanban column, optionally at a given position
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<TaskDetails>>> {
    let id = path_id(id)?;
    let Json(req) = body?;
    validate_request(&req)?;

    Ok(ok(state
        .services
        .tasks
        .move_task(id, auth.user_id, req.status, req.position)
        .await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<()>>> {
    let id = path_id(id)?;
    Ok(ok(state.services.tasks.delete_task(id, auth.user_id).await?))
}

pub async fn kanban_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    project_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<KanbanBoard>>> {
    let project_id = path_id(project_id)?;
    Ok(ok(state
        .services
        .tasks
        .get_kanban_board(project_id, auth.user_id)
        .await?))
}

pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<TaskStatsSummary>>> {
    Ok(ok(state.services.tasks.get_task_stats(auth.user_id).await?))
}

/// Tasks assigned to the caller, soonest deadline first
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<TaskDetails>>>> {
    let Query(query) = query?;
    Ok(ok(state.services.tasks.get_my_tasks(auth.user_id, query).await?))
}

/// Open tasks due within `days` (default 7, at most 365)
pub async fn upcoming_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<UpcomingQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<TaskDetails>>>> {
    let Query(query) = query?;
    validate_request(&query)?;
    Ok(ok(state
        .services
        .tasks
        .get_upcoming_tasks(auth.user_id, query.days)
        .await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_request_rejects_negative_position() {
        let req: MoveRequest =
            serde_json::from_str(r#"{"status": "done", "position": -1}"#).unwrap();
        assert!(validate_request(&req).is_err());

        let req: MoveRequest = serde_json::from_str(r#"{"status": "in-progress"}"#).unwrap();
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn test_upcoming_query_bounds_days() {
        let query = UpcomingQuery { days: Some(100_000_000) };
        assert!(validate_request(&query).is_err());

        let query = UpcomingQuery { days: Some(-1) };
        assert!(validate_request(&query).is_err());

        assert!(validate_request(&UpcomingQuery { days: Some(30) }).is_ok());
        assert!(validate_request(&UpcomingQuery::default()).is_ok());
    }

    #[test]
    fn test_create_request_checks_tags_and_hours() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "Write docs",
            "deadline": "2030-01-01T00:00:00Z",
            "projectId": Uuid::new_v4(),
            "tags": ["  "],
            "estimatedHours": 2000.0
        }))
        .unwrap();
        assert!(validate_request(&req).is_err());
    }
}
