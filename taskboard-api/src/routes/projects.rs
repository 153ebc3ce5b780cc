/// Project endpoints
///
/// Every route is scoped to the authenticated owner. A project owned by
/// someone else is reported as not found.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{created, is_hex_color, ok, path_id, validate_request, ExtraRules},
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
    models::{CreateProject, Priority, ProjectDetails, ProjectQuery, ProjectStatus, UpdateProject},
    services::project::{ProjectStatsSummary, ProjectWithTasks, RECENT_PROJECTS_LIMIT},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 2, max = 100, message = "Project name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: String,

    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

impl ExtraRules for CreateProjectRequest {
    fn extra_errors(&self) -> Vec<FieldError> {
        let mut errors = color_errors(self.color.as_deref());
        if let Some(end) = self.end_date {
            if end < Utc::now() {
                errors.push(FieldError::new("endDate", "End date cannot be in the past"));
            }
        }
        errors.extend(date_order_errors(self.start_date, self.end_date));
        errors
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 2, max = 100, message = "Project name must be between 2 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

impl ExtraRules for UpdateProjectRequest {
    fn extra_errors(&self) -> Vec<FieldError> {
        let mut errors = color_errors(self.color.as_deref());
        errors.extend(date_order_errors(self.start_date, self.end_date));
        errors
    }
}

fn color_errors(color: Option<&str>) -> Vec<FieldError> {
    match color {
        Some(c) if !is_hex_color(c) => {
            vec![FieldError::new("color", "Color must be a valid hex color")]
        }
        _ => Vec::new(),
    }
}

fn date_order_errors(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Vec<FieldError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            vec![FieldError::new("endDate", "End date must be after start date")]
        }
        _ => Vec::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Create a project owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: The caller already has a project with this name
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<ProjectDetails>>)> {
    let Json(req) = body?;
    validate_request(&req)?;

    let input = CreateProject {
        name: req.name,
        description: req.description,
        status: req.status,
        priority: req.priority,
        start_date: req.start_date,
        end_date: req.end_date,
        color: req.color,
    };
    Ok(created(state.services.projects.create_project(auth.user_id, input).await?))
}

/// Paginated, filtered listing of the caller's projects
///
/// Query parameters: `page`, `limit`, `status`, `priority`, `search`,
/// `sortBy`, `sortOrder`.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<ProjectDetails>>>> {
    let Query(query) = query?;
    Ok(ok(state.services.projects.get_projects(auth.user_id, query).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<ProjectDetails>>> {
    let id = path_id(id)?;
    Ok(ok(state.services.projects.get_project_by_id(id, auth.user_id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<ProjectDetails>>> {
    let id = path_id(id)?;
    let Json(req) = body?;
    validate_request(&req)?;

    let changes = UpdateProject {
        name: req.name,
        description: req.description,
        status: req.status,
        priority: req.priority,
        start_date: req.start_date,
        end_date: req.end_date,
        color: req.color,
    };
    Ok(ok(state.services.projects.update_project(id, auth.user_id, changes).await?))
}

/// Delete a project
///
/// # Errors
///
/// - `400 Bad Request`: The project still has tasks
/// - `404 Not Found`: No such project for this owner
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<()>>> {
    let id = path_id(id)?;
    Ok(ok(state.services.projects.delete_project(id, auth.user_id).await?))
}

pub async fn project_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<ProjectStatsSummary>>> {
    Ok(ok(state.services.projects.get_project_stats(auth.user_id).await?))
}

pub async fn recent_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<ProjectDetails>>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(RECENT_PROJECTS_LIMIT).clamp(1, 50);
    Ok(ok(state.services.projects.get_recent_projects(auth.user_id, limit).await?))
}

/// A project with its tasks grouped by status column
pub async fn project_with_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<ProjectWithTasks>>> {
    let id = path_id(id)?;
    Ok(ok(state.services.projects.get_project_with_tasks(id, auth.user_id).await?))
}
