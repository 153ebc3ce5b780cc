/// Ownership guard
///
/// A project belongs to exactly one user, its owner, and only the owner may
/// read or change it or any of its tasks. Tasks are authorized through their
/// project; a task's own `assigned_to` and `created_by` grant nothing.
///
/// Failure reporting differs by resource:
///
/// | Check                                  | Result                        |
/// |----------------------------------------|-------------------------------|
/// | project missing or owned by someone else | `ProjectNotFound` (404)     |
/// | task missing                           | `TaskNotFound` (404)          |
/// | task exists, caller doesn't own project | `AccessDenied` (403)         |
///
/// Hiding other users' projects behind "not found" keeps their existence
/// private.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::authorize_project;
/// use taskboard_shared::store::Stores;
/// use uuid::Uuid;
///
/// # async fn example(stores: Stores, user_id: Uuid, project_id: Uuid) {
/// match authorize_project(stores.projects.as_ref(), user_id, project_id).await {
///     Ok(project) => println!("{} may edit {}", user_id, project.name),
///     Err(e) => println!("denied: {}", e),
/// }
/// # }
/// ```

use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Project, Task};
use crate::store::{ProjectStore, TaskStore, PROJECT_HAS_TASKS};

pub const PROJECT_NOT_FOUND: &str = "Project not found";
pub const TASK_NOT_FOUND: &str = "Task not found";
pub const ACCESS_DENIED: &str = "Access denied";

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Project not found")]
    ProjectNotFound,

    #[error("Task not found")]
    TaskNotFound,

    /// The task exists but its project isn't the caller's
    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    Store(#[from] CoreError),
}

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::ProjectNotFound => CoreError::NotFound(PROJECT_NOT_FOUND.to_string()),
            AuthzError::TaskNotFound => CoreError::NotFound(TASK_NOT_FOUND.to_string()),
            AuthzError::AccessDenied => CoreError::AccessDenied(ACCESS_DENIED.to_string()),
            AuthzError::Store(err) => err,
        }
    }
}

/// Returns the project if `user_id` owns it
pub async fn authorize_project(
    projects: &dyn ProjectStore,
    user_id: Uuid,
    project_id: Uuid,
) -> Result<Project, AuthzError> {
    match projects.find_project(project_id).await? {
        Some(project) if project.owner_id == user_id => Ok(project),
        Some(_) => {
            tracing::warn!(%user_id, %project_id, "Project access by non-owner");
            Err(AuthzError::ProjectNotFound)
        }
        None => Err(AuthzError::ProjectNotFound),
    }
}

/// Returns the task and its project if `user_id` owns the project
///
/// The task is resolved first so that a missing task and a foreign task are
/// told apart.
pub async fn authorize_task(
    tasks: &dyn TaskStore,
    projects: &dyn ProjectStore,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<(Task, Project), AuthzError> {
    let task = tasks
        .find_task(task_id)
        .await?
        .ok_or(AuthzError::TaskNotFound)?;

    match authorize_project(projects, user_id, task.project_id).await {
        Ok(project) => Ok((task, project)),
        Err(AuthzError::ProjectNotFound) => {
            tracing::warn!(%user_id, %task_id, "Task access outside owned projects");
            Err(AuthzError::AccessDenied)
        }
        Err(other) => Err(other),
    }
}

/// Whether a project may be deleted: only while no task references it
pub async fn can_delete(projects: &dyn ProjectStore, project_id: Uuid) -> Result<bool, CoreError> {
    Ok(!projects.project_has_tasks(project_id).await?)
}

/// [`can_delete`] as a precondition
pub async fn ensure_deletable(projects: &dyn ProjectStore, project_id: Uuid) -> Result<(), CoreError> {
    if can_delete(projects, project_id).await? {
        Ok(())
    } else {
        Err(CoreError::invalid_state(PROJECT_HAS_TASKS))
    }
}
