//! PostgreSQL entity store.
//!
//! Thin adapter over the model SQL that translates constraint violations into
//! domain errors. Driver text only ever ends up in `CoreError::Internal`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    ProjectStore, TaskStore, UserStore, ASSIGNEE_MISSING, DUPLICATE_EMAIL_ON_REGISTER,
    DUPLICATE_EMAIL_ON_UPDATE, DUPLICATE_PROJECT_NAME, PROJECT_HAS_TASKS, PROJECT_MISSING,
};
use crate::error::{CoreError, CoreResult};
use crate::models::project::OWNER_NAME_CONSTRAINT;
use crate::models::query::{PageRequest, ProjectFilter, TaskFilter, TaskScope};
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectDetails, Task, TaskDetails, TaskStatus,
    UpdateProject, UpdateTask, UpdateUser, User,
};
use crate::stats::{ProjectStats, TaskStats};

const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.constraint() == Some(constraint),
        _ => false,
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Maps a failed task write: a dangling project or user reference is `NotFound`
fn task_write_error(err: sqlx::Error) -> CoreError {
    match is_foreign_key_violation(&err) {
        Some(constraint) if constraint.contains("project") => CoreError::not_found(PROJECT_MISSING),
        Some(_) => CoreError::not_found(ASSIGNEE_MISSING),
        None => err.into(),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, data: NewUser) -> CoreResult<User> {
        User::create(&self.pool, data).await.map_err(|e| {
            if is_unique_violation(&e, EMAIL_CONSTRAINT) {
                CoreError::Conflict(DUPLICATE_EMAIL_ON_REGISTER.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> CoreResult<Option<User>> {
        User::update(&self.pool, id, changes).await.map_err(|e| {
            if is_unique_violation(&e, EMAIL_CONSTRAINT) {
                CoreError::Conflict(DUPLICATE_EMAIL_ON_UPDATE.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> CoreResult<bool> {
        Ok(User::update_password(&self.pool, id, password_hash).await?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> CoreResult<bool> {
        Ok(User::set_active(&self.pool, id, active).await?)
    }

    async fn record_login(&self, id: Uuid) -> CoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn insert_project(&self, data: NewProject) -> CoreResult<Project> {
        Project::create(&self.pool, data).await.map_err(|e| {
            if is_unique_violation(&e, OWNER_NAME_CONSTRAINT) {
                CoreError::Conflict(DUPLICATE_PROJECT_NAME.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn find_project(&self, id: Uuid) -> CoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn project_details(&self, id: Uuid) -> CoreResult<Option<ProjectDetails>> {
        Ok(Project::find_details(&self.pool, id).await?)
    }

    async fn list_projects(
        &self,
        owner_id: Uuid,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<ProjectDetails>, i64)> {
        Ok(Project::list_details(&self.pool, owner_id, filter, page).await?)
    }

    async fn recent_projects(&self, owner_id: Uuid, limit: i64) -> CoreResult<Vec<ProjectDetails>> {
        Ok(Project::recent(&self.pool, owner_id, limit).await?)
    }

    async fn update_project(&self, id: Uuid, changes: UpdateProject) -> CoreResult<Option<Project>> {
        Project::update(&self.pool, id, changes).await.map_err(|e| {
            if is_unique_violation(&e, OWNER_NAME_CONSTRAINT) {
                CoreError::Conflict(DUPLICATE_PROJECT_NAME.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn project_has_tasks(&self, id: Uuid) -> CoreResult<bool> {
        Ok(Project::has_tasks(&self.pool, id).await?)
    }

    async fn delete_project(&self, id: Uuid) -> CoreResult<bool> {
        Project::delete(&self.pool, id).await.map_err(|e| {
            if is_foreign_key_violation(&e).is_some() {
                debug!(project_id = %id, "Delete raced with a task insert");
                CoreError::invalid_state(PROJECT_HAS_TASKS)
            } else {
                e.into()
            }
        })
    }

    async fn project_stats(&self, owner_id: Uuid) -> CoreResult<ProjectStats> {
        Ok(Project::stats_for_owner(&self.pool, owner_id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, data: NewTask) -> CoreResult<Task> {
        Task::create(&self.pool, data).await.map_err(task_write_error)
    }

    async fn find_task(&self, id: Uuid) -> CoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn task_details(&self, id: Uuid) -> CoreResult<Option<TaskDetails>> {
        Ok(Task::find_details(&self.pool, id).await?)
    }

    async fn list_tasks(
        &self,
        scope: TaskScope,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<TaskDetails>, i64)> {
        Ok(Task::list_details(&self.pool, scope, filter, page).await?)
    }

    async fn tasks_in_column(
        &self,
        project_id: Uuid,
        status: TaskStatus,
    ) -> CoreResult<Vec<TaskDetails>> {
        Ok(Task::list_by_project_and_status(&self.pool, project_id, status).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: UpdateTask,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>> {
        Task::update(&self.pool, id, changes, now)
            .await
            .map_err(task_write_error)
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>> {
        Ok(Task::set_status(&self.pool, id, status, position, now).await?)
    }

    async fn delete_task(&self, id: Uuid) -> CoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn task_stats(&self, user_id: Uuid, at: DateTime<Utc>) -> CoreResult<TaskStats> {
        Ok(Task::stats_for_member(&self.pool, user_id, at).await?)
    }

    async fn overdue_tasks(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<TaskDetails>> {
        Ok(Task::overdue_for_member(&self.pool, user_id, at, limit).await?)
    }

    async fn upcoming_tasks(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<TaskDetails>> {
        Ok(Task::upcoming_for_member(&self.pool, user_id, from, to).await?)
    }
}
