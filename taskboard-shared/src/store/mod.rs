//! Entity store interface.
//!
//! The service layer talks to persistence only through these traits. Two
//! backends implement them:
//!
//! - [`postgres::PgStore`]: production store. Uniqueness and referential rules
//!   are enforced by the schema and surfaced as `Conflict` / `NotFound` /
//!   `InvalidState`; aggregations are single grouped queries.
//! - [`memory::MemoryStore`]: in-process store with the same contract, used by
//!   tests and local runs without a database. All rules are checked under one
//!   write lock so they hold under concurrent requests too.
//!
//! Population of referenced users and projects happens here, never in services.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::query::{PageRequest, ProjectFilter, TaskFilter, TaskScope};
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectDetails, Task, TaskDetails, TaskStatus,
    UpdateProject, UpdateTask, UpdateUser, User,
};
use crate::stats::{ProjectStats, TaskStats};

pub const DUPLICATE_PROJECT_NAME: &str = "Project with this name already exists";
pub const DUPLICATE_EMAIL_ON_REGISTER: &str = "User already exists with this email";
pub const DUPLICATE_EMAIL_ON_UPDATE: &str = "Email already exists";
pub const PROJECT_HAS_TASKS: &str = "Cannot delete project with existing tasks";
pub const PROJECT_MISSING: &str = "Project not found";
pub const ASSIGNEE_MISSING: &str = "Assigned user not found";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; a taken email is a `Conflict`
    async fn insert_user(&self, data: NewUser) -> CoreResult<User>;

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    /// Looks up by normalized email
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    /// Applies profile changes; an email taken by someone else is a `Conflict`
    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> CoreResult<Option<User>>;

    async fn set_password(&self, id: Uuid, password_hash: &str) -> CoreResult<bool>;

    async fn set_active(&self, id: Uuid, active: bool) -> CoreResult<bool>;

    async fn record_login(&self, id: Uuid) -> CoreResult<()>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Inserts a project; a duplicate (owner, name) is a `Conflict`
    async fn insert_project(&self, data: NewProject) -> CoreResult<Project>;

    async fn find_project(&self, id: Uuid) -> CoreResult<Option<Project>>;

    async fn project_details(&self, id: Uuid) -> CoreResult<Option<ProjectDetails>>;

    async fn list_projects(
        &self,
        owner_id: Uuid,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<ProjectDetails>, i64)>;

    /// Most recently updated first
    async fn recent_projects(&self, owner_id: Uuid, limit: i64) -> CoreResult<Vec<ProjectDetails>>;

    /// Applies changes; renaming onto another project of the same owner is a `Conflict`
    async fn update_project(&self, id: Uuid, changes: UpdateProject) -> CoreResult<Option<Project>>;

    /// Existence check, stops at the first referencing task
    async fn project_has_tasks(&self, id: Uuid) -> CoreResult<bool>;

    /// Removes a project; fails with `InvalidState` while tasks reference it
    async fn delete_project(&self, id: Uuid) -> CoreResult<bool>;

    async fn project_stats(&self, owner_id: Uuid) -> CoreResult<ProjectStats>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task; a missing project or user is `NotFound`
    async fn insert_task(&self, data: NewTask) -> CoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> CoreResult<Option<Task>>;

    async fn task_details(&self, id: Uuid) -> CoreResult<Option<TaskDetails>>;

    async fn list_tasks(
        &self,
        scope: TaskScope,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<TaskDetails>, i64)>;

    /// One kanban column, sorted by (position asc, created_at asc)
    async fn tasks_in_column(
        &self,
        project_id: Uuid,
        status: TaskStatus,
    ) -> CoreResult<Vec<TaskDetails>>;

    /// Applies changes atomically; a status change rewrites `completed_at`
    async fn update_task(
        &self,
        id: Uuid,
        changes: UpdateTask,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>>;

    /// Sets status (and optionally position) atomically with `completed_at`
    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> CoreResult<bool>;

    /// Aggregates over tasks assigned to or created by `user_id`
    async fn task_stats(&self, user_id: Uuid, at: DateTime<Utc>) -> CoreResult<TaskStats>;

    /// Unfinished tasks past their deadline at `at`, earliest deadline first
    async fn overdue_tasks(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<TaskDetails>>;

    /// Unfinished tasks due within `[from, to]`, earliest deadline first
    async fn upcoming_tasks(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<TaskDetails>>;
}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory,
}

/// Shared handles to the entity stores
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub tasks: Arc<dyn TaskStore>,
    backend: Backend,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool.clone()));
        Self {
            users: store.clone(),
            projects: store.clone(),
            tasks: store,
            backend: Backend::Postgres(pool),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            users: store.clone(),
            projects: store.clone(),
            tasks: store,
            backend: Backend::Memory,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }

    /// Pool handle when backed by PostgreSQL
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            Backend::Memory => None,
        }
    }

    /// Whether the backing store answers
    pub async fn ping(&self) -> bool {
        match &self.backend {
            Backend::Postgres(pool) => crate::db::pool::health_check(pool).await.is_ok(),
            Backend::Memory => true,
        }
    }
}
