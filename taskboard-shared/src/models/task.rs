/// Task model and database operations
///
/// Tasks live inside a project and move across the kanban columns
/// `todo → in-progress → done` (any order, see [`crate::lifecycle`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description VARCHAR(1000),
///     status task_status NOT NULL DEFAULT 'todo',
///     priority priority_level NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ NOT NULL,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE RESTRICT,
///     assigned_to UUID NOT NULL REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     estimated_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
///     actual_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
///     completed_at TIMESTAMPTZ,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK ((status = 'done') = (completed_at IS NOT NULL))
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, NewTask, Task, TaskStatus};
/// use chrono::{Duration, Utc};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let now = Utc::now();
/// let input = CreateTask {
///     title: "Write release notes".to_string(),
///     deadline: now + Duration::days(3),
///     project_id,
///     ..CreateTask::default()
/// };
/// let task = Task::create(&pool, NewTask::from_input(user_id, input, now)).await?;
///
/// // Completing stamps completed_at in the same statement
/// let done = Task::set_status(&pool, task.id, TaskStatus::Done, None, Utc::now()).await?;
/// assert!(done.and_then(|t| t.completed_at).is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::query::{like_pattern, PageRequest, TaskFilter, TaskScope};
use super::{Priority, ProjectRef, UserRef};
use crate::lifecycle::completion_after;
use crate::stats::{is_overdue, TaskStats, TaskStatsRow};

/// Kanban column a task sits in
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Heading of the kanban column
    pub fn column_title(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: Priority,

    pub deadline: DateTime<Utc>,

    /// Fixed at creation
    pub project_id: Uuid,

    /// Informational; access goes through the project owner
    pub assigned_to: Uuid,

    /// Fixed at creation
    pub created_by: Uuid,

    pub tags: Vec<String>,

    pub estimated_hours: f64,

    pub actual_hours: f64,

    /// Set iff `status` is `done`
    pub completed_at: Option<DateTime<Utc>>,

    /// Order within the (project, status) column
    pub position: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Task populated with its project, assignee and creator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,

    pub project: ProjectRef,

    pub assignee: UserRef,

    pub creator: UserRef,

    /// Evaluated when the task was read
    pub is_overdue: bool,
}

impl TaskDetails {
    pub fn new(
        task: Task,
        project: ProjectRef,
        assignee: UserRef,
        creator: UserRef,
        at: DateTime<Utc>,
    ) -> Self {
        let is_overdue = is_overdue(task.status, task.deadline, at);
        Self {
            task,
            project,
            assignee,
            creator,
            is_overdue,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for TaskDetails {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let task = Task::from_row(row)?;
        let project = ProjectRef {
            id: task.project_id,
            name: row.try_get("project_name")?,
            color: row.try_get("project_color")?,
        };
        let assignee = UserRef {
            id: task.assigned_to,
            name: row.try_get("assignee_name")?,
            email: row.try_get("assignee_email")?,
        };
        let creator = UserRef {
            id: task.created_by,
            name: row.try_get("creator_name")?,
            email: row.try_get("creator_email")?,
        };

        Ok(Self::new(task, project, assignee, creator, Utc::now()))
    }
}

/// Client input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub deadline: DateTime<Utc>,
    pub project_id: Uuid,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub position: Option<i32>,
}

/// Fully resolved task record ready for insertion
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub tags: Vec<String>,
    pub estimated_hours: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub position: i32,
}

impl NewTask {
    /// Applies defaults: status todo, priority medium, assigned to the creator,
    /// no estimate, position 0. Tasks created as done are stamped completed.
    pub fn from_input(created_by: Uuid, input: CreateTask, now: DateTime<Utc>) -> Self {
        let status = input.status.unwrap_or_default();
        Self {
            title: input.title.trim().to_string(),
            description: input.description,
            status,
            priority: input.priority.unwrap_or_default(),
            deadline: input.deadline,
            project_id: input.project_id,
            assigned_to: input.assigned_to.unwrap_or(created_by),
            created_by,
            tags: normalize_tags(input.tags),
            estimated_hours: input.estimated_hours.unwrap_or(0.0),
            completed_at: completion_after(status, None, now),
            position: input.position.unwrap_or(0),
        }
    }
}

/// Task changes; `None` leaves the field untouched. The project is immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub position: Option<i32>,
}

/// Trims tags, drops blanks and duplicates, keeps first-seen order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, deadline, project_id, \
     assigned_to, created_by, tags, estimated_hours, actual_hours, completed_at, position, \
     created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.deadline, t.project_id,
           t.assigned_to, t.created_by, t.tags, t.estimated_hours, t.actual_hours,
           t.completed_at, t.position, t.created_at, t.updated_at,
           p.name AS project_name, p.color AS project_color,
           a.name AS assignee_name, a.email AS assignee_email,
           c.name AS creator_name, c.email AS creator_email
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
    JOIN users a ON a.id = t.assigned_to
    JOIN users c ON c.id = t.created_by
"#;

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: TaskScope) {
    match scope {
        TaskScope::Project(project_id) => {
            qb.push(" WHERE t.project_id = ").push_bind(project_id);
        }
        TaskScope::Member(user_id) => {
            qb.push(" WHERE (t.assigned_to = ")
                .push_bind(user_id)
                .push(" OR t.created_by = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: TaskScope, filter: &TaskFilter) {
    push_scope(qb, scope);

    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(assigned_to) = filter.assigned_to {
        qb.push(" AND t.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(from) = filter.deadline_from {
        qb.push(" AND t.deadline >= ").push_bind(from);
    }
    if let Some(to) = filter.deadline_to {
        qb.push(" AND t.deadline <= ").push_bind(to);
    }
}

impl Task {
    /// Inserts a task
    ///
    /// # Errors
    ///
    /// Fails with a foreign-key violation if the project or a referenced user
    /// doesn't exist.
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, deadline, project_id,
                               assigned_to, created_by, tags, estimated_hours, completed_at,
                               position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.deadline)
        .bind(data.project_id)
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(data.tags)
        .bind(data.estimated_hours)
        .bind(data.completed_at)
        .bind(data.position)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    pub async fn find_details(pool: &PgPool, id: Uuid) -> Result<Option<TaskDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        qb.push(" WHERE t.id = ").push_bind(id);

        let task = qb
            .build_query_as::<TaskDetails>()
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// One page of tasks in `scope` plus the total matching the filter
    pub async fn list_details(
        pool: &PgPool,
        scope: TaskScope,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<(Vec<TaskDetails>, i64), sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(format!(
            " ORDER BY {} {}, t.created_at ASC, t.id ASC",
            filter.sort_by.column(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());

        let tasks = qb.build_query_as::<TaskDetails>().fetch_all(pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_filters(&mut count, scope, filter);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        Ok((tasks, total))
    }

    /// Tasks of one kanban column, ordered by position then creation time
    pub async fn list_by_project_and_status(
        pool: &PgPool,
        project_id: Uuid,
        status: TaskStatus,
    ) -> Result<Vec<TaskDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        qb.push(" WHERE t.project_id = ").push_bind(project_id);
        qb.push(" AND t.status = ").push_bind(status);
        qb.push(" ORDER BY t.position ASC, t.created_at ASC, t.id ASC");

        let tasks = qb.build_query_as::<TaskDetails>().fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Applies changes to a task
    ///
    /// A status change rewrites `completed_at` in the same statement. Returns
    /// `None` if the task doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
            qb.push(", completed_at = CASE WHEN ")
                .push_bind(status.is_done())
                .push(" THEN COALESCE(completed_at, ")
                .push_bind(now)
                .push(") ELSE NULL END");
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(deadline) = data.deadline {
            qb.push(", deadline = ").push_bind(deadline);
        }
        if let Some(assigned_to) = data.assigned_to {
            qb.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(tags) = data.tags {
            qb.push(", tags = ").push_bind(normalize_tags(tags));
        }
        if let Some(hours) = data.estimated_hours {
            qb.push(", estimated_hours = ").push_bind(hours);
        }
        if let Some(hours) = data.actual_hours {
            qb.push(", actual_hours = ").push_bind(hours);
        }
        if let Some(position) = data.position {
            qb.push(", position = ").push_bind(position);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {TASK_COLUMNS}"));

        let task = qb.build_query_as::<Task>().fetch_optional(pool).await?;

        Ok(task)
    }

    /// Moves a task to `status`, optionally setting its position
    ///
    /// Entering `done` keeps an existing completion time or stamps `now`;
    /// any other status clears it.
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $2,
                completed_at = CASE WHEN $3 THEN COALESCE(completed_at, $4) ELSE NULL END,
                position = COALESCE($5, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(status.is_done())
        .bind(now)
        .bind(position)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts a member's tasks by status and priority, and overdue at `at`
    pub async fn stats_for_member(
        pool: &PgPool,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<TaskStats, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskStatsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'todo') AS todo,
                   COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'done') AS done,
                   COUNT(*) FILTER (WHERE priority = 'low') AS low,
                   COUNT(*) FILTER (WHERE priority = 'medium') AS medium,
                   COUNT(*) FILTER (WHERE priority = 'high') AS high,
                   COUNT(*) FILTER (WHERE status <> 'done' AND deadline < $2) AS overdue
            FROM tasks
            WHERE assigned_to = $1 OR created_by = $1
            "#,
        )
        .bind(user_id)
        .bind(at)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// A member's overdue tasks, earliest deadline first
    pub async fn overdue_for_member(
        pool: &PgPool,
        user_id: Uuid,
        at: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TaskDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_scope(&mut qb, TaskScope::Member(user_id));
        qb.push(" AND t.status <> 'done' AND t.deadline < ").push_bind(at);
        qb.push(" ORDER BY t.deadline ASC LIMIT ").push_bind(limit);

        let tasks = qb.build_query_as::<TaskDetails>().fetch_all(pool).await?;

        Ok(tasks)
    }

    /// A member's unfinished tasks due within `[from, to]`, earliest first
    pub async fn upcoming_for_member(
        pool: &PgPool,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TaskDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_scope(&mut qb, TaskScope::Member(user_id));
        qb.push(" AND t.status <> 'done' AND t.deadline >= ").push_bind(from);
        qb.push(" AND t.deadline <= ").push_bind(to);
        qb.push(" ORDER BY t.deadline ASC");

        let tasks = qb.build_query_as::<TaskDetails>().fetch_all(pool).await?;

        Ok(tasks)
    }
}
