/// Project model and database operations
///
/// A project belongs to exactly one owner, who is the only user allowed to read
/// or change it and every task under it. Names are unique per owner; the
/// `projects_owner_name_key` index enforces this so concurrent creates cannot
/// both succeed.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('active', 'completed', 'on-hold', 'cancelled');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description VARCHAR(500) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     status project_status NOT NULL DEFAULT 'active',
///     priority priority_level NOT NULL DEFAULT 'medium',
///     start_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     end_date TIMESTAMPTZ,
///     color VARCHAR(7) NOT NULL DEFAULT '#3B82F6',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX projects_owner_name_key ON projects (owner_id, name);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::query::{like_pattern, PageRequest, ProjectFilter};
use super::{Priority, UserRef};
use crate::stats::{ProjectStats, ProjectStatsRow};

/// Display color given to projects created without one
pub const DEFAULT_PROJECT_COLOR: &str = "#3B82F6";

/// Unique index backing the per-owner name rule
pub const OWNER_NAME_CONSTRAINT: &str = "projects_owner_name_key";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    OnHold,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,

    /// Unique per owner
    pub name: String,

    pub description: String,

    pub owner_id: Uuid,

    pub status: ProjectStatus,

    pub priority: Priority,

    /// Defaults to creation time
    pub start_date: DateTime<Utc>,

    pub end_date: Option<DateTime<Utc>>,

    /// Hex display color
    pub color: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Project summary embedded in task responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// Project populated with its owner and task count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,

    pub owner: UserRef,

    pub task_count: i64,
}

impl<'r> FromRow<'r, PgRow> for ProjectDetails {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let project = Project::from_row(row)?;
        let owner = UserRef {
            id: project.owner_id,
            name: row.try_get("owner_name")?,
            email: row.try_get("owner_email")?,
        };

        Ok(Self {
            project,
            owner,
            task_count: row.try_get("task_count")?,
        })
    }
}

/// Client input for creating a project; unset fields get defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

/// Fully resolved project record ready for insertion
#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: String,
}

impl NewProject {
    /// Applies defaults: status active, priority medium, brand color, start now
    pub fn from_input(owner_id: Uuid, input: CreateProject, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            start_date: input.start_date.unwrap_or(now),
            end_date: input.end_date,
            color: input
                .color
                .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
        }
    }
}

/// Project changes; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

const DETAILS_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.owner_id, p.status, p.priority,
           p.start_date, p.end_date, p.color, p.created_at, p.updated_at,
           u.name AS owner_name, u.email AS owner_email,
           (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count
    FROM projects p
    JOIN users u ON u.id = p.owner_id
"#;

fn push_owner_filters(qb: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &ProjectFilter) {
    qb.push(" WHERE p.owner_id = ").push_bind(owner_id);

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND p.priority = ").push_bind(priority);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl Project {
    pub fn to_ref(&self) -> ProjectRef {
        ProjectRef {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
        }
    }

    /// Inserts a project
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`OWNER_NAME_CONSTRAINT`] when the owner
    /// already has a project with this name.
    pub async fn create(pool: &PgPool, data: NewProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, owner_id, status, priority,
                                  start_date, end_date, color)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, owner_id, status, priority,
                      start_date, end_date, color, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_id)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.color)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, owner_id, status, priority,
                   start_date, end_date, color, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Loads a project with owner and task count
    pub async fn find_details(pool: &PgPool, id: Uuid) -> Result<Option<ProjectDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        qb.push(" WHERE p.id = ").push_bind(id);

        let details = qb
            .build_query_as::<ProjectDetails>()
            .fetch_optional(pool)
            .await?;

        Ok(details)
    }

    /// One page of an owner's projects plus the total matching the filter
    pub async fn list_details(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProjectDetails>, i64), sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        push_owner_filters(&mut qb, owner_id, filter);
        qb.push(format!(
            " ORDER BY {} {}, p.id ASC",
            filter.sort_by.column(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());

        let projects = qb
            .build_query_as::<ProjectDetails>()
            .fetch_all(pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p");
        push_owner_filters(&mut count, owner_id, filter);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        Ok((projects, total))
    }

    /// Most recently updated projects of an owner
    pub async fn recent(
        pool: &PgPool,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ProjectDetails>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        qb.push(" WHERE p.owner_id = ").push_bind(owner_id);
        qb.push(" ORDER BY p.updated_at DESC LIMIT ").push_bind(limit);

        let projects = qb
            .build_query_as::<ProjectDetails>()
            .fetch_all(pool)
            .await?;

        Ok(projects)
    }

    /// Applies changes to a project
    ///
    /// Returns `None` if the project doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                start_date = COALESCE($6, start_date),
                end_date = COALESCE($7, end_date),
                color = COALESCE($8, color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, owner_id, status, priority,
                      start_date, end_date, color, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.color)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Whether any task references the project
    ///
    /// Uses `EXISTS` so the scan stops at the first match.
    pub async fn has_tasks(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tasks WHERE project_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Deletes a project
    ///
    /// The `tasks.project_id` foreign key is `ON DELETE RESTRICT`, so this fails
    /// with a foreign-key violation if a task was added concurrently.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts an owner's projects by status and priority in one pass
    pub async fn stats_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<ProjectStats, sqlx::Error> {
        let row = sqlx::query_as::<_, ProjectStatsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'active') AS active,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status = 'on-hold') AS on_hold,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                   COUNT(*) FILTER (WHERE priority = 'low') AS low,
                   COUNT(*) FILTER (WHERE priority = 'medium') AS medium,
                   COUNT(*) FILTER (WHERE priority = 'high') AS high
            FROM projects
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }
}
