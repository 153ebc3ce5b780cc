/// Listing inputs: pagination, sorting and filters
///
/// Sort fields are closed enums so that the column names pushed into SQL come
/// from a fixed whitelist, never from client input.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Priority, ProjectStatus, TaskStatus};

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated page request (1-based page, clamped limit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Builds a page request, falling back to `default_limit` and clamping to `1..=100`
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Status,
    Priority,
    StartDate,
    EndDate,
}

impl ProjectSortField {
    pub fn column(&self) -> &'static str {
        match self {
            ProjectSortField::CreatedAt => "p.created_at",
            ProjectSortField::UpdatedAt => "p.updated_at",
            ProjectSortField::Name => "p.name",
            ProjectSortField::Status => "p.status",
            ProjectSortField::Priority => "p.priority",
            ProjectSortField::StartDate => "p.start_date",
            ProjectSortField::EndDate => "p.end_date",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Deadline,
    Priority,
    Status,
    Title,
    Position,
}

impl TaskSortField {
    pub fn column(&self) -> &'static str {
        match self {
            TaskSortField::CreatedAt => "t.created_at",
            TaskSortField::UpdatedAt => "t.updated_at",
            TaskSortField::Deadline => "t.deadline",
            TaskSortField::Priority => "t.priority",
            TaskSortField::Status => "t.status",
            TaskSortField::Title => "t.title",
            TaskSortField::Position => "t.position",
        }
    }
}

/// Filters for an owner's project listing
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    pub sort_by: ProjectSortField,
    pub sort_order: SortOrder,
}

/// Which tasks a listing or aggregation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// All tasks of one project
    Project(Uuid),
    /// Tasks assigned to or created by one user
    Member(Uuid),
}

/// Filters for task listings
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    pub deadline_from: Option<DateTime<Utc>>,
    pub deadline_to: Option<DateTime<Utc>>,
    pub sort_by: TaskSortField,
    pub sort_order: SortOrder,
}

/// Trims a search term, treating blank input as no filter
pub fn normalized_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// `ILIKE` pattern matching `term` as a literal substring
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Client query for project listings, as sent on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub sort_by: Option<ProjectSortField>,
    pub sort_order: Option<SortOrder>,
}

impl ProjectQuery {
    /// Default page size for project listings
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn resolve(self) -> (ProjectFilter, PageRequest) {
        let filter = ProjectFilter {
            status: self.status,
            priority: self.priority,
            search: normalized_search(self.search.as_deref()),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        };
        (filter, PageRequest::new(self.page, self.limit, Self::DEFAULT_LIMIT))
    }
}

/// Client query for task listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    pub deadline_from: Option<DateTime<Utc>>,
    pub deadline_to: Option<DateTime<Utc>>,
    pub sort_by: Option<TaskSortField>,
    pub sort_order: Option<SortOrder>,
}

impl TaskQuery {
    /// Resolves against the listing's own defaults for page size and ordering
    pub fn resolve(
        self,
        default_limit: u32,
        default_sort: (TaskSortField, SortOrder),
    ) -> (TaskFilter, PageRequest) {
        let filter = TaskFilter {
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
            search: normalized_search(self.search.as_deref()),
            deadline_from: self.deadline_from,
            deadline_to: self.deadline_to,
            sort_by: self.sort_by.unwrap_or(default_sort.0),
            sort_order: self.sort_order.unwrap_or(default_sort.1),
        };
        (filter, PageRequest::new(self.page, self.limit, default_limit))
    }
}
