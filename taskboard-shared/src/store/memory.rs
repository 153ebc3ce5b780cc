//! In-memory entity store.
//!
//! Same contract as the PostgreSQL store, held in one
//! `tokio::sync::RwLock` so every write checks its uniqueness and reference
//! rules atomically. Populated views drop rows whose references are missing,
//! like the inner joins of the SQL store.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ProjectStore, TaskStore, UserStore, ASSIGNEE_MISSING, DUPLICATE_EMAIL_ON_REGISTER,
    DUPLICATE_EMAIL_ON_UPDATE, DUPLICATE_PROJECT_NAME, PROJECT_HAS_TASKS, PROJECT_MISSING,
};
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{column_order, completion_after};
use crate::models::query::{
    PageRequest, ProjectFilter, ProjectSortField, SortOrder, TaskFilter, TaskScope, TaskSortField,
};
use crate::models::task::normalize_tags;
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectDetails, Task, TaskDetails, TaskStatus,
    UpdateProject, UpdateTask, UpdateUser, User,
};
use crate::stats::{is_overdue, is_upcoming, ProjectStats, TaskStats};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn name_taken(&self, owner_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.projects
            .values()
            .any(|p| p.owner_id == owner_id && p.name == name && Some(p.id) != except)
    }

    fn project_details(&self, project: &Project) -> Option<ProjectDetails> {
        let owner = self.users.get(&project.owner_id)?;
        let task_count = self
            .tasks
            .values()
            .filter(|t| t.project_id == project.id)
            .count() as i64;

        Some(ProjectDetails {
            project: project.clone(),
            owner: owner.to_ref(),
            task_count,
        })
    }

    fn task_details(&self, task: &Task, at: DateTime<Utc>) -> Option<TaskDetails> {
        let project = self.projects.get(&task.project_id)?;
        let assignee = self.users.get(&task.assigned_to)?;
        let creator = self.users.get(&task.created_by)?;

        Some(TaskDetails::new(
            task.clone(),
            project.to_ref(),
            assignee.to_ref(),
            creator.to_ref(),
            at,
        ))
    }

    fn tasks_in_scope(&self, scope: TaskScope) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(move |t| match scope {
            TaskScope::Project(project_id) => t.project_id == project_id,
            TaskScope::Member(user_id) => t.assigned_to == user_id || t.created_by == user_id,
        })
    }
}

/// Store holding everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `None` sorts after every value, as PostgreSQL does by default
fn cmp_nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_projects(a: &Project, b: &Project, field: ProjectSortField, order: SortOrder) -> Ordering {
    let primary = match field {
        ProjectSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        ProjectSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        ProjectSortField::Name => a.name.cmp(&b.name),
        ProjectSortField::Status => a.status.cmp(&b.status),
        ProjectSortField::Priority => a.priority.cmp(&b.priority),
        ProjectSortField::StartDate => a.start_date.cmp(&b.start_date),
        ProjectSortField::EndDate => cmp_nulls_last(&a.end_date, &b.end_date),
    };
    directed(primary, order).then_with(|| a.id.cmp(&b.id))
}

fn compare_tasks(a: &Task, b: &Task, field: TaskSortField, order: SortOrder) -> Ordering {
    let primary = match field {
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        TaskSortField::Deadline => a.deadline.cmp(&b.deadline),
        TaskSortField::Priority => a.priority.cmp(&b.priority),
        TaskSortField::Status => a.status.cmp(&b.status),
        TaskSortField::Title => a.title.cmp(&b.title),
        TaskSortField::Position => a.position.cmp(&b.position),
    };
    directed(primary, order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn page_of<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

fn task_matches(task: &Task, filter: &TaskFilter) -> bool {
    filter.status.map_or(true, |s| task.status == s)
        && filter.priority.map_or(true, |p| task.priority == p)
        && filter.assigned_to.map_or(true, |u| task.assigned_to == u)
        && filter.deadline_from.map_or(true, |from| task.deadline >= from)
        && filter.deadline_to.map_or(true, |to| task.deadline <= to)
        && filter.search.as_deref().map_or(true, |term| {
            contains_ci(&task.title, term)
                || task
                    .description
                    .as_deref()
                    .map_or(false, |d| contains_ci(d, term))
        })
}

fn project_matches(project: &Project, filter: &ProjectFilter) -> bool {
    filter.status.map_or(true, |s| project.status == s)
        && filter.priority.map_or(true, |p| project.priority == p)
        && filter.search.as_deref().map_or(true, |term| {
            contains_ci(&project.name, term) || contains_ci(&project.description, term)
        })
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, data: NewUser) -> CoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&data.email, None) {
            return Err(CoreError::Conflict(DUPLICATE_EMAIL_ON_REGISTER.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            avatar: None,
            active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> CoreResult<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(CoreError::Conflict(DUPLICATE_EMAIL_ON_UPDATE.to_string()));
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .map(|u| {
                u.password_hash = password_hash.to_string();
                u.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&id)
            .map(|u| {
                u.active = active;
                u.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn record_login(&self, id: Uuid) -> CoreResult<()> {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, data: NewProject) -> CoreResult<Project> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&data.owner_id) {
            return Err(CoreError::not_found("User not found"));
        }
        if state.name_taken(data.owner_id, &data.name, None) {
            return Err(CoreError::Conflict(DUPLICATE_PROJECT_NAME.to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            owner_id: data.owner_id,
            status: data.status,
            priority: data.priority,
            start_date: data.start_date,
            end_date: data.end_date,
            color: data.color,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> CoreResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn project_details(&self, id: Uuid) -> CoreResult<Option<ProjectDetails>> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .get(&id)
            .and_then(|p| state.project_details(p)))
    }

    async fn list_projects(
        &self,
        owner_id: Uuid,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<ProjectDetails>, i64)> {
        let state = self.state.read().await;
        let mut projects: Vec<&Project> = state
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id && project_matches(p, filter))
            .collect();
        projects.sort_by(|a, b| compare_projects(a, b, filter.sort_by, filter.sort_order));

        let total = projects.len() as i64;
        let details = page_of(projects, page)
            .into_iter()
            .filter_map(|p| state.project_details(p))
            .collect();

        Ok((details, total))
    }

    async fn recent_projects(&self, owner_id: Uuid, limit: i64) -> CoreResult<Vec<ProjectDetails>> {
        let state = self.state.read().await;
        let mut projects: Vec<&Project> = state
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .collect();
        projects.sort_by(|a, b| {
            compare_projects(a, b, ProjectSortField::UpdatedAt, SortOrder::Desc)
        });

        Ok(projects
            .into_iter()
            .take(limit.max(0) as usize)
            .filter_map(|p| state.project_details(p))
            .collect())
    }

    async fn update_project(&self, id: Uuid, changes: UpdateProject) -> CoreResult<Option<Project>> {
        let mut state = self.state.write().await;
        let Some(owner_id) = state.projects.get(&id).map(|p| p.owner_id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            if state.name_taken(owner_id, name, Some(id)) {
                return Err(CoreError::Conflict(DUPLICATE_PROJECT_NAME.to_string()));
            }
        }

        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            project.name = name;
        }
        if let Some(description) = changes.description {
            project.description = description;
        }
        if let Some(status) = changes.status {
            project.status = status;
        }
        if let Some(priority) = changes.priority {
            project.priority = priority;
        }
        if let Some(start_date) = changes.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = changes.end_date {
            project.end_date = Some(end_date);
        }
        if let Some(color) = changes.color {
            project.color = color;
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn project_has_tasks(&self, id: Uuid) -> CoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.tasks.values().any(|t| t.project_id == id))
    }

    async fn delete_project(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        if state.tasks.values().any(|t| t.project_id == id) {
            return Err(CoreError::invalid_state(PROJECT_HAS_TASKS));
        }
        Ok(state.projects.remove(&id).is_some())
    }

    async fn project_stats(&self, owner_id: Uuid) -> CoreResult<ProjectStats> {
        let state = self.state.read().await;
        let mut stats = ProjectStats::default();
        for project in state.projects.values().filter(|p| p.owner_id == owner_id) {
            stats.record(project.status, project.priority);
        }
        Ok(stats)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, data: NewTask) -> CoreResult<Task> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&data.project_id) {
            return Err(CoreError::not_found(PROJECT_MISSING));
        }
        if !state.users.contains_key(&data.assigned_to) || !state.users.contains_key(&data.created_by) {
            return Err(CoreError::not_found(ASSIGNEE_MISSING));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            deadline: data.deadline,
            project_id: data.project_id,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            tags: data.tags,
            estimated_hours: data.estimated_hours,
            actual_hours: 0.0,
            completed_at: data.completed_at,
            position: data.position,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> CoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn task_details(&self, id: Uuid) -> CoreResult<Option<TaskDetails>> {
        let state = self.state.read().await;
        let now = Utc::now();
        Ok(state
            .tasks
            .get(&id)
            .and_then(|t| state.task_details(t, now)))
    }

    async fn list_tasks(
        &self,
        scope: TaskScope,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> CoreResult<(Vec<TaskDetails>, i64)> {
        let state = self.state.read().await;
        let now = Utc::now();
        let mut tasks: Vec<&Task> = state
            .tasks_in_scope(scope)
            .filter(|t| task_matches(t, filter))
            .collect();
        tasks.sort_by(|a, b| compare_tasks(a, b, filter.sort_by, filter.sort_order));

        let total = tasks.len() as i64;
        let details = page_of(tasks, page)
            .into_iter()
            .filter_map(|t| state.task_details(t, now))
            .collect();

        Ok((details, total))
    }

    async fn tasks_in_column(
        &self,
        project_id: Uuid,
        status: TaskStatus,
    ) -> CoreResult<Vec<TaskDetails>> {
        let state = self.state.read().await;
        let now = Utc::now();
        let mut tasks: Vec<&Task> = state
            .tasks_in_scope(TaskScope::Project(project_id))
            .filter(|t| t.status == status)
            .collect();
        tasks.sort_by(|a, b| column_order(a, b).then_with(|| a.id.cmp(&b.id)));

        Ok(tasks
            .into_iter()
            .filter_map(|t| state.task_details(t, now))
            .collect())
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: UpdateTask,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        if let Some(assignee) = changes.assigned_to {
            if !state.users.contains_key(&assignee) {
                return Err(CoreError::not_found(ASSIGNEE_MISSING));
            }
        }

        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(status) = changes.status {
            task.status = status;
            task.completed_at = completion_after(status, task.completed_at, now);
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(deadline) = changes.deadline {
            task.deadline = deadline;
        }
        if let Some(assigned_to) = changes.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(tags) = changes.tags {
            task.tags = normalize_tags(tags);
        }
        if let Some(hours) = changes.estimated_hours {
            task.estimated_hours = hours;
        }
        if let Some(hours) = changes.actual_hours {
            task.actual_hours = hours;
        }
        if let Some(position) = changes.position {
            task.position = position;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        task.status = status;
        task.completed_at = completion_after(status, task.completed_at, now);
        if let Some(position) = position {
            task.position = position;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.state.write().await.tasks.remove(&id).is_some())
    }

    async fn task_stats(&self, user_id: Uuid, at: DateTime<Utc>) -> CoreResult<TaskStats> {
        let state = self.state.read().await;
        let mut stats = TaskStats::default();
        for task in state.tasks_in_scope(TaskScope::Member(user_id)) {
            stats.record(task.status, task.priority, task.deadline, at);
        }
        Ok(stats)
    }

    async fn overdue_tasks(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<TaskDetails>> {
        let state = self.state.read().await;
        let mut tasks: Vec<&Task> = state
            .tasks_in_scope(TaskScope::Member(user_id))
            .filter(|t| is_overdue(t.status, t.deadline, at))
            .collect();
        tasks.sort_by(|a, b| compare_tasks(a, b, TaskSortField::Deadline, SortOrder::Asc));

        Ok(tasks
            .into_iter()
            .take(limit.max(0) as usize)
            .filter_map(|t| state.task_details(t, at))
            .collect())
    }

    async fn upcoming_tasks(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<TaskDetails>> {
        let state = self.state.read().await;
        let mut tasks: Vec<&Task> = state
            .tasks_in_scope(TaskScope::Member(user_id))
            .filter(|t| is_upcoming(t.status, t.deadline, (from, to)))
            .collect();
        tasks.sort_by(|a, b| compare_tasks(a, b, TaskSortField::Deadline, SortOrder::Asc));

        Ok(tasks
            .into_iter()
            .filter_map(|t| state.task_details(t, from))
            .collect())
    }
}
