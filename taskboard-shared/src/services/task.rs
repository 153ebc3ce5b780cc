/// Task use cases
///
/// Tasks are authorized through their project. Status changes go through the
/// store's atomic status update so `completed_at` is set exactly when the
/// task is done.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{authorize_project, authorize_task, AuthzError, TASK_NOT_FOUND};
use crate::envelope::{Envelope, Pagination};
use crate::error::{CoreError, CoreResult, FieldError};
use crate::lifecycle::{check_changed_deadline, check_new_deadline, Transition, DEFAULT_POSITION};
use crate::models::task::normalize_tags;
use crate::models::{
    CreateTask, NewTask, ProjectDetails, SortOrder, TaskDetails, TaskQuery, TaskScope,
    TaskSortField, TaskStatus, UpdateTask,
};
use crate::stats::{upcoming_window, TaskStats, DEFAULT_UPCOMING_DAYS, MAX_UPCOMING_DAYS};
use crate::store::{Stores, TaskStore};

/// Reported when a project can't be used for task operations
pub const PROJECT_NOT_ACCESSIBLE: &str = "Project not found or access denied";

/// Number of overdue tasks attached to the task statistics
pub const OVERDUE_TASKS_LIMIT: i64 = 5;

const PROJECT_TASKS_LIMIT: u32 = 20;
const MY_TASKS_LIMIT: u32 = 10;

/// Tasks of one project grouped by status, each in column order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksByStatus {
    pub todo: Vec<TaskDetails>,
    #[serde(rename = "in-progress")]
    pub in_progress: Vec<TaskDetails>,
    pub done: Vec<TaskDetails>,
}

/// Loads the three columns of a project concurrently
pub(crate) async fn load_columns(
    tasks: &dyn TaskStore,
    project_id: Uuid,
) -> CoreResult<TasksByStatus> {
    let (todo, in_progress, done) = tokio::try_join!(
        tasks.tasks_in_column(project_id, TaskStatus::Todo),
        tasks.tasks_in_column(project_id, TaskStatus::InProgress),
        tasks.tasks_in_column(project_id, TaskStatus::Done),
    )?;

    Ok(TasksByStatus {
        todo,
        in_progress,
        done,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub id: TaskStatus,
    pub title: String,
    pub tasks: Vec<TaskDetails>,
}

impl KanbanColumn {
    fn new(status: TaskStatus, tasks: Vec<TaskDetails>) -> Self {
        Self {
            id: status,
            title: status.column_title().to_string(),
            tasks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanColumns {
    pub todo: KanbanColumn,
    #[serde(rename = "in-progress")]
    pub in_progress: KanbanColumn,
    pub done: KanbanColumn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanBoard {
    pub project: ProjectDetails,
    pub columns: KanbanColumns,
}

/// Task statistics plus the most overdue tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatsSummary {
    #[serde(flatten)]
    pub stats: TaskStats,
    pub overdue_tasks: Vec<TaskDetails>,
}

#[derive(Clone)]
pub struct TaskService {
    stores: Stores,
}

impl TaskService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Ownership check for project-level task operations, with its own wording
    async fn accessible_project(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        match authorize_project(self.stores.projects.as_ref(), user_id, project_id).await {
            Ok(_) => Ok(()),
            Err(AuthzError::ProjectNotFound) => Err(CoreError::not_found(PROJECT_NOT_ACCESSIBLE)),
            Err(other) => Err(other.into()),
        }
    }

    async fn details(&self, task_id: Uuid) -> CoreResult<TaskDetails> {
        self.stores
            .tasks
            .task_details(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found(TASK_NOT_FOUND))
    }

    /// Creates a task in a project the creator owns
    ///
    /// A past deadline is only accepted for a task created as done.
    pub async fn create_task(
        &self,
        creator_id: Uuid,
        input: CreateTask,
    ) -> CoreResult<Envelope<TaskDetails>> {
        self.accessible_project(creator_id, input.project_id).await?;

        let now = Utc::now();
        check_new_deadline(input.deadline, input.status.unwrap_or_default(), now)?;

        let data = NewTask::from_input(creator_id, input, now);
        if data.title.is_empty() {
            return Err(CoreError::Validation(vec![FieldError::new(
                "title",
                "Task title is required",
            )]));
        }

        let task = self.stores.tasks.insert_task(data).await?;
        info!(task_id = %task.id, project_id = %task.project_id, %creator_id, "Task created");

        let details = self.details(task.id).await?;
        Ok(Envelope::ok(details, "Task created successfully"))
    }

    pub async fn get_tasks_by_project(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        query: TaskQuery,
    ) -> CoreResult<Envelope<Vec<TaskDetails>>> {
        self.accessible_project(user_id, project_id).await?;

        let (filter, page) =
            query.resolve(PROJECT_TASKS_LIMIT, (TaskSortField::CreatedAt, SortOrder::Desc));
        let (tasks, total) = self
            .stores
            .tasks
            .list_tasks(TaskScope::Project(project_id), &filter, page)
            .await?;
        debug!(%project_id, total, "Listed project tasks");

        Ok(Envelope::paginated(
            tasks,
            "Tasks retrieved successfully",
            Pagination::new(page, total),
        ))
    }

    pub async fn get_task_by_id(
        &self,
        task_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<Envelope<TaskDetails>> {
        authorize_task(
            self.stores.tasks.as_ref(),
            self.stores.projects.as_ref(),
            user_id,
            task_id,
        )
        .await?;

        let details = self.details(task_id).await?;
        Ok(Envelope::ok(details, "Task retrieved successfully"))
    }

    /// Applies changes; the project can't be changed
    ///
    /// Only a deadline that is being changed is checked, against the status
    /// the task will have afterwards.
    pub async fn update_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        mut changes: UpdateTask,
    ) -> CoreResult<Envelope<TaskDetails>> {
        let (task, _) = authorize_task(
            self.stores.tasks.as_ref(),
            self.stores.projects.as_ref(),
            user_id,
            task_id,
        )
        .await?;

        let now = Utc::now();
        let resulting_status = changes.status.unwrap_or(task.status);
        check_changed_deadline(changes.deadline, resulting_status, now)?;

        changes.title = changes.title.map(|t| t.trim().to_string());
        if matches!(changes.title.as_deref(), Some("")) {
            return Err(CoreError::Validation(vec![FieldError::new(
                "title",
                "Task title is required",
            )]));
        }
        changes.tags = changes.tags.map(normalize_tags);

        self.stores
            .tasks
            .update_task(task_id, changes, now)
            .await?
            .ok_or_else(|| CoreError::not_found(TASK_NOT_FOUND))?;
        info!(
            %task_id,
            %user_id,
            transition = ?Transition::between(task.status, resulting_status),
            "Task updated"
        );

        let details = self.details(task_id).await?;
        Ok(Envelope::ok(details, "Task updated successfully"))
    }

    pub async fn update_task_status(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        status: TaskStatus,
    ) -> CoreResult<Envelope<TaskDetails>> {
        self.change_status(task_id, user_id, status, None).await?;
        let details = self.details(task_id).await?;
        Ok(Envelope::ok(details, "Task status updated successfully"))
    }

    /// Moves a task to a column and position (default 0)
    ///
    /// Siblings keep their positions; equal positions are ordered by creation time.
    pub async fn move_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
    ) -> CoreResult<Envelope<TaskDetails>> {
        let position = position.unwrap_or(DEFAULT_POSITION);
        self.change_status(task_id, user_id, status, Some(position))
            .await?;
        let details = self.details(task_id).await?;
        Ok(Envelope::ok(details, "Task moved successfully"))
    }

    async fn change_status(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
    ) -> CoreResult<()> {
        let (task, _) = authorize_task(
            self.stores.tasks.as_ref(),
            self.stores.projects.as_ref(),
            user_id,
            task_id,
        )
        .await?;

        self.stores
            .tasks
            .set_task_status(task_id, status, position, Utc::now())
            .await?
            .ok_or_else(|| CoreError::not_found(TASK_NOT_FOUND))?;
        info!(
            %task_id,
            %user_id,
            from = task.status.as_str(),
            to = status.as_str(),
            transition = ?Transition::between(task.status, status),
            ?position,
            "Task status changed"
        );

        Ok(())
    }

    pub async fn delete_task(&self, task_id: Uuid, user_id: Uuid) -> CoreResult<Envelope<()>> {
        authorize_task(
            self.stores.tasks.as_ref(),
            self.stores.projects.as_ref(),
            user_id,
            task_id,
        )
        .await?;

        if !self.stores.tasks.delete_task(task_id).await? {
            return Err(CoreError::not_found(TASK_NOT_FOUND));
        }
        info!(%task_id, %user_id, "Task deleted");

        Ok(Envelope::message_only("Task deleted successfully"))
    }

    pub async fn get_kanban_board(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<Envelope<KanbanBoard>> {
        self.accessible_project(user_id, project_id).await?;

        let project = self
            .stores
            .projects
            .project_details(project_id)
            .await?
            .ok_or_else(|| CoreError::not_found(PROJECT_NOT_ACCESSIBLE))?;
        let columns = load_columns(self.stores.tasks.as_ref(), project_id).await?;

        let board = KanbanBoard {
            project,
            columns: KanbanColumns {
                todo: KanbanColumn::new(TaskStatus::Todo, columns.todo),
                in_progress: KanbanColumn::new(TaskStatus::InProgress, columns.in_progress),
                done: KanbanColumn::new(TaskStatus::Done, columns.done),
            },
        };
        Ok(Envelope::ok(board, "Kanban board data retrieved successfully"))
    }

    pub async fn get_task_stats(&self, user_id: Uuid) -> CoreResult<Envelope<TaskStatsSummary>> {
        let now = Utc::now();
        let (stats, overdue_tasks) = tokio::try_join!(
            self.stores.tasks.task_stats(user_id, now),
            self.stores
                .tasks
                .overdue_tasks(user_id, now, OVERDUE_TASKS_LIMIT),
        )?;

        Ok(Envelope::ok(
            TaskStatsSummary {
                stats,
                overdue_tasks,
            },
            "Task statistics retrieved successfully",
        ))
    }

    /// Tasks the user is assigned to or created, earliest deadline first by default
    pub async fn get_my_tasks(
        &self,
        user_id: Uuid,
        query: TaskQuery,
    ) -> CoreResult<Envelope<Vec<TaskDetails>>> {
        let (filter, page) = query.resolve(MY_TASKS_LIMIT, (TaskSortField::Deadline, SortOrder::Asc));
        let (tasks, total) = self
            .stores
            .tasks
            .list_tasks(TaskScope::Member(user_id), &filter, page)
            .await?;

        Ok(Envelope::paginated(
            tasks,
            "My tasks retrieved successfully",
            Pagination::new(page, total),
        ))
    }

    /// Unfinished tasks due within the next `days` days (default 7, at most 365)
    pub async fn get_upcoming_tasks(
        &self,
        user_id: Uuid,
        days: Option<i64>,
    ) -> CoreResult<Envelope<Vec<TaskDetails>>> {
        let days = days.unwrap_or(DEFAULT_UPCOMING_DAYS).clamp(0, MAX_UPCOMING_DAYS);
        let (from, to) = upcoming_window(Utc::now(), days);
        let tasks = self.stores.tasks.upcoming_tasks(user_id, from, to).await?;

        Ok(Envelope::ok(
            tasks,
            format!("Upcoming tasks for next {} days retrieved successfully", days),
        ))
    }
}
