/// Dashboard aggregation
///
/// The four reads behind the dashboard are independent and read-only, so
/// they are issued concurrently and need no joint snapshot.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::project::RECENT_PROJECTS_LIMIT;
use crate::envelope::Envelope;
use crate::error::CoreResult;
use crate::models::{PageRequest, ProjectDetails, ProjectFilter, TaskDetails, TaskFilter, TaskScope};
use crate::stats::{upcoming_window, PriorityCounts, TaskStatusCounts, DEFAULT_UPCOMING_DAYS};
use crate::store::Stores;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub recent_projects: Vec<ProjectDetails>,
    pub upcoming_tasks: Vec<TaskDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub in_progress_tasks: i64,
    pub todo_tasks: i64,
    pub tasks_by_status: TaskStatusCounts,
    pub projects_by_priority: PriorityCounts,
    pub recent_activity: RecentActivity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub has_projects: bool,
    pub has_tasks: bool,
}

#[derive(Clone)]
pub struct DashboardService {
    stores: Stores,
}

impl DashboardService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn get_dashboard_stats(&self, user_id: Uuid) -> CoreResult<Envelope<DashboardStats>> {
        let now = Utc::now();
        let (from, to) = upcoming_window(now, DEFAULT_UPCOMING_DAYS);

        let (projects, tasks, recent_projects, upcoming_tasks) = tokio::try_join!(
            self.stores.projects.project_stats(user_id),
            self.stores.tasks.task_stats(user_id, now),
            self.stores
                .projects
                .recent_projects(user_id, RECENT_PROJECTS_LIMIT),
            self.stores.tasks.upcoming_tasks(user_id, from, to),
        )?;
        debug!(%user_id, projects = projects.total, tasks = tasks.total, "Dashboard aggregated");

        let stats = DashboardStats {
            total_projects: projects.total,
            active_projects: projects.by_status.active,
            total_tasks: tasks.total,
            completed_tasks: tasks.by_status.done,
            overdue_tasks: tasks.overdue,
            in_progress_tasks: tasks.by_status.in_progress,
            todo_tasks: tasks.by_status.todo,
            tasks_by_status: tasks.by_status,
            projects_by_priority: projects.by_priority,
            recent_activity: RecentActivity {
                recent_projects,
                upcoming_tasks,
            },
        };
        Ok(Envelope::ok(stats, "Dashboard statistics retrieved successfully"))
    }

    /// Whether the user has any project or task at all
    pub async fn get_quick_stats(&self, user_id: Uuid) -> CoreResult<Envelope<QuickStats>> {
        let first = PageRequest::new(Some(1), Some(1), 1);
        let project_filter = ProjectFilter::default();
        let task_filter = TaskFilter::default();
        let ((_, project_total), (_, task_total)) = tokio::try_join!(
            self.stores
                .projects
                .list_projects(user_id, &project_filter, first),
            self.stores
                .tasks
                .list_tasks(TaskScope::Member(user_id), &task_filter, first),
        )?;

        Ok(Envelope::ok(
            QuickStats {
                has_projects: project_total > 0,
                has_tasks: task_total > 0,
            },
            "Quick stats retrieved successfully",
        ))
    }
}
