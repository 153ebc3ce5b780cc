//! Aggregation shapes for the dashboard and the stats endpoints.
//!
//! Both stores compute these in a single grouped pass. Every bucket is always
//! present; a user with no projects gets an all-zero structure.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Priority, ProjectStatus, TaskStatus};

/// Default look-ahead for upcoming tasks
pub const DEFAULT_UPCOMING_DAYS: i64 = 7;

/// Widest upcoming window a caller can ask for
pub const MAX_UPCOMING_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl PriorityCounts {
    fn record(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Medium => self.medium += 1,
            Priority::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatusCounts {
    pub active: i64,
    pub completed: i64,
    #[serde(rename = "on-hold")]
    pub on_hold: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusCounts {
    pub todo: i64,
    #[serde(rename = "in-progress")]
    pub in_progress: i64,
    pub done: i64,
}

/// Counts over the projects a user owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: i64,
    pub by_status: ProjectStatusCounts,
    pub by_priority: PriorityCounts,
}

impl ProjectStats {
    /// Adds one project to the tallies
    pub fn record(&mut self, status: ProjectStatus, priority: Priority) {
        self.total += 1;
        match status {
            ProjectStatus::Active => self.by_status.active += 1,
            ProjectStatus::Completed => self.by_status.completed += 1,
            ProjectStatus::OnHold => self.by_status.on_hold += 1,
            ProjectStatus::Cancelled => self.by_status.cancelled += 1,
        }
        self.by_priority.record(priority);
    }
}

/// Counts over the tasks a user is assigned to or created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub by_status: TaskStatusCounts,
    pub by_priority: PriorityCounts,
    /// Evaluated at query time, never stored
    pub overdue: i64,
}

impl TaskStats {
    /// Adds one task to the tallies, judging overdue at `at`
    pub fn record(
        &mut self,
        status: TaskStatus,
        priority: Priority,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    ) {
        self.total += 1;
        match status {
            TaskStatus::Todo => self.by_status.todo += 1,
            TaskStatus::InProgress => self.by_status.in_progress += 1,
            TaskStatus::Done => self.by_status.done += 1,
        }
        self.by_priority.record(priority);
        if is_overdue(status, deadline, at) {
            self.overdue += 1;
        }
    }
}

/// Flat row produced by the project aggregation query
#[derive(Debug, sqlx::FromRow)]
pub struct ProjectStatsRow {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub on_hold: i64,
    pub cancelled: i64,
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl From<ProjectStatsRow> for ProjectStats {
    fn from(row: ProjectStatsRow) -> Self {
        Self {
            total: row.total,
            by_status: ProjectStatusCounts {
                active: row.active,
                completed: row.completed,
                on_hold: row.on_hold,
                cancelled: row.cancelled,
            },
            by_priority: PriorityCounts {
                low: row.low,
                medium: row.medium,
                high: row.high,
            },
        }
    }
}

/// Flat row produced by the task aggregation query
#[derive(Debug, sqlx::FromRow)]
pub struct TaskStatsRow {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub done: i64,
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub overdue: i64,
}

impl From<TaskStatsRow> for TaskStats {
    fn from(row: TaskStatsRow) -> Self {
        Self {
            total: row.total,
            by_status: TaskStatusCounts {
                todo: row.todo,
                in_progress: row.in_progress,
                done: row.done,
            },
            by_priority: PriorityCounts {
                low: row.low,
                medium: row.medium,
                high: row.high,
            },
            overdue: row.overdue,
        }
    }
}

/// A task is overdue at `at` when it isn't done and its deadline has passed
pub fn is_overdue(status: TaskStatus, deadline: DateTime<Utc>, at: DateTime<Utc>) -> bool {
    !status.is_done() && deadline < at
}

/// Inclusive deadline window `[from, from + days]` for upcoming tasks
///
/// `days` is clamped to `0..=MAX_UPCOMING_DAYS`.
pub fn upcoming_window(from: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let days = days.clamp(0, MAX_UPCOMING_DAYS);
    (from, from + Duration::days(days))
}

/// Whether a task falls in an upcoming window
pub fn is_upcoming(
    status: TaskStatus,
    deadline: DateTime<Utc>,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    !status.is_done() && deadline >= window.0 && deadline <= window.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_stats_are_all_zero() {
        let value = serde_json::to_value(ProjectStats::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "total": 0,
                "byStatus": {"active": 0, "completed": 0, "on-hold": 0, "cancelled": 0},
                "byPriority": {"low": 0, "medium": 0, "high": 0}
            })
        );

        let value = serde_json::to_value(TaskStats::default()).unwrap();
        assert_eq!(value["byStatus"], json!({"todo": 0, "in-progress": 0, "done": 0}));
        assert_eq!(value["overdue"], 0);
    }

    #[test]
    fn test_overdue_is_monotonic_in_time() {
        let deadline = Utc::now();

        for status in [TaskStatus::Todo, TaskStatus::InProgress] {
            assert!(!is_overdue(status, deadline, deadline - Duration::seconds(1)));
            assert!(!is_overdue(status, deadline, deadline));
            assert!(is_overdue(status, deadline, deadline + Duration::seconds(1)));
            assert!(is_overdue(status, deadline, deadline + Duration::days(365)));
        }

        assert!(!is_overdue(TaskStatus::Done, deadline, deadline + Duration::days(1)));
    }

    #[test]
    fn test_task_record_counts_each_task_once() {
        let now = Utc::now();
        let mut stats = TaskStats::default();

        stats.record(TaskStatus::Todo, Priority::High, now - Duration::days(1), now);
        stats.record(TaskStatus::InProgress, Priority::Low, now + Duration::days(1), now);
        stats.record(TaskStatus::Done, Priority::High, now - Duration::days(3), now);

        assert_eq!(stats.total, 3);
        assert_eq!(
            stats.by_status.todo + stats.by_status.in_progress + stats.by_status.done,
            stats.total
        );
        assert_eq!(stats.by_priority.high, 2);
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn test_project_record() {
        let mut stats = ProjectStats::default();
        stats.record(ProjectStatus::OnHold, Priority::Medium);
        stats.record(ProjectStatus::Active, Priority::Medium);

        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.on_hold, 1);
        assert_eq!(stats.by_priority.medium, 2);
    }

    #[test]
    fn test_upcoming_window_is_inclusive() {
        let now = Utc::now();
        let window = upcoming_window(now, 7);

        assert!(is_upcoming(TaskStatus::Todo, now, window));
        assert!(is_upcoming(TaskStatus::Todo, now + Duration::days(7), window));
        assert!(!is_upcoming(TaskStatus::Todo, now + Duration::days(8), window));
        assert!(!is_upcoming(TaskStatus::Todo, now - Duration::seconds(1), window));
        assert!(!is_upcoming(TaskStatus::Done, now + Duration::days(1), window));
    }

    #[test]
    fn test_upcoming_window_clamps_days() {
        let now = Utc::now();

        let (_, to) = upcoming_window(now, i64::MAX);
        assert_eq!(to, now + Duration::days(MAX_UPCOMING_DAYS));

        let (from, to) = upcoming_window(now, -3);
        assert_eq!(from, to);
    }
}
