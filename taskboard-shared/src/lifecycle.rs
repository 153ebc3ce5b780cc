/// Task status rules
///
/// Any status may move to any other status; there are no forbidden edges. What
/// the machine governs is the side effects and checks around a move:
///
/// ```text
///          ┌──────────────────────────────┐
///          ▼                              │
///        todo ⇄ in-progress ⇄ done ───────┘
///
/// entering done   → completed_at = completed_at ?? now
/// leaving done    → completed_at = NULL
/// same status     → nothing changes
/// ```
///
/// The completion rule depends only on the target status and the stored
/// timestamp, so the PostgreSQL store can apply it inside the `UPDATE`
/// (`CASE WHEN status = 'done' THEN COALESCE(completed_at, $now) ELSE NULL END`)
/// and `completed_at IS NOT NULL ⇔ status = 'done'` holds per row without
/// read-modify-write races.
///
/// Positions order tasks inside one (project, status) column. Moving a task
/// sets its position without renumbering siblings; ties fall back to creation
/// time.
use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::models::task::{Task, TaskStatus};

pub const DEADLINE_IN_PAST: &str = "Deadline cannot be in the past";
pub const DEADLINE_IN_PAST_FOR_ACTIVE: &str = "Deadline cannot be in the past for active tasks";

/// Position used when a move doesn't name one
pub const DEFAULT_POSITION: i32 = 0;

/// Kind of status change, for logging and callers that care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same status; no side effects
    Unchanged,
    /// Entered `done`
    Completed,
    /// Left `done`
    Reopened,
    /// Moved between the two active statuses
    Moved,
}

impl Transition {
    pub fn between(from: TaskStatus, to: TaskStatus) -> Self {
        match (from == to, from.is_done(), to.is_done()) {
            (true, _, _) => Transition::Unchanged,
            (false, false, true) => Transition::Completed,
            (false, true, false) => Transition::Reopened,
            _ => Transition::Moved,
        }
    }
}

/// Completion timestamp a task has after being put in `target`
pub fn completion_after(
    target: TaskStatus,
    existing: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if target.is_done() {
        existing.or(Some(now))
    } else {
        None
    }
}

/// Creation check: a past deadline is only allowed for tasks created as done
pub fn check_new_deadline(
    deadline: DateTime<Utc>,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if deadline < now && !status.is_done() {
        return Err(CoreError::invalid_state(DEADLINE_IN_PAST));
    }
    Ok(())
}

/// Update check: a new past deadline is rejected unless the resulting status is done
///
/// Deadlines that aren't being changed are never re-validated, so an overdue
/// task can still be edited.
pub fn check_changed_deadline(
    new_deadline: Option<DateTime<Utc>>,
    resulting_status: TaskStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    match new_deadline {
        Some(deadline) if deadline < now && !resulting_status.is_done() => {
            Err(CoreError::invalid_state(DEADLINE_IN_PAST_FOR_ACTIVE))
        }
        _ => Ok(()),
    }
}

/// Column order: position ascending, then creation time ascending
pub fn column_order(a: &Task, b: &Task) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.created_at.cmp(&b.created_at))
}
