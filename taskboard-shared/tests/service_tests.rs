/// Service-level tests against the in-memory store
///
/// These exercise the same use cases the HTTP layer calls, without a database.
/// Run with: cargo test --test service_tests

use chrono::{Duration, Utc};
use taskboard_shared::auth::jwt::TokenIssuer;
use taskboard_shared::error::CoreError;
use taskboard_shared::models::{
    CreateProject, CreateTask, NewUser, Priority, ProjectQuery, TaskQuery, TaskStatus,
    UpdateProject, UpdateTask,
};
use taskboard_shared::services::account::{Credentials, PasswordChange, Registration};
use taskboard_shared::services::Services;
use taskboard_shared::store::Stores;
use uuid::Uuid;

const SECRET: &str = "service-test-secret-at-least-32-bytes";

struct Harness {
    stores: Stores,
    services: Services,
}

impl Harness {
    fn new() -> Self {
        let stores = Stores::in_memory();
        let services = Services::new(
            stores.clone(),
            TokenIssuer::new(SECRET, Duration::hours(1)),
        );
        Self { stores, services }
    }

    /// Inserts a user directly, skipping password hashing
    async fn user(&self, email: &str) -> Uuid {
        self.stores
            .users
            .insert_user(NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("insert user")
            .id
    }

    async fn project(&self, owner_id: Uuid, name: &str) -> Uuid {
        self.services
            .projects
            .create_project(owner_id, project_input(name))
            .await
            .expect("create project")
            .data
            .expect("project data")
            .project
            .id
    }

    async fn task(&self, user_id: Uuid, project_id: Uuid, title: &str) -> Uuid {
        self.services
            .tasks
            .create_task(user_id, task_input(project_id, title))
            .await
            .expect("create task")
            .data
            .expect("task data")
            .task
            .id
    }
}

fn project_input(name: &str) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        description: "desc".to_string(),
        priority: Some(Priority::High),
        ..Default::default()
    }
}

fn task_input(project_id: Uuid, title: &str) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        deadline: Utc::now() + Duration::days(2),
        project_id,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_duplicate_project_name_conflicts() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;

    let first = h
        .services
        .projects
        .create_project(owner, project_input("Launch"))
        .await
        .unwrap();
    assert!(first.success);
    let created = first.data.unwrap();
    assert_eq!(created.project.priority, Priority::High);
    assert_eq!(created.project.color, "#3B82F6");
    assert_eq!(created.task_count, 0);

    let err = h
        .services
        .projects
        .create_project(owner, project_input("Launch"))
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::Conflict(m) if m.contains("already exists")));
}

#[tokio::test]
async fn test_past_deadline_rejected_unless_done() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let yesterday = Utc::now() - Duration::days(1);

    let err = h
        .services
        .tasks
        .create_task(
            owner,
            CreateTask {
                deadline: yesterday,
                ..task_input(project, "Outline")
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, CoreError::InvalidState(m) if m.to_lowercase().contains("deadline cannot be in the past"))
    );

    let created = h
        .services
        .tasks
        .create_task(
            owner,
            CreateTask {
                deadline: yesterday,
                status: Some(TaskStatus::Done),
                ..task_input(project, "Outline")
            },
        )
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(created.task.status, TaskStatus::Done);
    assert!(created.task.completed_at.is_some());
    assert!(!created.is_overdue);
}

#[tokio::test]
async fn test_create_task_defaults() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;

    let task = h
        .services
        .tasks
        .create_task(owner, task_input(project, "  Outline  "))
        .await
        .unwrap()
        .data
        .unwrap();

    assert_eq!(task.task.title, "Outline");
    assert_eq!(task.task.status, TaskStatus::Todo);
    assert_eq!(task.task.priority, Priority::Medium);
    assert_eq!(task.task.assigned_to, owner);
    assert_eq!(task.task.created_by, owner);
    assert_eq!(task.task.estimated_hours, 0.0);
    assert_eq!(task.task.position, 0);
    assert!(task.task.completed_at.is_none());
    assert_eq!(task.project.id, project);
    assert_eq!(task.assignee.id, owner);
}

#[tokio::test]
async fn test_create_task_in_foreign_project() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let other = h.user("b@example.com").await;
    let project = h.project(owner, "Launch").await;

    let err = h
        .services
        .tasks
        .create_task(other, task_input(project, "Sneaky"))
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::NotFound(m) if m == "Project not found or access denied"));
}

#[tokio::test]
async fn test_status_round_trip_maintains_completion() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let task = h.task(owner, project, "Outline").await;

    let done = h
        .services
        .tasks
        .update_task_status(task, owner, TaskStatus::Done)
        .await
        .unwrap();
    assert_eq!(done.message, "Task status updated successfully");
    let done = done.data.unwrap();
    assert_eq!(done.task.status, TaskStatus::Done);
    let completed_at = done.task.completed_at.expect("completed_at set");

    // done -> done keeps the original timestamp
    let again = h
        .services
        .tasks
        .update_task_status(task, owner, TaskStatus::Done)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(again.task.completed_at, Some(completed_at));

    let reopened = h
        .services
        .tasks
        .update_task_status(task, owner, TaskStatus::Todo)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(reopened.task.status, TaskStatus::Todo);
    assert!(reopened.task.completed_at.is_none());
}

#[tokio::test]
async fn test_update_task_status_field_maintains_completion() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let task = h.task(owner, project, "Outline").await;

    let updated = h
        .services
        .tasks
        .update_task(
            task,
            owner,
            UpdateTask {
                status: Some(TaskStatus::Done),
                actual_hours: Some(3.5),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .data
        .unwrap();
    assert!(updated.task.completed_at.is_some());
    assert_eq!(updated.task.actual_hours, 3.5);

    // a past deadline is fine once the task is done
    let updated = h
        .services
        .tasks
        .update_task(
            task,
            owner,
            UpdateTask {
                deadline: Some(Utc::now() - Duration::days(3)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(updated.task.status, TaskStatus::Done);

    // but not when reopening in the same update
    let err = h
        .services
        .tasks
        .update_task(
            task,
            owner,
            UpdateTask {
                status: Some(TaskStatus::InProgress),
                deadline: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::InvalidState(m) if m == "Deadline cannot be in the past for active tasks"));
}

#[tokio::test]
async fn test_project_delete_blocked_by_tasks() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let task = h.task(owner, project, "Outline").await;

    let err = h
        .services
        .projects
        .delete_project(project, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    // project and task untouched
    assert!(h.stores.projects.find_project(project).await.unwrap().is_some());
    assert!(h.stores.tasks.find_task(task).await.unwrap().is_some());

    h.services.tasks.delete_task(task, owner).await.unwrap();
    let deleted = h
        .services
        .projects
        .delete_project(project, owner)
        .await
        .unwrap();
    assert!(deleted.success);
    assert!(deleted.data.is_none());
    assert!(h.stores.projects.find_project(project).await.unwrap().is_none());
}

#[tokio::test]
async fn test_foreign_project_is_not_found() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let other = h.user("b@example.com").await;
    let project = h.project(owner, "Launch").await;

    let err = h
        .services
        .projects
        .get_project_by_id(project, other)
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::NotFound(m) if m == "Project not found"));

    let err = h
        .services
        .projects
        .update_project(project, other, UpdateProject::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = h
        .services
        .projects
        .delete_project(project, other)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_foreign_task_is_access_denied() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let other = h.user("b@example.com").await;
    let project = h.project(owner, "Launch").await;
    let task = h
        .services
        .tasks
        .create_task(
            owner,
            CreateTask {
                assigned_to: Some(other),
                ..task_input(project, "Delegated")
            },
        )
        .await
        .unwrap()
        .data
        .unwrap()
        .task
        .id;

    // being the assignee grants nothing
    let err = h.services.tasks.get_task_by_id(task, other).await.unwrap_err();
    assert!(matches!(&err, CoreError::AccessDenied(m) if m == "Access denied"));

    let err = h
        .services
        .tasks
        .move_task(task, other, TaskStatus::Done, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AccessDenied(_)));

    let err = h
        .services
        .tasks
        .get_task_by_id(Uuid::new_v4(), owner)
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::NotFound(m) if m == "Task not found"));
}

#[tokio::test]
async fn test_rename_onto_existing_project_conflicts() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    h.project(owner, "Alpha").await;
    let beta = h.project(owner, "Beta").await;

    let err = h
        .services
        .projects
        .update_project(
            beta,
            owner,
            UpdateProject {
                name: Some("Alpha".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let renamed = h
        .services
        .projects
        .update_project(
            beta,
            owner,
            UpdateProject {
                name: Some("Gamma".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(renamed.project.name, "Gamma");
}

#[tokio::test]
async fn test_kanban_and_move() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Board").await;
    let first = h.task(owner, project, "First").await;
    let second = h.task(owner, project, "Second").await;
    let third = h.task(owner, project, "Third").await;

    h.services
        .tasks
        .move_task(second, owner, TaskStatus::InProgress, Some(2))
        .await
        .unwrap();
    let moved = h
        .services
        .tasks
        .move_task(third, owner, TaskStatus::InProgress, None)
        .await
        .unwrap();
    assert_eq!(moved.message, "Task moved successfully");
    assert_eq!(moved.data.unwrap().task.position, 0);

    let board = h
        .services
        .tasks
        .get_kanban_board(project, owner)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(board.columns.todo.title, "To Do");
    assert_eq!(board.columns.in_progress.title, "In Progress");
    assert_eq!(board.columns.todo.tasks.len(), 1);
    assert_eq!(board.columns.todo.tasks[0].task.id, first);

    let column: Vec<Uuid> = board
        .columns
        .in_progress
        .tasks
        .iter()
        .map(|t| t.task.id)
        .collect();
    assert_eq!(column, vec![third, second]);
    assert!(board.columns.done.tasks.is_empty());

    let with_tasks = h
        .services
        .projects
        .get_project_with_tasks(project, owner)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(with_tasks.project.task_count, 3);
    assert_eq!(with_tasks.tasks.in_progress.len(), 2);
}

#[tokio::test]
async fn test_task_stats_count_each_task_once() {
    let h = Harness::new();
    let a = h.user("a@example.com").await;
    let b = h.user("b@example.com").await;
    let project = h.project(a, "Launch").await;

    // created by and assigned to `a`
    h.task(a, project, "One").await;
    // created by `a`, assigned to `b`: counted once for each
    h.services
        .tasks
        .create_task(
            a,
            CreateTask {
                assigned_to: Some(b),
                status: Some(TaskStatus::Done),
                ..task_input(project, "Two")
            },
        )
        .await
        .unwrap();

    let stats_a = h.services.tasks.get_task_stats(a).await.unwrap().data.unwrap();
    assert_eq!(stats_a.stats.total, 2);
    assert_eq!(stats_a.stats.by_status.todo, 1);
    assert_eq!(stats_a.stats.by_status.done, 1);
    assert_eq!(
        stats_a.stats.by_status.todo + stats_a.stats.by_status.in_progress + stats_a.stats.by_status.done,
        stats_a.stats.total
    );

    let stats_b = h.services.tasks.get_task_stats(b).await.unwrap().data.unwrap();
    assert_eq!(stats_b.stats.total, 1);
    assert_eq!(stats_b.stats.by_status.done, 1);
}

#[tokio::test]
async fn test_overdue_and_upcoming() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let soon = h.task(owner, project, "Soon").await;
    let later = h
        .services
        .tasks
        .create_task(
            owner,
            CreateTask {
                deadline: Utc::now() + Duration::days(30),
                ..task_input(project, "Later")
            },
        )
        .await
        .unwrap()
        .data
        .unwrap()
        .task
        .id;

    let upcoming = h
        .services
        .tasks
        .get_upcoming_tasks(owner, None)
        .await
        .unwrap();
    assert_eq!(upcoming.message, "Upcoming tasks for next 7 days retrieved successfully");
    let ids: Vec<Uuid> = upcoming.data.unwrap().iter().map(|t| t.task.id).collect();
    assert_eq!(ids, vec![soon]);

    let upcoming = h
        .services
        .tasks
        .get_upcoming_tasks(owner, Some(60))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[1].task.id, later);

    let stats = h.services.tasks.get_task_stats(owner).await.unwrap().data.unwrap();
    assert_eq!(stats.stats.overdue, 0);
    assert!(stats.overdue_tasks.is_empty());
}

#[tokio::test]
async fn test_upcoming_days_are_capped() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    h.task(owner, project, "Soon").await;

    for days in [100_000_000, i64::MAX] {
        let upcoming = h
            .services
            .tasks
            .get_upcoming_tasks(owner, Some(days))
            .await
            .unwrap();
        assert_eq!(upcoming.message, "Upcoming tasks for next 365 days retrieved successfully");
        assert_eq!(upcoming.data.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_quick_stats_reflect_existing_work() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;

    let empty = h.services.dashboard.get_quick_stats(owner).await.unwrap().data.unwrap();
    assert!(!empty.has_projects);
    assert!(!empty.has_tasks);

    let project = h.project(owner, "Launch").await;
    h.task(owner, project, "Soon").await;
    let quick = h.services.dashboard.get_quick_stats(owner).await.unwrap().data.unwrap();
    assert!(quick.has_projects);
    assert!(quick.has_tasks);
}

#[tokio::test]
async fn test_project_listing_and_pagination() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let other = h.user("b@example.com").await;
    for name in ["Alpha", "Beta", "Gamma"] {
        h.project(owner, name).await;
    }
    h.project(other, "Alpha").await;

    let page = h
        .services
        .projects
        .get_projects(
            owner,
            ProjectQuery {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let pagination = page.pagination.unwrap();
    assert_eq!(pagination.total, 3);
    assert_eq!(pagination.pages, 2);
    assert_eq!(pagination.limit, 2);
    assert_eq!(page.data.unwrap().len(), 2);

    let found = h
        .services
        .projects
        .get_projects(
            owner,
            ProjectQuery {
                search: Some("gam".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].project.name, "Gamma");
    assert_eq!(found[0].owner.id, owner);
}

#[tokio::test]
async fn test_my_tasks_scope() {
    let h = Harness::new();
    let a = h.user("a@example.com").await;
    let b = h.user("b@example.com").await;
    let project = h.project(a, "Launch").await;
    h.task(a, project, "Mine").await;

    let mine = h
        .services
        .tasks
        .get_my_tasks(a, TaskQuery::default())
        .await
        .unwrap();
    assert_eq!(mine.pagination.unwrap().limit, 10);
    assert_eq!(mine.data.unwrap().len(), 1);

    let theirs = h
        .services
        .tasks
        .get_my_tasks(b, TaskQuery::default())
        .await
        .unwrap();
    assert!(theirs.data.unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_for_new_user_is_all_zero() {
    let h = Harness::new();
    let user = h.user("a@example.com").await;

    let stats = h
        .services
        .dashboard
        .get_dashboard_stats(user)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(stats.total_projects, 0);
    assert_eq!(stats.total_tasks, 0);
    assert_eq!(stats.projects_by_priority.high, 0);
    assert!(stats.recent_activity.recent_projects.is_empty());

    let quick = h
        .services
        .dashboard
        .get_quick_stats(user)
        .await
        .unwrap()
        .data
        .unwrap();
    assert!(!quick.has_projects);
    assert!(!quick.has_tasks);
}

#[tokio::test]
async fn test_dashboard_combines_aggregations() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;
    let project = h.project(owner, "Launch").await;
    let task = h.task(owner, project, "Outline").await;
    h.task(owner, project, "Build").await;
    h.services
        .tasks
        .update_task_status(task, owner, TaskStatus::InProgress)
        .await
        .unwrap();

    let stats = h
        .services
        .dashboard
        .get_dashboard_stats(owner)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(stats.total_projects, 1);
    assert_eq!(stats.active_projects, 1);
    assert_eq!(stats.projects_by_priority.high, 1);
    assert_eq!(stats.total_tasks, 2);
    assert_eq!(stats.in_progress_tasks, 1);
    assert_eq!(stats.todo_tasks, 1);
    assert_eq!(stats.tasks_by_status.in_progress, 1);
    assert_eq!(stats.recent_activity.recent_projects.len(), 1);
    assert_eq!(stats.recent_activity.upcoming_tasks.len(), 2);

    let summary = h
        .services
        .projects
        .get_project_stats(owner)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(summary.projects.total, 1);
    assert_eq!(summary.tasks.total, 2);
}

#[tokio::test]
async fn test_account_lifecycle() {
    let h = Harness::new();
    let accounts = &h.services.accounts;

    let session = accounts
        .register(Registration {
            name: "Ada".to_string(),
            email: "  Ada@Example.com ".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(session.user.email, "ada@example.com");
    assert!(!session.token.is_empty());

    let err = accounts
        .register(Registration {
            name: "Ada Again".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::Conflict(m) if m == "User already exists with this email"));

    let err = accounts
        .login(Credentials {
            email: "ada@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::Unauthorized(m) if m == "Invalid email or password"));

    let err = accounts
        .change_password(
            session.user.id,
            PasswordChange {
                current_password: "nope".to_string(),
                new_password: "secret2".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));

    accounts
        .change_password(
            session.user.id,
            PasswordChange {
                current_password: "secret1".to_string(),
                new_password: "secret2".to_string(),
            },
        )
        .await
        .unwrap();

    let login = accounts
        .login(Credentials {
            email: "ADA@example.com".to_string(),
            password: "secret2".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(login.message, "Login successful");

    accounts.deactivate_account(session.user.id).await.unwrap();
    let err = accounts
        .login(Credentials {
            email: "ada@example.com".to_string(),
            password: "secret2".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(&err, CoreError::Unauthorized(m) if m == "Account has been deactivated"));
}

#[tokio::test]
async fn test_concurrent_duplicate_creates_yield_one_project() {
    let h = Harness::new();
    let owner = h.user("a@example.com").await;

    let (first, second) = tokio::join!(
        h.services.projects.create_project(owner, project_input("Race")),
        h.services.projects.create_project(owner, project_input("Race")),
    );
    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );

    let listed = h
        .services
        .projects
        .get_projects(owner, ProjectQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.pagination.unwrap().total, 1);
}
