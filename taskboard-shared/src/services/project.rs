/// Project use cases
///
/// Every operation except creation and the owner-scoped listings goes
/// through [`authorize_project`], so a project owned by someone else reads as
/// "not found".
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::task::{load_columns, TasksByStatus};
use crate::auth::authorization::{authorize_project, ensure_deletable, PROJECT_NOT_FOUND};
use crate::envelope::{Envelope, Pagination};
use crate::error::{CoreError, CoreResult, FieldError};
use crate::models::{CreateProject, NewProject, ProjectDetails, ProjectQuery, UpdateProject};
use crate::stats::{ProjectStats, TaskStats};
use crate::store::Stores;

/// Number of projects in the recent list
pub const RECENT_PROJECTS_LIMIT: i64 = 5;

/// Owner statistics: projects owned and tasks the owner takes part in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatsSummary {
    pub projects: ProjectStats,
    pub tasks: TaskStats,
}

/// A project with its tasks grouped by status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithTasks {
    pub project: ProjectDetails,
    pub tasks: TasksByStatus,
}

#[derive(Clone)]
pub struct ProjectService {
    stores: Stores,
}

impl ProjectService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Creates a project owned by `owner_id`
    ///
    /// Duplicate names for the same owner are rejected by the store's unique
    /// constraint, so two concurrent creates can't both succeed.
    pub async fn create_project(
        &self,
        owner_id: Uuid,
        input: CreateProject,
    ) -> CoreResult<Envelope<ProjectDetails>> {
        let data = NewProject::from_input(owner_id, input, Utc::now());
        if data.name.is_empty() {
            return Err(CoreError::Validation(vec![FieldError::new(
                "name",
                "Project name is required",
            )]));
        }

        let project = self.stores.projects.insert_project(data).await?;
        info!(project_id = %project.id, %owner_id, "Project created");

        let details = self.details(project.id).await?;
        Ok(Envelope::ok(details, "Project created successfully"))
    }

    pub async fn get_projects(
        &self,
        owner_id: Uuid,
        query: ProjectQuery,
    ) -> CoreResult<Envelope<Vec<ProjectDetails>>> {
        let (filter, page) = query.resolve();
        let (projects, total) = self
            .stores
            .projects
            .list_projects(owner_id, &filter, page)
            .await?;
        debug!(%owner_id, total, page = page.page, "Listed projects");

        Ok(Envelope::paginated(
            projects,
            "Projects retrieved successfully",
            Pagination::new(page, total),
        ))
    }

    pub async fn get_project_by_id(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
    ) -> CoreResult<Envelope<ProjectDetails>> {
        authorize_project(self.stores.projects.as_ref(), owner_id, project_id).await?;
        let details = self.details(project_id).await?;
        Ok(Envelope::ok(details, "Project retrieved successfully"))
    }

    /// Applies changes; fields left `None` keep their value
    pub async fn update_project(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        mut changes: UpdateProject,
    ) -> CoreResult<Envelope<ProjectDetails>> {
        authorize_project(self.stores.projects.as_ref(), owner_id, project_id).await?;

        changes.name = changes.name.map(|n| n.trim().to_string());
        changes.description = changes.description.map(|d| d.trim().to_string());
        if matches!(changes.name.as_deref(), Some("")) {
            return Err(CoreError::Validation(vec![FieldError::new(
                "name",
                "Project name is required",
            )]));
        }

        self.stores
            .projects
            .update_project(project_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found(PROJECT_NOT_FOUND))?;
        info!(%project_id, %owner_id, "Project updated");

        let details = self.details(project_id).await?;
        Ok(Envelope::ok(details, "Project updated successfully"))
    }

    /// Deletes a project that no task references
    pub async fn delete_project(&self, project_id: Uuid, owner_id: Uuid) -> CoreResult<Envelope<()>> {
        authorize_project(self.stores.projects.as_ref(), owner_id, project_id).await?;
        ensure_deletable(self.stores.projects.as_ref(), project_id).await?;

        // The store re-checks the reference inside the delete
        if !self.stores.projects.delete_project(project_id).await? {
            return Err(CoreError::not_found(PROJECT_NOT_FOUND));
        }
        info!(%project_id, %owner_id, "Project deleted");

        Ok(Envelope::message_only("Project deleted successfully"))
    }

    pub async fn get_project_stats(&self, owner_id: Uuid) -> CoreResult<Envelope<ProjectStatsSummary>> {
        let now = Utc::now();
        let (projects, tasks) = tokio::try_join!(
            self.stores.projects.project_stats(owner_id),
            self.stores.tasks.task_stats(owner_id, now),
        )?;

        Ok(Envelope::ok(
            ProjectStatsSummary { projects, tasks },
            "Project statistics retrieved successfully",
        ))
    }

    pub async fn get_recent_projects(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> CoreResult<Envelope<Vec<ProjectDetails>>> {
        let projects = self.stores.projects.recent_projects(owner_id, limit).await?;
        Ok(Envelope::ok(projects, "Recent projects retrieved successfully"))
    }

    pub async fn get_project_with_tasks(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
    ) -> CoreResult<Envelope<ProjectWithTasks>> {
        authorize_project(self.stores.projects.as_ref(), owner_id, project_id).await?;

        let (project, tasks) = tokio::try_join!(
            self.details(project_id),
            load_columns(self.stores.tasks.as_ref(), project_id),
        )?;

        Ok(Envelope::ok(
            ProjectWithTasks { project, tasks },
            "Project with tasks retrieved successfully",
        ))
    }

    async fn details(&self, project_id: Uuid) -> CoreResult<ProjectDetails> {
        self.stores
            .projects
            .project_details(project_id)
            .await?
            .ok_or_else(|| CoreError::not_found(PROJECT_NOT_FOUND))
    }
}
