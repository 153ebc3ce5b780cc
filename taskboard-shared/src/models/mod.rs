/// Domain models
///
/// Entity types with their inputs and the SQL that backs the PostgreSQL store.
/// All identifiers are UUID v4; all timestamps are UTC.
pub mod priority;
pub mod project;
pub mod query;
pub mod task;
pub mod user;

pub use priority::Priority;
pub use project::{CreateProject, NewProject, Project, ProjectDetails, ProjectRef, ProjectStatus, UpdateProject};
pub use query::{
    PageRequest, ProjectFilter, ProjectQuery, SortOrder, TaskFilter, TaskQuery, TaskScope,
    TaskSortField,
};
pub use task::{CreateTask, NewTask, Task, TaskDetails, TaskStatus, UpdateTask};
pub use user::{NewUser, UpdateUser, User, UserRef};
