/// Service layer
///
/// Each use case combines the ownership guard, the task status rules and the
/// aggregations, and answers with an [`Envelope`](crate::envelope::Envelope).
/// Services hold only store handles, so cloning them is cheap and they carry
/// no state between requests.
pub mod account;
pub mod dashboard;
pub mod project;
pub mod task;

pub use account::AccountService;
pub use dashboard::DashboardService;
pub use project::ProjectService;
pub use task::TaskService;

use crate::auth::jwt::TokenIssuer;
use crate::store::Stores;

/// All services over one set of stores
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub dashboard: DashboardService,
}

impl Services {
    pub fn new(stores: Stores, tokens: TokenIssuer) -> Self {
        Self {
            accounts: AccountService::new(stores.clone(), tokens),
            projects: ProjectService::new(stores.clone()),
            tasks: TaskService::new(stores.clone()),
            dashboard: DashboardService::new(stores),
        }
    }
}
