/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::store::Stores;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Stores::in_memory(), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Json, Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::{
        jwt::TokenIssuer,
        middleware::{require_auth, Authenticator},
    },
    envelope::Envelope,
    error::CoreError,
    services::Services,
    store::Stores,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every field
/// is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Entity stores backing the services
    pub stores: Stores,

    /// Use cases invoked by the handlers
    pub services: Services,

    /// Resolves bearer tokens for protected routes
    pub authenticator: Authenticator,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(stores: Stores, config: Config) -> Self {
        let tokens = TokenIssuer::new(config.jwt.secret.clone(), config.token_lifetime());
        let authenticator = Authenticator::new(tokens.clone(), stores.users.clone());
        let services = Services::new(stores.clone(), tokens);

        Self {
            stores,
            services,
            authenticator,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register         # public
///     │   ├── POST /login            # public
///     │   ├── GET  /me
///     │   ├── PUT  /profile
///     │   ├── PUT  /change-password
///     │   ├── POST /logout
///     │   └── PUT  /deactivate
///     ├── /projects/
///     │   ├── POST|GET /
///     │   ├── GET  /stats
///     │   ├── GET  /recent
///     │   ├── GET|PUT|DELETE /:id
///     │   └── GET  /:id/with-tasks
///     ├── /tasks/
///     │   ├── POST /
///     │   ├── GET  /stats
///     │   ├── GET  /my-tasks
///     │   ├── GET  /upcoming
///     │   ├── GET  /project/:project_id
///     │   ├── GET  /project/:project_id/kanban
///     │   ├── GET|PUT|DELETE /:id
///     │   ├── PATCH /:id/status
///     │   └── PATCH /:id/move
///     └── /dashboard/
///         ├── GET /stats
///         └── GET /quick-stats
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. Response compression
/// 3. CORS (tower-http CorsLayer)
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = from_fn_with_state(state.authenticator.clone(), require_auth);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // `route_layer` only guards the routes declared above it
    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/profile", put(routes::auth::update_profile))
        .route("/change-password", put(routes::auth::change_password))
        .route("/logout", post(routes::auth::logout))
        .route("/deactivate", put(routes::auth::deactivate))
        .route_layer(auth_layer.clone())
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route("/stats", get(routes::projects::project_stats))
        .route("/recent", get(routes::projects::recent_projects))
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/with-tasks", get(routes::projects::project_with_tasks))
        .route_layer(auth_layer.clone());

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/stats", get(routes::tasks::task_stats))
        .route("/my-tasks", get(routes::tasks::my_tasks))
        .route("/upcoming", get(routes::tasks::upcoming_tasks))
        .route("/project/:project_id", get(routes::tasks::project_tasks))
        .route("/project/:project_id/kanban", get(routes::tasks::kanban_board))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_status))
        .route("/:id/move", patch(routes::tasks::move_task))
        .route_layer(auth_layer.clone());

    let dashboard_routes = Router::new()
        .route("/stats", get(routes::dashboard::dashboard_stats))
        .route("/quick-stats", get(routes::dashboard::quick_stats))
        .route_layer(auth_layer);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/dashboard", dashboard_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Envelope<()>>) {
    let err = CoreError::not_found(format!("Route {} not found", uri.path()));
    (StatusCode::NOT_FOUND, Json(Envelope::failure(&err)))
}
