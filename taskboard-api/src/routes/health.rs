/// Health check endpoint
///
/// Reports whether the server is running and its store answers. With the
/// PostgreSQL store it also shows pool usage and whether the schema matches
/// this build.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "backend": "postgres",
///   "schemaUpToDate": true,
///   "pool": { "inUse": 1, "idle": 4, "size": 5 }
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::db::{
    migrations::get_migration_status,
    pool::{pool_stats, PoolStats},
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    /// Which store implementation is serving requests
    pub backend: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_up_to_date: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.stores.ping().await;

    let (schema_up_to_date, pool) = match state.stores.pool() {
        Some(pool) if connected => {
            let schema = match get_migration_status(pool).await {
                Ok(status) => Some(status.is_up_to_date()),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read migration status");
                    None
                }
            };
            (schema, Some(pool_stats(pool)))
        }
        _ => (None, None),
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        backend: state.stores.backend_name().to_string(),
        schema_up_to_date,
        pool,
    })
}
