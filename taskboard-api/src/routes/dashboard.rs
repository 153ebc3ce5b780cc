/// Dashboard endpoints
///
/// - `GET /api/dashboard/stats` - Project and task totals with recent activity
/// - `GET /api/dashboard/quick-stats` - Whether the caller has any projects or tasks

use crate::{app::AppState, error::ApiResult, routes::ok};
use axum::{extract::State, Extension, Json};
use taskboard_shared::{
    auth::middleware::AuthContext,
    envelope::Envelope,
    services::dashboard::{DashboardStats, QuickStats},
};

pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<DashboardStats>>> {
    Ok(ok(state.services.dashboard.get_dashboard_stats(auth.user_id).await?))
}

pub async fn quick_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<QuickStats>>> {
    Ok(ok(state.services.dashboard.get_quick_stats(auth.user_id).await?))
}
