//! Continent lock report handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ReportParams;
use crate::app_state::AppState;
use crate::service::LockReport;

/// `GET /continents/oldest`: Oldest continent lock.
#[utoipa::path(
    get,
    path = "/api/v1/continents/oldest",
    tag = "Continents",
    summary = "Oldest continent lock",
    description = "Reports the continent locked longest ago. With `broadcast=true` the report is also posted to the configured channel.",
    params(ReportParams),
    responses(
        (status = 200, description = "Lock report", body = LockReport),
    )
)]
pub async fn oldest_lock(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> impl IntoResponse {
    Json(state.continents.report_oldest(params.delivery()).await)
}

/// `GET /continents/locks`: All continent locks, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/continents/locks",
    tag = "Continents",
    summary = "Sorted continent locks",
    params(ReportParams),
    responses(
        (status = 200, description = "Lock report", body = LockReport),
    )
)]
pub async fn sorted_locks(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> impl IntoResponse {
    Json(state.continents.report_sorted(params.delivery()).await)
}

/// Continent routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/continents/oldest", get(oldest_lock))
        .route("/continents/locks", get(sorted_locks))
}
