//! Alert Routes
//!
//! - GET /api/v1/alerts - Alerts still visible

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::alerts::Alert;
use crate::api::state::AppState;

/// GET /api/v1/alerts
pub async fn active_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.alerts.active())
}
