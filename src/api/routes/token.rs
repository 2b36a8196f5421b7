//! Token Routes
//!
//! - GET /api/v1/token - Earth Engine access token

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dhis2::{EarthEngineToken, TOKEN_FAILED_MESSAGE};

/// GET /api/v1/token
///
/// Fresh token minted by DHIS2, 503 when none could be fetched.
pub async fn get_token(State(state): State<Arc<AppState>>) -> ApiResult<Json<EarthEngineToken>> {
    state
        .tokens
        .fetch_token()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::ServiceUnavailable(TOKEN_FAILED_MESSAGE.to_string()))
}
