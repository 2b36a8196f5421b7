//! Explore Routes
//!
//! - POST /api/v1/explore/precipitation/monthly - Monthly precipitation chart data

use axum::Json;

use crate::api::dto::MonthlyPrecipitationRequest;
use crate::api::error::ApiResult;
use crate::explore::{monthly_precipitation, MonthlyPrecipitation};

/// POST /api/v1/explore/precipitation/monthly
pub async fn precipitation_monthly(
    Json(request): Json<MonthlyPrecipitationRequest>,
) -> ApiResult<Json<MonthlyPrecipitation>> {
    let chart = monthly_precipitation(&request.context, &request.observations, &request.normals)?;

    tracing::debug!(
        org_unit = %request.context.org_unit.id,
        rows = chart.rows.len(),
        "Built monthly precipitation"
    );

    Ok(Json(chart))
}
