//! Monthly precipitation against climate normals

use super::{ExploreContext, ExploreError, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Observed monthly total for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyObservation {
    /// `YYYYMM` or `YYYY-MM`
    pub period: String,
    pub value: f64,
}

/// Climate normal for a calendar month (1-12)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNormal {
    pub month: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub period: YearMonth,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<f64>,
}

/// Monthly series ready for charting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPrecipitation {
    pub title: String,
    pub reference_period: String,
    pub rows: Vec<MonthlyRow>,
}

/// Pair monthly observations with the normal of their calendar month
///
/// Observations outside the context's monthly period are skipped. Rows
/// are sorted by period; months without a normal have no anomaly.
pub fn monthly_precipitation(
    ctx: &ExploreContext,
    observations: &[MonthlyObservation],
    normals: &[MonthlyNormal],
) -> Result<MonthlyPrecipitation, ExploreError> {
    let normals: HashMap<u32, f64> = normals.iter().map(|n| (n.month, n.value)).collect();

    let mut rows = Vec::with_capacity(observations.len());
    for observation in observations {
        let period: YearMonth = observation.period.parse()?;
        if !ctx.monthly_period.contains(period) {
            continue;
        }

        let normal = normals.get(&period.month).copied();
        rows.push(MonthlyRow {
            period,
            value: observation.value,
            normal,
            anomaly: normal.map(|n| observation.value - n),
        });
    }
    rows.sort_by_key(|row| row.period);

    let title = format!(
        "Precipitation {} {} to {}",
        ctx.org_unit.name(),
        ctx.monthly_period.start_time,
        ctx.monthly_period.end_time
    );

    Ok(MonthlyPrecipitation {
        title,
        reference_period: ctx.reference_period.id.clone(),
        rows,
    })
}
