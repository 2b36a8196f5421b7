//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::explore::{ExploreContext, MonthlyNormal, MonthlyObservation};
use crate::import::{DataElement, ImportState, Record};

// ============================================
// IMPORT DTOs
// ============================================

/// Start an import run
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub data_element: DataElement,
    pub data: Vec<Record>,
}

/// Import run accepted
#[derive(Debug, Serialize)]
pub struct ImportAccepted {
    /// Run id to match against the status endpoint
    pub run: u64,
    /// Chunks the run will submit
    pub chunks: usize,
}

/// Current import state with a display message
#[derive(Debug, Serialize)]
pub struct ImportStatusResponse {
    pub run: u64,
    #[serde(flatten)]
    pub state: ImportState,
    /// Progress label, summary or failure text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================
// EXPLORE DTOs
// ============================================

/// Monthly precipitation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPrecipitationRequest {
    pub context: ExploreContext,
    pub observations: Vec<MonthlyObservation>,
    #[serde(default)]
    pub normals: Vec<MonthlyNormal>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// DHIS2 connectivity: ok, error
    pub dhis2: String,
    /// DHIS2 version, when reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhis2_version: Option<String>,
    /// Whether an import is running
    pub importing: bool,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
