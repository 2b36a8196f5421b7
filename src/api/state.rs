//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::alerts::MemoryAlertSink;
use crate::config::ApiConfig;
use crate::dhis2::{Dhis2Client, EarthEngineTokenProvider};
use crate::import::{BatchSubmitter, ImportController, ImportOptions, ImportPipeline};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// DHIS2 client for readiness and metadata
    pub dhis2: Arc<Dhis2Client>,
    /// Import controller driving runs started over HTTP
    pub controller: Arc<ImportController>,
    /// Earth Engine token provider
    pub tokens: Arc<EarthEngineTokenProvider>,
    /// Alerts shown to the user
    pub alerts: Arc<MemoryAlertSink>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state importing through the DHIS2 client itself
    pub fn new(dhis2: Arc<Dhis2Client>, options: ImportOptions, config: ApiConfig) -> Self {
        let submitter: Arc<dyn BatchSubmitter> = dhis2.clone();
        Self::with_submitter(dhis2, submitter, options, config)
    }

    /// Create state with a custom chunk submitter
    pub fn with_submitter(
        dhis2: Arc<Dhis2Client>,
        submitter: Arc<dyn BatchSubmitter>,
        options: ImportOptions,
        config: ApiConfig,
    ) -> Self {
        let alerts = Arc::new(MemoryAlertSink::new());
        let pipeline = ImportPipeline::new(submitter, options);

        Self {
            controller: Arc::new(ImportController::new(pipeline, alerts.clone())),
            tokens: Arc::new(EarthEngineTokenProvider::new(dhis2.clone(), alerts.clone())),
            dhis2,
            alerts,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
