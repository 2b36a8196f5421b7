//! Earth Engine Token
//!
//! The dashboard reads climate datasets from Google Earth Engine with a
//! token that DHIS2 mints from its configured service account.

use super::client::{Dhis2Client, Dhis2Error};
use crate::alerts::{Alert, AlertSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const TOKEN_FAILED_MESSAGE: &str = "Failed to fetch Earth Engine token";

/// Access token for Earth Engine requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthEngineToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl EarthEngineToken {
    /// Value for an `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Fetches Earth Engine tokens through DHIS2
pub struct EarthEngineTokenProvider {
    client: Arc<Dhis2Client>,
    alerts: Arc<dyn AlertSink>,
}

impl EarthEngineTokenProvider {
    pub fn new(client: Arc<Dhis2Client>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { client, alerts }
    }

    /// Fetch a fresh token
    ///
    /// Never fails: on any error the failure is logged, an alert is
    /// shown and `None` is returned.
    pub async fn fetch_token(&self) -> Option<EarthEngineToken> {
        let result = self.client.google_token().await.and_then(|raw| {
            serde_json::from_value::<EarthEngineToken>(raw)
                .map_err(|e| Dhis2Error::InvalidResponse(e.to_string()))
        });

        match result {
            Ok(mut token) => {
                token.token_type = bearer();
                tracing::debug!(expires_in = ?token.expires_in, "Fetched Earth Engine token");
                Some(token)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch Earth Engine token");
                self.alerts.show(&Alert::critical(TOKEN_FAILED_MESSAGE));
                None
            }
        }
    }
}
