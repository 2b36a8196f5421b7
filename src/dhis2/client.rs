//! DHIS2 Web API Client
//!
//! HTTP client for the DHIS2 endpoints used by the import flow.

use crate::import::{BatchResponse, BatchSubmitter, DataValueSet};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Resource receiving data value imports
pub const DATA_VALUE_SETS_RESOURCE: &str = "dataValueSets";

/// DHIS2 Web API client
pub struct Dhis2Client {
    client: Client,
    config: Dhis2Config,
}

/// Configuration for the DHIS2 client
#[derive(Debug, Clone)]
pub struct Dhis2Config {
    /// Instance base URL (e.g., "https://play.dhis2.org/40")
    pub base_url: String,
    /// Username for basic auth
    pub username: Option<String>,
    /// Password for basic auth
    pub password: Option<String>,
    /// Personal access token, preferred over basic auth
    pub token: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for Dhis2Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: Some("admin".to_string()),
            password: Some("district".to_string()),
            token: None,
            request_timeout_ms: 60_000,
        }
    }
}

impl Dhis2Config {
    /// URL of an API resource
    pub fn api_url(&self, resource: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

impl Dhis2Client {
    /// Create a new DHIS2 client with the given configuration
    pub fn new(config: Dhis2Config) -> Result<Self, Dhis2Error> {
        if config.base_url.trim().is_empty() {
            return Err(Dhis2Error::Config("DHIS2 base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("climate-import/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &Dhis2Config {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.token, &self.config.username) {
            (Some(token), _) if !token.is_empty() => {
                request.header("Authorization", format!("ApiToken {}", token))
            }
            (_, Some(username)) => request.basic_auth(username, self.config.password.as_ref()),
            _ => request,
        }
    }

    /// Fetch instance information, doubles as a connectivity check
    pub async fn system_info(&self) -> Result<SystemInfo, Dhis2Error> {
        let url = self.config.api_url("system/info");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_transport_error)?;

        json_body(response).await
    }

    /// Look up a data element by id
    pub async fn data_element(&self, id: &str) -> Result<DataElementInfo, Dhis2Error> {
        let url = self.config.api_url(&format!("dataElements/{}", id));
        let response = self
            .authorize(self.client.get(&url))
            .query(&[("fields", "id,name,valueType")])
            .send()
            .await
            .map_err(map_transport_error)?;

        json_body(response).await
    }

    /// Fetch the Google Earth Engine token configured on the instance
    pub async fn google_token(&self) -> Result<Value, Dhis2Error> {
        let url = self.config.api_url("tokens/google");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_transport_error)?;

        json_body(response).await
    }

    /// Import one set of data values
    ///
    /// Single attempt, no retries. A 2xx body is decoded into a
    /// [`BatchResponse`]; any other status is an [`Dhis2Error::Api`]
    /// carrying the parsed body as details.
    pub async fn post_data_value_set(&self, set: &DataValueSet) -> Result<BatchResponse, Dhis2Error> {
        let url = self.config.api_url(DATA_VALUE_SETS_RESOURCE);
        let response = self
            .authorize(self.client.post(&url))
            .json(set)
            .send()
            .await
            .map_err(map_transport_error)?;

        let raw: Value = json_body(response).await?;
        Ok(BatchResponse::from_value(&raw))
    }
}

#[async_trait]
impl BatchSubmitter for Dhis2Client {
    async fn submit(&self, chunk: &DataValueSet) -> Result<BatchResponse, Dhis2Error> {
        self.post_data_value_set(chunk).await
    }
}

fn map_transport_error(e: reqwest::Error) -> Dhis2Error {
    if e.is_timeout() {
        Dhis2Error::Timeout
    } else if e.is_connect() {
        Dhis2Error::Unavailable
    } else {
        Dhis2Error::Request(e)
    }
}

/// Decode a successful JSON body or turn the response into an API error
async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, Dhis2Error> {
    let status = response.status();
    let text = response.text().await.map_err(map_transport_error)?;

    if !status.is_success() {
        let details = serde_json::from_str::<Value>(&text).ok();
        let message = details
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| text.clone());

        return Err(Dhis2Error::Api {
            status: status.as_u16(),
            message,
            details,
        });
    }

    serde_json::from_str(&text).map_err(|e| Dhis2Error::InvalidResponse(e.to_string()))
}

// ============================================
// Response DTOs
// ============================================

/// Subset of `/api/system/info`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub server_date: Option<String>,
    #[serde(default)]
    pub system_name: Option<String>,
}

/// Data element metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElementInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value_type: Option<String>,
}

impl DataElementInfo {
    /// Whether DHIS2 will accept decimal values for this element
    pub fn accepts_numbers(&self) -> bool {
        matches!(
            self.value_type.as_deref(),
            None | Some("NUMBER")
                | Some("INTEGER")
                | Some("INTEGER_POSITIVE")
                | Some("INTEGER_NEGATIVE")
                | Some("INTEGER_ZERO_OR_POSITIVE")
                | Some("PERCENTAGE")
                | Some("UNIT_INTERVAL")
        )
    }
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when communicating with DHIS2
#[derive(Error, Debug)]
pub enum Dhis2Error {
    #[error("DHIS2 unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Dhis2Error {
    /// Raw error body returned by DHIS2, if any
    pub fn details(&self) -> Option<&Value> {
        match self {
            Dhis2Error::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
