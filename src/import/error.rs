//! Import error types

use crate::dhis2::Dhis2Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message shown to the user when an import run fails
pub const IMPORT_FAILED_MESSAGE: &str = "An error occurred while importing data. Please try again.";

/// Errors that abort an import run
#[derive(Error, Debug)]
pub enum ImportError {
    /// A chunk could not be submitted; the whole run is discarded
    #[error("Chunk {} of {} failed: {source}", .chunk + 1, .total)]
    Submission {
        chunk: usize,
        total: usize,
        source: Dhis2Error,
    },
}

impl ImportError {
    /// Raw error body from DHIS2, for display
    pub fn details(&self) -> Option<&Value> {
        match self {
            ImportError::Submission { source, .. } => source.details(),
        }
    }
}

/// Serializable record of a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&ImportError> for ImportFailure {
    fn from(err: &ImportError) -> Self {
        Self {
            message: err.to_string(),
            details: err.details().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display_is_one_based() {
        let err = ImportError::Submission {
            chunk: 1,
            total: 3,
            source: Dhis2Error::Timeout,
        };
        assert_eq!(err.to_string(), "Chunk 2 of 3 failed: Request timeout");
        assert!(err.details().is_none());
    }

    #[test]
    fn test_failure_keeps_details() {
        let err = ImportError::Submission {
            chunk: 0,
            total: 1,
            source: Dhis2Error::Api {
                status: 409,
                message: "Conflict".to_string(),
                details: Some(json!({"httpStatus": "Conflict", "status": "ERROR"})),
            },
        };

        let failure = ImportFailure::from(&err);
        assert_eq!(failure.details.unwrap()["status"], "ERROR");
        assert!(failure.message.contains("API error 409"));
    }
}
