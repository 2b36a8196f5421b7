//! Batch Responses
//!
//! DHIS2 has answered `dataValueSets` imports with different envelopes
//! across versions. Each raw body is decoded once, at the client
//! boundary, into a [`BatchResponse`]:
//!
//! 1. `httpStatus == "OK"`: 2.38+ success, summary under `response`
//! 2. `status == "SUCCESS"`: 2.37 success, summary at the top level
//! 3. `status == "ERROR"`: error envelope, summary under `response`
//! 4. anything else: [`BatchResponse::Unknown`], contributes nothing

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::ops::{Add, AddAssign};

/// Imported / updated / ignored counters of an import summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCount {
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub ignored: u64,
}

impl ImportCount {
    pub fn new(imported: u64, updated: u64, ignored: u64) -> Self {
        Self {
            imported,
            updated,
            ignored,
        }
    }

    pub fn total(&self) -> u64 {
        self.imported + self.updated + self.ignored
    }
}

impl Add for ImportCount {
    type Output = ImportCount;

    fn add(self, rhs: ImportCount) -> ImportCount {
        ImportCount {
            imported: self.imported + rhs.imported,
            updated: self.updated + rhs.updated,
            ignored: self.ignored + rhs.ignored,
        }
    }
}

impl AddAssign for ImportCount {
    fn add_assign(&mut self, rhs: ImportCount) {
        *self = *self + rhs;
    }
}

/// A conflict reported by DHIS2 for a rejected data value
///
/// Descriptor fields are read leniently: numbers and booleans are kept in
/// their JSON text form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Remaining fields (`objects`, `property`, `indexes`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conflict {
    pub fn new(object: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// `null` reads as no conflicts; entries that are not objects keep their
/// raw JSON under `extra["raw"]`.
fn lenient_conflicts<'de, D>(deserializer: D) -> Result<Vec<Conflict>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        single => vec![single],
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            Conflict::deserialize(&entry).unwrap_or_else(|_| {
                let mut extra = Map::new();
                extra.insert("raw".to_string(), entry);
                Conflict {
                    extra,
                    ..Default::default()
                }
            })
        })
        .collect())
}

/// Counts and conflicts of one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    #[serde(default)]
    pub import_count: ImportCount,
    #[serde(default, deserialize_with = "lenient_conflicts")]
    pub conflicts: Vec<Conflict>,
}

/// Decoded result of one `dataValueSets` submission
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResponse {
    /// Accepted (current or legacy success envelope)
    Success(BatchSummary),
    /// Error envelope, may still carry partial counts and conflicts
    Error(BatchSummary),
    /// Envelope matching none of the known shapes
    Unknown,
}

impl BatchResponse {
    /// Decode a raw response body
    pub fn from_value(raw: &Value) -> Self {
        let field = |key: &str| raw.get(key).and_then(Value::as_str);

        if field("httpStatus") == Some("OK") {
            return Self::decode(raw.get("response"), BatchResponse::Success);
        }

        match field("status") {
            Some("SUCCESS") => Self::decode(Some(raw), BatchResponse::Success),
            Some("ERROR") => Self::decode(raw.get("response"), BatchResponse::Error),
            _ => BatchResponse::Unknown,
        }
    }

    fn decode(selected: Option<&Value>, wrap: fn(BatchSummary) -> BatchResponse) -> Self {
        match selected.filter(|v| v.is_object()).map(BatchSummary::deserialize) {
            Some(Ok(summary)) => wrap(summary),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Malformed import summary");
                BatchResponse::Unknown
            }
            None => BatchResponse::Unknown,
        }
    }

    /// Summary carried by this response, if any
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            BatchResponse::Success(s) | BatchResponse::Error(s) => Some(s),
            BatchResponse::Unknown => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BatchResponse::Success(_) => "success",
            BatchResponse::Error(_) => "error",
            BatchResponse::Unknown => "unknown",
        }
    }
}

impl<'de> Deserialize<'de> for BatchResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(BatchResponse::from_value(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_success_shape() {
        let raw = json!({
            "httpStatus": "OK",
            "httpStatusCode": 200,
            "status": "OK",
            "response": {
                "status": "SUCCESS",
                "importCount": {"imported": 2, "updated": 0, "ignored": 0, "deleted": 0},
                "conflicts": []
            }
        });

        match BatchResponse::from_value(&raw) {
            BatchResponse::Success(summary) => {
                assert_eq!(summary.import_count, ImportCount::new(2, 0, 0));
                assert!(summary.conflicts.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_legacy_success_shape() {
        let raw = json!({
            "status": "SUCCESS",
            "importCount": {"imported": 1, "updated": 1, "ignored": 0},
            "conflicts": [{"object": "X"}]
        });

        let response = BatchResponse::from_value(&raw);
        let summary = response.summary().unwrap();
        assert_eq!(response.kind(), "success");
        assert_eq!(summary.import_count, ImportCount::new(1, 1, 0));
        assert_eq!(summary.conflicts[0].object.as_deref(), Some("X"));
    }

    #[test]
    fn test_error_shape_keeps_partial_counts() {
        let raw = json!({
            "httpStatus": "Conflict",
            "httpStatusCode": 409,
            "status": "ERROR",
            "message": "One more conflicts encountered",
            "response": {
                "importCount": {"imported": 0, "updated": 0, "ignored": 3},
                "conflicts": [
                    {"object": "202413", "value": "Period is not valid", "errorCode": "E7600", "indexes": [0, 1, 2]}
                ]
            }
        });

        match BatchResponse::from_value(&raw) {
            BatchResponse::Error(summary) => {
                assert_eq!(summary.import_count.ignored, 3);
                let conflict = &summary.conflicts[0];
                assert_eq!(conflict.error_code.as_deref(), Some("E7600"));
                assert_eq!(conflict.extra.get("indexes"), Some(&json!([0, 1, 2])));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_http_status_takes_priority() {
        // httpStatus OK wins even though the top-level status says ERROR
        let raw = json!({
            "httpStatus": "OK",
            "status": "ERROR",
            "response": {"importCount": {"imported": 4}}
        });

        assert!(matches!(BatchResponse::from_value(&raw), BatchResponse::Success(_)));
    }

    #[test]
    fn test_unknown_shapes() {
        for raw in [
            json!({}),
            json!({"status": "WARNING", "importCount": {"imported": 1}}),
            json!({"httpStatus": "OK"}),
            json!({"status": "ERROR", "response": "boom"}),
            json!({"status": "SUCCESS", "importCount": {"imported": "many"}}),
            json!("OK"),
        ] {
            assert_eq!(BatchResponse::from_value(&raw), BatchResponse::Unknown, "{}", raw);
        }
    }

    #[test]
    fn test_null_conflicts_keep_counts() {
        let raw = json!({
            "httpStatus": "OK",
            "response": {
                "importCount": {"imported": 2, "updated": 0, "ignored": 0},
                "conflicts": null
            }
        });

        let response = BatchResponse::from_value(&raw);
        assert_eq!(response.kind(), "success");
        let summary = response.summary().unwrap();
        assert_eq!(summary.import_count.imported, 2);
        assert!(summary.conflicts.is_empty());
    }

    #[test]
    fn test_loosely_typed_conflicts_keep_counts() {
        let raw = json!({
            "status": "SUCCESS",
            "importCount": {"imported": 5, "updated": 0, "ignored": 1},
            "conflicts": [{"object": "X", "value": 42}, "Period out of range"]
        });

        let response = BatchResponse::from_value(&raw);
        let summary = response.summary().unwrap();
        assert_eq!(summary.import_count.imported, 5);
        assert_eq!(summary.conflicts.len(), 2);
        assert_eq!(summary.conflicts[0].object.as_deref(), Some("X"));
        assert_eq!(summary.conflicts[0].value.as_deref(), Some("42"));
        assert_eq!(
            summary.conflicts[1].extra.get("raw"),
            Some(&json!("Period out of range"))
        );
    }

    #[test]
    fn test_missing_import_count_defaults_to_zero() {
        let raw = json!({"httpStatus": "OK", "response": {"conflicts": []}});
        let response = BatchResponse::from_value(&raw);
        assert_eq!(response.summary().unwrap().import_count, ImportCount::default());
    }

    #[test]
    fn test_deserialize_impl() {
        let response: BatchResponse =
            serde_json::from_str(r#"{"status": "SUCCESS", "importCount": {"updated": 7}}"#).unwrap();
        assert_eq!(response.summary().unwrap().import_count.updated, 7);
    }

    #[test]
    fn test_import_count_add() {
        let mut count = ImportCount::new(1, 2, 3);
        count += ImportCount::new(10, 20, 30);
        assert_eq!(count, ImportCount::new(11, 22, 33));
        assert_eq!(count.total(), 66);
    }
}
