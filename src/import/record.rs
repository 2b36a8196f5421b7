//! Import Record Types
//!
//! Input records as they come out of the climate datasets, and the
//! data values they become when submitted to DHIS2.

use serde::{Deserialize, Serialize};

/// Raw value of a record
///
/// Dataset exports carry numbers, numeric strings, or markers such as
/// `"NaN"` and `null` for cells without data. Any other JSON value lands in
/// `Other` and is dropped like the rest of the non-numeric values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl RecordValue {
    /// Numeric reading of this value, `None` if it is not a finite number
    ///
    /// Stricter than a plain not-NaN check: `null`, `""` and `"Infinity"`
    /// are rejected too, so they never reach DHIS2 as `0` or `inf`.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RecordValue::Number(n) => *n,
            RecordValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RecordValue::Missing | RecordValue::Other(_) => return None,
        };

        value.is_finite().then_some(value)
    }

    /// Whether this value survives the numeric filter
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Number(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Text(value.to_string())
    }
}

/// One input data point for an org unit and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub value: RecordValue,
    /// Org unit identifier
    pub ou: String,
    /// DHIS2 period identifier (e.g. "202401", "2024Q1")
    pub period: String,
}

impl Record {
    pub fn new(value: impl Into<RecordValue>, ou: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ou: ou.into(),
            period: period.into(),
        }
    }

    /// Convert into a data value for the given data element
    ///
    /// Returns `None` when the record has no numeric value.
    pub fn to_data_value(&self, data_element: &str) -> Option<DataValue> {
        let value = self.value.as_number()?;

        Some(DataValue {
            value,
            org_unit: self.ou.clone(),
            data_element: data_element.to_string(),
            period: self.period.clone(),
        })
    }
}

/// Target data element of an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DataElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name if known, otherwise the id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A record in DHIS2 data value form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub value: f64,
    pub org_unit: String,
    pub data_element: String,
    pub period: String,
}

/// One chunk of data values, submitted as a single `dataValueSets` request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueSet {
    pub data_values: Vec<DataValue>,
}

impl DataValueSet {
    pub fn len(&self) -> usize {
        self.data_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_values.is_empty()
    }
}
