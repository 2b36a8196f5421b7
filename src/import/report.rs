//! Import Report
//!
//! Text shown to the user while and after importing.

use super::aggregate::AggregateResult;
use super::error::ImportFailure;
use super::record::Record;
use super::response::Conflict;
use crate::org_unit::OrgUnitFeature;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Label shown while an import is running
pub fn progress_label(percent: u8) -> String {
    format!("Importing data... {}%", percent)
}

/// One-line description of a conflict
pub fn describe_conflict(conflict: &Conflict) -> String {
    if let (None, Some(raw)) = (&conflict.object, conflict.extra.get("raw")) {
        return match raw.as_str() {
            Some(text) => text.to_string(),
            None => raw.to_string(),
        };
    }

    let object = conflict.object.as_deref().unwrap_or("unknown");
    match (&conflict.value, &conflict.error_code) {
        (Some(value), Some(code)) => format!("{}: {} ({})", object, value, code),
        (Some(value), None) => format!("{}: {}", object, value),
        (None, Some(code)) => format!("{}: {}", object, code),
        (None, None) => object.to_string(),
    }
}

/// Summary of a completed import
pub struct ImportSummary<'a>(pub &'a AggregateResult);

impl fmt::Display for ImportSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        writeln!(f, "Data is imported")?;
        writeln!(f, "Imported: {}", result.import_count.imported)?;
        writeln!(f, "Updated: {}", result.import_count.updated)?;
        write!(f, "Ignored: {}", result.import_count.ignored)?;

        if result.has_conflicts() {
            write!(f, "\nConflicts: {}", result.conflicts.len())?;
            for conflict in &result.conflicts {
                write!(f, "\n  {}", describe_conflict(conflict))?;
            }
        }

        if result.rejected_batches > 0 {
            write!(f, "\nRejected batches: {}", result.rejected_batches)?;
        }
        if result.unrecognized_batches > 0 {
            write!(f, "\nUnrecognized responses: {}", result.unrecognized_batches)?;
        }

        Ok(())
    }
}

/// Error display of a failed import
pub struct FailureReport<'a>(pub &'a ImportFailure);

impl fmt::Display for FailureReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.message)?;

        let Some(details) = &self.0.details else {
            return Ok(());
        };

        for key in ["httpStatus", "status", "message"] {
            if let Some(text) = details.get(key).and_then(Value::as_str) {
                write!(f, "\n{}: {}", key, text)?;
            }
        }

        // 2.38+ puts conflicts under `response`
        let conflicts = details
            .get("response")
            .unwrap_or(details)
            .get("conflicts")
            .cloned()
            .and_then(|c| serde_json::from_value::<Vec<Conflict>>(c).ok())
            .unwrap_or_default();

        for conflict in &conflicts {
            write!(f, "\n  {}", describe_conflict(conflict))?;
        }

        Ok(())
    }
}

/// Org units with no numeric record, in feature order
pub fn org_units_without_data<'a>(
    records: &[Record],
    features: &'a [OrgUnitFeature],
) -> Vec<&'a OrgUnitFeature> {
    let covered: HashSet<&str> = records
        .iter()
        .filter(|r| r.value.is_numeric())
        .map(|r| r.ou.as_str())
        .collect();

    features
        .iter()
        .filter(|f| !covered.contains(f.id.as_str()))
        .collect()
}
