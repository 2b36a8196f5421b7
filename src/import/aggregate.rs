//! Aggregate Import Result
//!
//! Folds batch responses, in whatever order they complete, into one
//! result for the whole import run. Counters are summed and conflict
//! lists concatenated, so the fold is associative and commutative up to
//! the order of conflict entries.

use super::response::{BatchResponse, Conflict, ImportCount};
use serde::{Deserialize, Serialize};

/// Combined outcome of all batches of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    #[serde(rename = "conflict")]
    pub conflicts: Vec<Conflict>,
    pub import_count: ImportCount,
    /// Batches answered with the error envelope
    #[serde(default)]
    pub rejected_batches: usize,
    /// Batches whose envelope matched no known shape
    #[serde(default)]
    pub unrecognized_batches: usize,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single batch response into this result
    pub fn absorb(&mut self, response: &BatchResponse) {
        match response {
            BatchResponse::Success(summary) => {
                self.import_count += summary.import_count;
                self.conflicts.extend(summary.conflicts.iter().cloned());
            }
            BatchResponse::Error(summary) => {
                self.import_count += summary.import_count;
                self.conflicts.extend(summary.conflicts.iter().cloned());
                self.rejected_batches += 1;
            }
            BatchResponse::Unknown => {
                tracing::warn!("Unrecognized import response shape, counting it as empty");
                self.unrecognized_batches += 1;
            }
        }
    }

    /// Combine two partial results
    pub fn merge(mut self, other: AggregateResult) -> AggregateResult {
        self.conflicts.extend(other.conflicts);
        self.import_count += other.import_count;
        self.rejected_batches += other.rejected_batches;
        self.unrecognized_batches += other.unrecognized_batches;
        self
    }

    pub fn from_responses<'a>(responses: impl IntoIterator<Item = &'a BatchResponse>) -> Self {
        let mut result = Self::new();
        for response in responses {
            result.absorb(response);
        }
        result
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

impl<'a> FromIterator<&'a BatchResponse> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = &'a BatchResponse>>(iter: I) -> Self {
        Self::from_responses(iter)
    }
}
