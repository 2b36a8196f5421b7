//! Data Value Import
//!
//! Imports per-org-unit, per-period climate values into DHIS2 as values of
//! one data element.
//!
//! - **Chunking**: numeric records only, at most [`IMPORT_LIMIT`] per request
//! - **Submission**: at most [`IMPORT_REQUEST_LIMIT`] requests in flight
//! - **Aggregation**: per-chunk responses folded into one result
//! - **Controller**: observable import state for a consuming view
//! - **Sources**: JSON and CSV record loaders
//! - **Report**: progress and summary rendering

mod aggregate;
mod chunk;
mod error;
mod pipeline;
mod record;
pub mod report;
mod response;
pub mod source;
mod submit;

pub use aggregate::AggregateResult;
pub use chunk::{chunk_records, count_numeric};
pub use error::{ImportError, ImportFailure, IMPORT_FAILED_MESSAGE};
pub use pipeline::{
    BatchSubmitter, ImportController, ImportOptions, ImportPipeline, ImportSnapshot, ImportState,
};
pub use record::{DataElement, DataValue, DataValueSet, Record, RecordValue};
pub use response::{BatchResponse, BatchSummary, Conflict, ImportCount};
pub use source::{CsvRecordReader, RecordSource, SourceError, SourceLoad};
pub use submit::{map_limit, Progress};

/// Maximum number of data values sent in one request
pub const IMPORT_LIMIT: usize = 500;

/// Maximum number of import requests in flight at once
pub const IMPORT_REQUEST_LIMIT: usize = 5;
