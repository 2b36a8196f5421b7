//! # Climate Import
//!
//! Imports climate data into DHIS2 and serves the climate dashboard's
//! backend needs.
//!
//! ## Features
//!
//! - **Chunked import**: numeric values only, 500 per request
//! - **Bounded concurrency**: at most 5 requests in flight
//! - **Version-tolerant responses**: current and legacy DHIS2 envelopes folded into one result
//! - **Observable runs**: progress and outcome through a watch channel
//! - **Earth Engine tokens**: minted by DHIS2 for dataset access
//!
//! ## Modules
//!
//! - [`import`]: Chunking, submission, aggregation and run control
//! - [`dhis2`]: DHIS2 Web API client and token provider
//! - [`explore`]: Climate series against normals
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use climate_import::dhis2::{Dhis2Client, Dhis2Config};
//! use climate_import::import::{DataElement, ImportOptions, ImportPipeline, Record};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(Dhis2Client::new(Dhis2Config::default())?);
//!     let pipeline = ImportPipeline::new(client, ImportOptions::default());
//!
//!     let records = vec![
//!         Record::new(12.5, "O6uvpzGd5pu", "202401"),
//!         Record::new("NaN", "fdc6uOvgoji", "202401"),
//!     ];
//!
//!     let result = pipeline
//!         .run(&records, &DataElement::new("fbfJHSPpUQD"), |p| {
//!             println!("{}%", p.percent())
//!         })
//!         .await?;
//!
//!     println!("Imported {}", result.import_count.imported);
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod dhis2;
pub mod explore;
pub mod import;
pub mod logging;
pub mod org_unit;

// Re-export top-level types for convenience
pub use import::{
    AggregateResult, BatchResponse, DataElement, DataValueSet, ImportController, ImportError,
    ImportOptions, ImportPipeline, ImportState, Record, IMPORT_LIMIT, IMPORT_REQUEST_LIMIT,
};

pub use dhis2::{Dhis2Client, Dhis2Config, Dhis2Error, EarthEngineToken, EarthEngineTokenProvider};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
