//! DHIS2 Integration
//!
//! Talks to the DHIS2 Web API on behalf of the dashboard.
//!
//! - **Client**: REST client, imports `dataValueSets` chunks
//! - **Token provider**: Earth Engine access tokens minted by DHIS2

mod client;
mod token;

pub use client::{
    DataElementInfo, Dhis2Client, Dhis2Config, Dhis2Error, SystemInfo, DATA_VALUE_SETS_RESOURCE,
};
pub use token::{EarthEngineToken, EarthEngineTokenProvider, TOKEN_FAILED_MESSAGE};
