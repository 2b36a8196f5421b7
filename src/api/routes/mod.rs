//! API Routes
//!
//! Route handlers organized by functionality.

pub mod alerts;
pub mod explore;
pub mod health;
pub mod import;
pub mod token;
