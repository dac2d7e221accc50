//! Shared types and utilities for trawl
//!
//! This crate contains the query-job data model spoken by the log-management
//! service, plus small helpers used by the client, the search pipeline and the CLI.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{query::*, result::*};
