//! Client side of the log-management service's query job API
//!
//! The search pipeline only talks to the service through the [`QueryJobs`]
//! trait; [`HttpQueryJobs`] is the production implementation over HTTP.

pub mod api;
pub mod config;
pub mod error;

pub use api::{HttpQueryJobs, QueryJobs};
pub use config::{ClientConfig, Overrides, Settings};
pub use error::{ApiError, ConfigError};
