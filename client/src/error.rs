//! Client error types.

use thiserror::Error;

/// Errors returned by the query job API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service rejected the query string (syntax or semantic error).
    #[error("{0}")]
    Query(String),

    /// Any other non-success response.
    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    /// Network failure, timeout or TLS error.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Service address cannot carry an API path.
    #[error("invalid service address: {0}")]
    InvalidAddress(String),
}

impl ApiError {
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Errors raised while resolving client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("profile not found: {0}")]
    UnknownProfile(String),

    #[error("no service address configured (use --address, TRAWL_ADDRESS or a profile)")]
    MissingAddress,

    #[error("invalid service address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}
