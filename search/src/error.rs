//! Search error types

use std::time::Duration;
use thiserror::Error;
use trawl_client::ApiError;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The session's cancellation token fired.
    #[error("search canceled")]
    Canceled,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// The job made no progress for the configured stall timeout.
    #[error("query job made no progress for {0:?}")]
    Stalled(Duration),

    #[error("failed to write search output: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// True when the service rejected the query string itself.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_query_error())
    }
}

/// Errors in a user-supplied event format string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("empty field name in format reference {0:?}")]
    EmptyField(String),

    #[error("invalid width modifier {modifier:?} for field {field:?} (expected a signed integer)")]
    InvalidModifier { field: String, modifier: String },
}
