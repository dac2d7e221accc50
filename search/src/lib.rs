//! Search pipeline for trawl
//!
//! Submits a query job, polls it to completion while reporting progress, and
//! renders the final (and, for live searches, every later) snapshot either as
//! a formatted event stream or as an aggregate table.

pub mod dedup;
pub mod error;
pub mod format;
pub mod poller;
pub mod printer;
pub mod progress;
pub mod session;

pub use error::{FormatError, SearchError};
pub use format::{FieldPrinters, FormatSpec};
pub use progress::ProgressMode;
pub use session::{run_search, SearchOptions, SearchOutcome};

/// Default event line format
pub const DEFAULT_FORMAT: &str = "{@timestamp} {@rawstring}";
