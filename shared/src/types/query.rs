//! Query job submission

use serde::{Deserialize, Serialize};

/// An immutable query job submission.
///
/// `start` and `end` are time expressions understood by the service, either
/// relative (`"10m"`, `"2d"`) or absolute (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub query_string: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Keep the job running and streaming new events until it is deleted
    #[serde(rename = "isLive", default)]
    pub live: bool,

    /// Ask the service to include event distribution metadata in snapshots
    #[serde(default)]
    pub show_query_event_distribution: bool,
}

impl Query {
    pub fn new(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            start: None,
            end: None,
            live: false,
            show_query_event_distribution: true,
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        let start = start.into();
        self.start = (!start.is_empty()).then_some(start);
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        let end = end.into();
        self.end = (!end.is_empty()).then_some(end);
        self
    }

    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }
}
