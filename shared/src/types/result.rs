//! Query job snapshots
//!
//! A [`QueryResult`] is one polled view of a query job: its progress metadata
//! and the events (or aggregate rows) computed so far. Each poll supersedes the
//! previous snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Field holding the event time in epoch milliseconds
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Field holding the service-assigned event identifier
pub const ID_FIELD: &str = "@id";

/// A single event or aggregate row: field name to scalar value, in the order
/// the service sent them.
pub type Event = serde_json::Map<String, Value>;

/// Point-in-time view of a query job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Terminal flag. Live jobs report `true` once the historic part is complete.
    #[serde(default)]
    pub done: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<Event>,

    #[serde(rename = "metaData", default, deserialize_with = "null_as_default")]
    pub metadata: QueryMetadata,
}

/// Progress and shape information attached to every snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryMetadata {
    pub is_aggregate: bool,
    pub total_work: u64,
    pub work_done: u64,
    pub time_millis: u64,
    pub processed_events: u64,
    pub processed_bytes: u64,
    pub event_count: u64,

    /// Server-advised delay before the next poll, in milliseconds
    pub poll_after: u64,

    /// Column order for aggregate results. Empty when the service does not provide one.
    #[serde(deserialize_with = "null_as_default")]
    pub field_order: Vec<String>,

    pub query_start: u64,
    pub query_end: u64,
}

impl QueryMetadata {
    /// Events scanned per second, or `None` before any time has been spent.
    pub fn events_per_second(&self) -> Option<f64> {
        per_second(self.processed_events, self.time_millis)
    }

    /// Bytes scanned per second, or `None` before any time has been spent.
    pub fn bytes_per_second(&self) -> Option<f64> {
        per_second(self.processed_bytes, self.time_millis)
    }
}

/// Explicit JSON `null` decodes like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn per_second(quantity: u64, time_millis: u64) -> Option<f64> {
    if time_millis == 0 {
        return None;
    }
    Some(quantity as f64 / time_millis as f64 * 1000.0)
}

/// Numeric `@timestamp` of an event, if present
pub fn event_timestamp(event: &Event) -> Option<f64> {
    event.get(TIMESTAMP_FIELD).and_then(Value::as_f64)
}

/// String `@id` of an event, if present
pub fn event_id(event: &Event) -> Option<&str> {
    event.get(ID_FIELD).and_then(Value::as_str)
}
