//! Event ordering and de-duplication across snapshots
//!
//! Successive polls of the same job can return overlapping windows of events.
//! Only events that carry an `@id` can be recognised as repeats; events without
//! one are always emitted.

use std::cmp::Ordering;
use std::collections::HashSet;
use trawl_shared::{event_id, event_timestamp, Event};

/// Remembers every event id printed during one search session.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort `events` by timestamp and drop the ones already seen.
    ///
    /// Every id in the returned events is recorded, so a repeat within the same
    /// batch is dropped as well.
    pub fn filter(&mut self, mut events: Vec<Event>) -> Vec<Event> {
        sort_by_timestamp(&mut events);
        events
            .into_iter()
            .filter(|event| match event_id(event) {
                Some(id) => self.seen.insert(id.to_string()),
                None => true,
            })
            .collect()
    }

    /// Number of distinct ids seen so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Stable sort by numeric `@timestamp`; events without one go last.
pub fn sort_by_timestamp(events: &mut [Event]) {
    events.sort_by(|a, b| match (event_timestamp(a), event_timestamp(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> Event {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn raw(events: &[Event]) -> Vec<&str> {
        events
            .iter()
            .map(|e| e["@rawstring"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_sorts_by_timestamp() {
        let mut events = vec![
            event(json!({"@timestamp": 30, "@rawstring": "c"})),
            event(json!({"@timestamp": 10, "@rawstring": "a"})),
            event(json!({"@timestamp": 20, "@rawstring": "b"})),
        ];
        sort_by_timestamp(&mut events);
        assert_eq!(raw(&events), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_untimestamped_events_sort_last_and_keep_order() {
        let mut events = vec![
            event(json!({"@rawstring": "x"})),
            event(json!({"@timestamp": 20, "@rawstring": "b"})),
            event(json!({"@timestamp": "not a number", "@rawstring": "y"})),
            event(json!({"@timestamp": 10, "@rawstring": "a"})),
            event(json!({"@rawstring": "z"})),
        ];
        sort_by_timestamp(&mut events);
        assert_eq!(raw(&events), vec!["a", "b", "x", "y", "z"]);
    }

    #[test]
    fn test_drops_repeated_ids_across_batches() {
        let mut dedup = Deduplicator::new();

        let first = dedup.filter(vec![event(json!({"@id": "e1", "@rawstring": "one"}))]);
        assert_eq!(raw(&first), vec!["one"]);

        let second = dedup.filter(vec![
            event(json!({"@id": "e1", "@rawstring": "one"})),
            event(json!({"@id": "e2", "@rawstring": "two"})),
        ]);
        assert_eq!(raw(&second), vec!["two"]);
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_events_without_id_are_always_emitted() {
        let mut dedup = Deduplicator::new();
        let batch = || vec![event(json!({"@rawstring": "same"}))];

        assert_eq!(dedup.filter(batch()).len(), 1);
        assert_eq!(dedup.filter(batch()).len(), 1);
        assert!(dedup.is_empty());
    }

    #[test]
    fn test_repeat_within_one_batch() {
        let mut dedup = Deduplicator::new();
        let out = dedup.filter(vec![
            event(json!({"@id": "e1", "@timestamp": 2, "@rawstring": "later"})),
            event(json!({"@id": "e1", "@timestamp": 1, "@rawstring": "earlier"})),
        ]);
        assert_eq!(raw(&out), vec!["earlier"]);
    }
}
