use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawl_client::{ApiError, QueryJobs};
use trawl_search::{run_search, ProgressMode, SearchError, SearchOptions, SearchOutcome};
use trawl_shared::{Event, Query, QueryMetadata, QueryResult};

/// What the scripted service does once its snapshots run out
enum WhenExhausted {
    /// Cancel the session and never answer (simulates the user pressing Ctrl-C)
    Cancel(CancellationToken),
    /// Keep returning the last snapshot
    RepeatLast,
}

/// In-memory query job service answering polls from a script.
struct ScriptedJobs {
    create_error: Mutex<Option<ApiError>>,
    script: Mutex<VecDeque<Result<QueryResult, ApiError>>>,
    last: Mutex<Option<QueryResult>>,
    when_exhausted: WhenExhausted,
    delete_fails: bool,
    created: Mutex<Vec<Query>>,
    polls: Mutex<usize>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedJobs {
    fn new(script: Vec<Result<QueryResult, ApiError>>, when_exhausted: WhenExhausted) -> Self {
        Self {
            create_error: Mutex::new(None),
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            when_exhausted,
            delete_fails: false,
            created: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn count_poll(&self) {
        *self.polls.lock().unwrap() += 1;
    }

    fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }

    fn remember(&self, result: &QueryResult) {
        *self.last.lock().unwrap() = Some(result.clone());
    }

    fn last_snapshot(&self) -> QueryResult {
        self.last.lock().unwrap().clone().unwrap_or_default()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryJobs for ScriptedJobs {
    async fn create(&self, _repository: &str, query: &Query) -> Result<String, ApiError> {
        let create_error = self.create_error.lock().unwrap().take();
        if let Some(err) = create_error {
            return Err(err);
        }
        self.created.lock().unwrap().push(query.clone());
        Ok("job-1".to_string())
    }

    async fn poll(&self, _repository: &str, id: &str) -> Result<QueryResult, ApiError> {
        assert_eq!(id, "job-1");
        self.count_poll();

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(result)) => {
                self.remember(&result);
                Ok(result)
            }
            Some(Err(e)) => Err(e),
            None => match &self.when_exhausted {
                WhenExhausted::Cancel(token) => {
                    // The interrupt lands while this request is in flight.
                    token.cancel();
                    std::future::pending().await
                }
                WhenExhausted::RepeatLast => Ok(self.last_snapshot()),
            },
        }
    }

    async fn delete(&self, _repository: &str, id: &str) -> Result<(), ApiError> {
        self.deleted.lock().unwrap().push(id.to_string());
        if self.delete_fails {
            return Err(ApiError::Status {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(())
    }
}

fn events(value: serde_json::Value) -> Vec<Event> {
    serde_json::from_value(value).unwrap()
}

fn snapshot(done: bool, evs: serde_json::Value) -> QueryResult {
    QueryResult {
        done,
        events: events(evs),
        metadata: QueryMetadata {
            poll_after: 250,
            total_work: 2,
            work_done: if done { 2 } else { 1 },
            time_millis: 100,
            processed_events: 10,
            processed_bytes: 1000,
            ..Default::default()
        },
    }
}

fn aggregate(done: bool, evs: serde_json::Value, field_order: &[&str]) -> QueryResult {
    let mut result = snapshot(done, evs);
    result.metadata.is_aggregate = true;
    result.metadata.field_order = field_order.iter().map(|s| s.to_string()).collect();
    result
}

fn options() -> SearchOptions {
    SearchOptions {
        format: "{@rawstring}".to_string(),
        progress: ProgressMode::Off,
        ..Default::default()
    }
}

async fn search(
    jobs: &ScriptedJobs,
    options: SearchOptions,
    cancel: &CancellationToken,
) -> (Result<SearchOutcome, SearchError>, String) {
    let mut out = Vec::new();
    let outcome = run_search(jobs, "web", "error | tail(10)", options, &mut out, cancel).await;
    (outcome, String::from_utf8(out).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_event_search_prints_final_snapshot_in_time_order() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(snapshot(false, json!([{"@id": "x", "@timestamp": 5, "@rawstring": "partial"}]))),
            Ok(snapshot(
                true,
                json!([
                    {"@id": "c", "@timestamp": 30, "@rawstring": "thirty"},
                    {"@id": "a", "@timestamp": 10, "@rawstring": "ten"},
                    {"@id": "b", "@timestamp": 20, "@rawstring": "twenty"}
                ]),
            )),
        ],
        WhenExhausted::RepeatLast,
    );

    let (outcome, out) = search(&jobs, options(), &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Completed);
    assert_eq!(out, "ten\ntwenty\nthirty\n");
    assert_eq!(jobs.polls(), 2);
    assert_eq!(jobs.deleted(), vec!["job-1"]);

    let created = jobs.created.lock().unwrap();
    assert_eq!(created[0].query_string, "error | tail(10)");
    assert_eq!(created[0].start.as_deref(), Some("10m"));
    assert!(!created[0].live);
}

#[tokio::test(start_paused = true)]
async fn test_single_value_aggregate() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(aggregate(false, json!([{"_count": "3"}]), &["_count"])),
            Ok(aggregate(true, json!([{"_count": "1234"}]), &["_count"])),
        ],
        WhenExhausted::RepeatLast,
    );

    let (outcome, out) = search(&jobs, options(), &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Completed);
    assert_eq!(out, "1234\n");
}

#[tokio::test(start_paused = true)]
async fn test_json_progress_replaces_output() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(snapshot(false, json!([]))),
            Ok(snapshot(false, json!([]))),
            Ok(snapshot(true, json!([{"@rawstring": "hidden"}]))),
        ],
        WhenExhausted::RepeatLast,
    );
    let options = SearchOptions {
        progress: ProgressMode::Json,
        ..options()
    };

    let (outcome, out) = search(&jobs, options, &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Completed);
    assert!(!out.contains("hidden"));

    let records: Vec<serde_json::Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["repo"], "web");
    assert_eq!(records[0]["queryString"], "error | tail(10)");
    assert_eq!(records[0]["done"], false);
    assert_eq!(records[2]["done"], true);
    assert_eq!(records[2]["workDone"], 2);
    assert_eq!(records[2]["epsValue"], 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_live_search_dedups_until_canceled() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(snapshot(true, json!([{"@id": "e1", "@timestamp": 1, "@rawstring": "one"}]))),
            Ok(snapshot(
                true,
                json!([
                    {"@id": "e1", "@timestamp": 1, "@rawstring": "one"},
                    {"@id": "e2", "@timestamp": 2, "@rawstring": "two"},
                    {"@rawstring": "anon"}
                ]),
            )),
            Ok(snapshot(
                true,
                json!([
                    {"@id": "e2", "@timestamp": 2, "@rawstring": "two"},
                    {"@rawstring": "anon"}
                ]),
            )),
        ],
        WhenExhausted::Cancel(cancel.clone()),
    );
    let options = SearchOptions {
        live: true,
        ..options()
    };

    let (outcome, out) = search(&jobs, options, &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Canceled);
    assert_eq!(out, "one\ntwo\nanon\nanon\n");
    assert!(jobs.created.lock().unwrap()[0].live);
    assert_eq!(jobs.deleted(), vec!["job-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_live_aggregate_columns_are_sticky() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(aggregate(true, json!([{"a": "1", "b": "2"}, {"a": "3", "b": "4"}]), &[])),
            Ok(aggregate(true, json!([{"a": "5", "c": "6"}, {"b": "7"}]), &[])),
        ],
        WhenExhausted::Cancel(cancel.clone()),
    );
    let options = SearchOptions {
        live: true,
        wrap: false,
        ..options()
    };

    let (outcome, out) = search(&jobs, options, &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Canceled);
    let headers: Vec<Vec<&str>> = out
        .split("\n\n")
        .filter(|table| !table.trim().is_empty())
        .map(|table| table.lines().next().unwrap().split_whitespace().collect())
        .collect();
    assert_eq!(headers, vec![vec!["a", "b"], vec!["a", "b", "c"]]);
}

#[tokio::test]
async fn test_query_error_on_create() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(vec![], WhenExhausted::RepeatLast);
    *jobs.create_error.lock().unwrap() = Some(ApiError::Query("Unknown function: tial".into()));

    let (outcome, out) = search(&jobs, options(), &cancel).await;

    let err = outcome.unwrap_err();
    assert!(err.is_query_error());
    assert_eq!(err.to_string(), "Unknown function: tial");
    assert!(out.is_empty());
    assert_eq!(jobs.polls(), 0);
    assert!(jobs.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_error_aborts_and_still_deletes() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![
            Ok(snapshot(false, json!([]))),
            Err(ApiError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
            Ok(snapshot(true, json!([]))),
        ],
        WhenExhausted::RepeatLast,
    );

    let (outcome, _) = search(&jobs, options(), &cancel).await;

    let err = outcome.unwrap_err();
    assert!(!err.is_query_error());
    assert!(matches!(err, SearchError::Api(ApiError::Status { status: 503, .. })));
    assert_eq!(jobs.polls(), 2);
    assert_eq!(jobs.deleted(), vec!["job-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_delete_failure_does_not_change_outcome() {
    let cancel = CancellationToken::new();
    let mut jobs = ScriptedJobs::new(
        vec![Ok(snapshot(true, json!([{"@rawstring": "only"}])))],
        WhenExhausted::RepeatLast,
    );
    jobs.delete_fails = true;

    let (outcome, out) = search(&jobs, options(), &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Completed);
    assert_eq!(out, "only\n");
    assert_eq!(jobs.deleted(), vec!["job-1"]);
}

#[tokio::test]
async fn test_canceled_before_start_creates_no_job() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let jobs = ScriptedJobs::new(vec![], WhenExhausted::RepeatLast);

    let (outcome, out) = search(&jobs, options(), &cancel).await;

    assert_eq!(outcome.unwrap(), SearchOutcome::Canceled);
    assert!(out.is_empty());
    assert!(jobs.created.lock().unwrap().is_empty());
    assert!(jobs.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_job_is_abandoned() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(
        vec![Ok(snapshot(false, json!([])))],
        WhenExhausted::RepeatLast,
    );
    let options = SearchOptions {
        stall_timeout: Some(Duration::from_secs(2)),
        ..options()
    };

    let (outcome, _) = search(&jobs, options, &cancel).await;

    assert!(matches!(outcome, Err(SearchError::Stalled(_))));
    // 250ms between polls: the watch trips on the first observation at or past 2s
    assert_eq!(jobs.polls(), 9);
    assert_eq!(jobs.deleted(), vec!["job-1"]);
}

#[tokio::test]
async fn test_invalid_format_fails_before_creating_a_job() {
    let cancel = CancellationToken::new();
    let jobs = ScriptedJobs::new(vec![], WhenExhausted::RepeatLast);
    let options = SearchOptions {
        format: "{@rawstring:wide}".to_string(),
        ..options()
    };

    let (outcome, _) = search(&jobs, options, &cancel).await;

    assert!(matches!(outcome, Err(SearchError::Format(_))));
    assert!(jobs.created.lock().unwrap().is_empty());
}
