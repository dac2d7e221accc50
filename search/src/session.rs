//! Search session driver
//!
//! One call to [`run_search`] owns one query job from creation to deletion:
//! poll until `done` while reporting progress, print the final snapshot, then
//! keep polling and printing for live searches until canceled.

use crate::error::SearchError;
use crate::format::{FieldPrinters, FormatSpec};
use crate::poller::Poller;
use crate::printer::ResultPrinter;
use crate::progress::{ProgressMode, ProgressReporter, SearchContext};
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trawl_client::QueryJobs;
use trawl_shared::utils::time::system_time_millis;
use trawl_shared::{Query, QueryResult};

/// Upper bound on the best-effort job deletion at the end of a session
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for one search invocation
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Query start time expression (`"10m"`, epoch millis, ...)
    pub start: Option<String>,
    pub end: Option<String>,
    pub live: bool,

    /// Event line format, see [`crate::format`]
    pub format: String,
    pub field_printers: FieldPrinters,

    /// Word-wrap aggregate table cells
    pub wrap: bool,
    pub progress: ProgressMode,

    /// Abort when the job makes no progress for this long before reaching `done`
    pub stall_timeout: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            start: Some("10m".to_string()),
            end: None,
            live: false,
            format: crate::DEFAULT_FORMAT.to_string(),
            field_printers: FieldPrinters::default(),
            wrap: true,
            progress: ProgressMode::default(),
            stall_timeout: None,
        }
    }
}

/// How a session ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Completed,
    Canceled,
}

/// Run a search against `repository` and write its output to `out`.
///
/// Cancellation through `cancel` is a clean outcome, not an error. The query
/// job is deleted on every exit path once it has been created; deletion
/// failures are logged and never change the result.
pub async fn run_search<C, W>(
    jobs: &C,
    repository: &str,
    query_string: &str,
    options: SearchOptions,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<SearchOutcome, SearchError>
where
    C: QueryJobs + ?Sized,
    W: Write,
{
    let start_millis = system_time_millis();
    let format = FormatSpec::parse(&options.format)?;

    let mut query = Query::new(query_string).live(options.live);
    if let Some(start) = &options.start {
        query = query.with_start(start.as_str());
    }
    if let Some(end) = &options.end {
        query = query.with_end(end.as_str());
    }

    let id = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(SearchOutcome::Canceled),
        id = jobs.create(repository, &query) => id?,
    };
    info!(repository, id = %id, live = options.live, "Query job started");

    let context = SearchContext {
        repository: repository.to_string(),
        query_string: query_string.to_string(),
        start_millis,
    };
    let session = Session {
        poller: Poller::new(jobs, repository, &id),
        progress: ProgressReporter::new(options.progress, context),
        stall: options.stall_timeout.map(StallWatch::new),
        format,
        options: &options,
    };
    let result = session.run(out, cancel).await;

    delete_job(jobs, repository, &id).await;

    match result {
        Ok(()) => Ok(SearchOutcome::Completed),
        Err(SearchError::Canceled) => {
            debug!(id = %id, "Search canceled");
            Ok(SearchOutcome::Canceled)
        }
        Err(e) => Err(e),
    }
}

struct Session<'a, C: ?Sized> {
    poller: Poller<'a, C>,
    progress: ProgressReporter,
    stall: Option<StallWatch>,
    format: FormatSpec,
    options: &'a SearchOptions,
}

impl<C: QueryJobs + ?Sized> Session<'_, C> {
    async fn run<W: Write>(mut self, out: &mut W, cancel: &CancellationToken) -> Result<(), SearchError> {
        let mut result = self.poller.next(cancel).await?;
        let mut printer = ResultPrinter::for_result(
            &result,
            &self.format,
            &self.options.field_printers,
            self.options.wrap,
        );

        while !result.done {
            self.progress.update(out, &result)?;
            if let Some(watch) = self.stall.as_mut() {
                watch.observe(&result)?;
            }
            result = self.poller.next(cancel).await?;
        }

        self.progress.finish(out, &result)?;
        if !self.progress.replaces_output() {
            printer.print(out, result)?;
        }

        if !self.options.live {
            return Ok(());
        }

        loop {
            let result = self.poller.next(cancel).await?;
            if self.progress.replaces_output() {
                self.progress.update(out, &result)?;
            } else {
                printer.print(out, result)?;
            }
        }
    }
}

/// Best-effort deletion, bounded by [`CLEANUP_TIMEOUT`]
async fn delete_job<C: QueryJobs + ?Sized>(jobs: &C, repository: &str, id: &str) {
    match tokio::time::timeout(CLEANUP_TIMEOUT, jobs.delete(repository, id)).await {
        Ok(Ok(())) => debug!(id, "Query job deleted"),
        Ok(Err(e)) => warn!(id, error = %e, "Failed to delete query job"),
        Err(_) => warn!(id, timeout = ?CLEANUP_TIMEOUT, "Timed out deleting query job"),
    }
}

/// Progress indicators that must change for a snapshot to count as progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Progress {
    work_done: u64,
    event_count: u64,
    events: usize,
    done: bool,
}

impl Progress {
    fn of(result: &QueryResult) -> Self {
        Self {
            work_done: result.metadata.work_done,
            event_count: result.metadata.event_count,
            events: result.events.len(),
            done: result.done,
        }
    }
}

/// Detects a job that keeps answering polls without advancing.
#[derive(Debug)]
struct StallWatch {
    timeout: Duration,
    last: Option<Progress>,
    since: Instant,
}

impl StallWatch {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last: None,
            since: Instant::now(),
        }
    }

    fn observe(&mut self, result: &QueryResult) -> Result<(), SearchError> {
        let progress = Progress::of(result);
        if self.last != Some(progress) {
            self.last = Some(progress);
            self.since = Instant::now();
            return Ok(());
        }
        if self.since.elapsed() >= self.timeout {
            warn!(timeout = ?self.timeout, "Query job stopped making progress");
            return Err(SearchError::Stalled(self.timeout));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(work_done: u64) -> QueryResult {
        let mut result = QueryResult::default();
        result.metadata.work_done = work_done;
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_watch_resets_on_progress() {
        let mut watch = StallWatch::new(Duration::from_secs(10));

        watch.observe(&snapshot(1)).unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        watch.observe(&snapshot(2)).unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        watch.observe(&snapshot(2)).unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(matches!(
            watch.observe(&snapshot(2)),
            Err(SearchError::Stalled(_))
        ));
    }

    #[test]
    fn test_default_options() {
        let options = SearchOptions::default();
        assert_eq!(options.start.as_deref(), Some("10m"));
        assert_eq!(options.format, crate::DEFAULT_FORMAT);
        assert!(options.wrap);
        assert!(!options.live);
    }
}
