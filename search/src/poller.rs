//! Query job poller
//!
//! Fetches snapshots no sooner than the service asked for, and gives up
//! immediately when the session is canceled.

use crate::error::SearchError;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use trawl_client::QueryJobs;
use trawl_shared::QueryResult;

/// Polls one query job. Owns the back-off state for that job.
pub struct Poller<'a, C: ?Sized> {
    jobs: &'a C,
    repository: &'a str,
    id: &'a str,
    next_poll: Instant,
}

impl<'a, C: QueryJobs + ?Sized> Poller<'a, C> {
    /// The first call to [`Poller::next`] polls right away.
    pub fn new(jobs: &'a C, repository: &'a str, id: &'a str) -> Self {
        Self {
            jobs,
            repository,
            id,
            next_poll: Instant::now(),
        }
    }

    /// Earliest instant the next request may be issued.
    pub fn next_poll(&self) -> Instant {
        self.next_poll
    }

    /// Wait for the advised delay, then fetch the next snapshot.
    ///
    /// Returns [`SearchError::Canceled`] without issuing a request if `cancel`
    /// fires first. Service and transport errors are returned as-is.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Result<QueryResult, SearchError> {
        if cancel.is_cancelled() {
            return Err(SearchError::Canceled);
        }
        if self.next_poll > Instant::now() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SearchError::Canceled),
                _ = sleep_until(self.next_poll) => {}
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchError::Canceled),
            result = self.jobs.poll(self.repository, self.id) => result?,
        };

        let delay = Duration::from_millis(result.metadata.poll_after);
        self.next_poll = Instant::now() + delay;
        debug!(
            id = %self.id,
            done = result.done,
            work_done = result.metadata.work_done,
            total_work = result.metadata.total_work,
            poll_after_ms = result.metadata.poll_after,
            "Polled query job"
        );

        Ok(result)
    }
}
