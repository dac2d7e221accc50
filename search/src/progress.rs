//! Search progress reporting
//!
//! Either an updating progress bar on stderr or one JSON record per poll on
//! the output stream. The JSON mode also replaces normal data output.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use trawl_shared::utils::add_si_suffix;
use trawl_shared::utils::time::system_time_millis;
use trawl_shared::{QueryMetadata, QueryResult};

/// How progress is reported for a search session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Terminal progress bar (hidden when stderr is not a terminal)
    #[default]
    Bar,
    /// One JSON record per poll; suppresses data output
    Json,
    Off,
}

/// Identifies the search in JSON progress records
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub repository: String,
    pub query_string: String,
    pub start_millis: i64,
}

#[derive(Debug)]
pub enum ProgressReporter {
    Bar(QueryProgressBar),
    Json(SearchContext),
    Off,
}

impl ProgressReporter {
    pub fn new(mode: ProgressMode, context: SearchContext) -> Self {
        match mode {
            ProgressMode::Bar => Self::Bar(QueryProgressBar::new()),
            ProgressMode::Json => Self::Json(context),
            ProgressMode::Off => Self::Off,
        }
    }

    /// True when data output must be skipped for this session.
    pub fn replaces_output(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    pub fn update<W: Write>(&mut self, out: &mut W, result: &QueryResult) -> io::Result<()> {
        match self {
            Self::Bar(bar) => {
                bar.update(result);
                Ok(())
            }
            Self::Json(context) => {
                let record = ProgressRecord::new(context, result, system_time_millis());
                write_record(out, &record)
            }
            Self::Off => Ok(()),
        }
    }

    /// Report the final snapshot and close the progress bar.
    pub fn finish<W: Write>(&mut self, out: &mut W, result: &QueryResult) -> io::Result<()> {
        self.update(out, result)?;
        if let Self::Bar(bar) = self {
            bar.finish();
        }
        Ok(())
    }
}

/// Progress bar keyed by `workDone / totalWork`, annotated with throughput
/// and hit count.
#[derive(Debug)]
pub struct QueryProgressBar {
    bar: ProgressBar,
}

impl QueryProgressBar {
    pub fn new() -> Self {
        if !io::stderr().is_terminal() {
            return Self::hidden();
        }

        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix} [{bar:40.cyan/blue}] {percent:>3}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix("Searching...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, result: &QueryResult) {
        let metadata = &result.metadata;
        self.bar.set_length(metadata.total_work);
        self.bar.set_position(metadata.work_done);
        self.bar.set_message(progress_annotations(metadata));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl Default for QueryProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

/// `"1.5 MiB/s | 12.3 k events/s | 42.0 events"`; throughput parts are left
/// out until the job reports elapsed time.
pub fn progress_annotations(metadata: &QueryMetadata) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(bps) = metadata.bytes_per_second() {
        parts.push(format!("{}B/s", scaled(bps, true)));
    }
    if let Some(eps) = metadata.events_per_second() {
        parts.push(format!("{} events/s", scaled(eps, false).trim_end()));
    }
    parts.push(format!(
        "{} events",
        scaled(metadata.event_count as f64, false).trim_end()
    ));
    parts.join(" | ")
}

/// `"1.5 Ki"`, `"512.0 "`: value with one decimal, a space, and the unit prefix.
fn scaled(value: f64, binary: bool) -> String {
    let (v, suffix) = add_si_suffix(value, binary);
    format!("{v:.1} {suffix}")
}

/// One line of `--json-progress` output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub timestamp: i64,
    pub start_millis: i64,
    pub repo: String,
    pub query_string: String,
    pub start: u64,
    pub end: u64,
    pub total_work: u64,
    pub work_done: u64,
    pub time_millis: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps_value: Option<f64>,
    pub event_count: u64,
    pub done: bool,
}

impl ProgressRecord {
    pub fn new(context: &SearchContext, result: &QueryResult, timestamp: i64) -> Self {
        let m = &result.metadata;
        Self {
            timestamp,
            start_millis: context.start_millis,
            repo: context.repository.clone(),
            query_string: context.query_string.clone(),
            start: m.query_start,
            end: m.query_end,
            total_work: m.total_work,
            work_done: m.work_done,
            time_millis: m.time_millis,
            eps_value: m.events_per_second(),
            bps_value: m.bytes_per_second(),
            event_count: m.event_count,
            done: result.done,
        }
    }
}

fn write_record<W: Write>(out: &mut W, record: &ProgressRecord) -> io::Result<()> {
    let line = serde_json::to_string(record).map_err(io::Error::other)?;
    writeln!(out, "{line}")?;
    out.flush()
}
