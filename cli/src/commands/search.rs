//! Search command implementation

use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use std::future::Future;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trawl_client::HttpQueryJobs;
use trawl_search::{run_search, ProgressMode, SearchError, SearchOptions, SearchOutcome};
use trawl_shared::utils::parse_duration;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Repository to search
    pub repository: String,

    /// Query string
    pub query: String,

    /// Query start time, relative ("10m", "2h") or epoch milliseconds
    #[arg(short, long, default_value = "10m")]
    pub start: String,

    /// Query end time (default: now)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Keep the query running and print new results as they arrive
    #[arg(short, long)]
    pub live: bool,

    /// Event line format, e.g. "{@timestamp:-30} {@rawstring}"
    #[arg(short, long = "fmt", default_value = trawl_search::DEFAULT_FORMAT)]
    pub format: String,

    /// Do not wrap aggregate table cells
    #[arg(short = 'n', long)]
    pub no_wrap: bool,

    /// Do not show the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print one JSON progress record per poll instead of results
    #[arg(long)]
    pub json_progress: bool,

    /// Give up when the job makes no progress for this long (e.g. "30s", "5m")
    #[arg(long)]
    pub stall_timeout: Option<String>,
}

impl SearchArgs {
    fn progress_mode(&self) -> ProgressMode {
        if self.json_progress {
            ProgressMode::Json
        } else if self.no_progress {
            ProgressMode::Off
        } else {
            ProgressMode::Bar
        }
    }

    fn options(&self) -> Result<SearchOptions> {
        let stall_timeout = self
            .stall_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .context("Failed to parse stall timeout")?;

        Ok(SearchOptions {
            start: Some(self.start.clone()),
            end: self.end.clone(),
            live: self.live,
            format: self.format.clone(),
            wrap: !self.no_wrap,
            progress: self.progress_mode(),
            stall_timeout,
            ..Default::default()
        })
    }
}

pub async fn run(global: &GlobalArgs, args: SearchArgs) -> Result<ExitCode> {
    let options = args.options()?;
    let config = global.client_config()?;
    let jobs = HttpQueryJobs::new(&config).context("Failed to create HTTP client")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run_search(
        &jobs,
        &args.repository,
        &args.query,
        options,
        &mut out,
        &cancel,
    )
    .await;

    exit_code(result)
}

fn exit_code(result: Result<SearchOutcome, SearchError>) -> Result<ExitCode> {
    match result {
        Ok(SearchOutcome::Completed) => Ok(ExitCode::SUCCESS),
        Ok(SearchOutcome::Canceled) => {
            debug!("Search interrupted");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_query_error() => {
            eprint!("{}", query_error_banner(&e));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Search failed"),
    }
}

fn query_error_banner(err: &SearchError) -> String {
    format!("There was an error in your query string:\n\n{err}\n")
}

/// Exit status for a run aborted by a repeated interrupt
const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` on Ctrl-C (or SIGTERM on unix). A second signal exits the
/// process without waiting for cleanup.
async fn cancel_on_signal(token: CancellationToken) {
    watch_signals(token, shutdown_signal).await;
    warn!("Received second shutdown signal, exiting without cleanup");
    std::process::exit(FORCED_EXIT_CODE);
}

/// Cancel `token` on the first signal from `next_signal`, return on the second.
async fn watch_signals<S, F>(token: CancellationToken, mut next_signal: S)
where
    S: FnMut() -> F,
    F: Future<Output = ()>,
{
    next_signal().await;
    debug!("Received shutdown signal");
    token.cancel();
    next_signal().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
