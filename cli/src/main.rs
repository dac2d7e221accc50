//! CLI for trawl
//!
//! Commands:
//! - search: run a query job against a repository and print its results
//! - profiles: inspect configured service profiles

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trawl_client::{ClientConfig, Overrides, Settings};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "trawl")]
#[command(about = "trawl - search a log-management service from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Configuration file (default: <config dir>/trawl/config.toml)
    #[arg(long, global = true, env = "TRAWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Named profile from the configuration file
    #[arg(short, long, global = true, env = "TRAWL_PROFILE")]
    pub profile: Option<String>,

    /// Service address, overrides the configured one
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// API token, overrides the configured one
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    fn settings(&self) -> Result<Settings> {
        Settings::load(self.config.as_deref()).context("Failed to load configuration")
    }

    fn client_config(&self) -> Result<ClientConfig> {
        let overrides = Overrides {
            address: self.address.clone(),
            token: self.token.clone(),
        };
        let config = self
            .settings()?
            .resolve(self.profile.as_deref(), &overrides)?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search a repository
    Search(commands::search::SearchArgs),

    /// Inspect configured profiles
    #[command(subcommand)]
    Profiles(commands::profiles::ProfilesCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = match cli.command {
        Commands::Search(args) => commands::search::run(&cli.global, args).await,
        Commands::Profiles(command) => commands::profiles::run(&cli.global, command),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
