//! Command line launcher for a single race.
//!
//! Parses the race configuration from arguments (or `STAMPEDE_*` environment variables), runs
//! it, prints the summary on stdout and maps the verdict onto the process exit code.
use anyhow::Context;
use clap::Parser;
use stampede::types::{DEFAULT_CLIENTS, DEFAULT_CREDENTIALS, DEFAULT_PATH};
use stampede::prelude::*;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
#[allow(unused)]
use tracing::{debug, error, info, instrument};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "stampede",
    version,
    about = "Race many clients against one endpoint and judge how the server resolved it."
)]
pub struct StampedeCli {
    /// Base address of the server under test, e.g. `https://event.example.com`.
    #[arg(long, env = "STAMPEDE_TARGET")]
    pub target: Url,

    /// Endpoint path appended to the target.
    #[arg(long, env = "STAMPEDE_PATH", default_value = DEFAULT_PATH)]
    pub path: String,

    /// Newline-delimited credential list, one bearer token per client.
    #[arg(long, env = "STAMPEDE_CREDENTIALS", default_value = DEFAULT_CREDENTIALS)]
    pub credentials: PathBuf,

    /// Number of simulated clients.
    #[arg(short, long, env = "STAMPEDE_CLIENTS", default_value_t = DEFAULT_CLIENTS)]
    pub clients: NonZeroUsize,

    /// Hard ceiling for the whole race.
    #[arg(long, env = "STAMPEDE_MAX_DURATION", default_value = "1m")]
    pub max_duration: humantime::Duration,

    /// Per-request client timeout. Unset means only the race ceiling applies.
    #[arg(long, env = "STAMPEDE_REQUEST_TIMEOUT")]
    pub request_timeout: Option<humantime::Duration>,

    /// Status codes of a caller who won the race.
    #[arg(long = "accept", env = "STAMPEDE_ACCEPT", default_value = "202")]
    pub accepted: StatusSet,

    /// Status codes of a caller who lost the race and was correctly turned away.
    #[arg(long = "reject", env = "STAMPEDE_REJECT", default_value = "409")]
    pub rejected: StatusSet,

    /// Latency bound, e.g. `p(95)<1500ms`.
    #[arg(long, env = "STAMPEDE_THRESHOLD", default_value = "p(95)<1500ms")]
    pub threshold: LatencyThreshold,

    /// Name used in logs.
    #[arg(long, default_value = "race")]
    pub name: String,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StampedeCli {
    pub fn into_config(self) -> RaceConfig {
        let mut config = RaceConfig::new(&self.name, self.target);
        config.path = self.path;
        config.credentials = self.credentials;
        config.clients = self.clients;
        config.max_duration = self.max_duration.into();
        config.request_timeout = self.request_timeout.map(Into::into);
        config.accepted = self.accepted;
        config.rejected = self.rejected;
        config.latency = self.threshold;
        config
    }
}

/// How a launch ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Pass,
    Fail,
    /// Aborted before a verdict could be reached.
    Fatal,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Pass => ExitCode::SUCCESS,
            RunStatus::Fail => ExitCode::from(1),
            RunStatus::Fatal => ExitCode::from(2),
        }
    }
}

/// Default stampede launcher.
///
/// # Example
///
/// ```ignore
/// #[tokio::main]
/// async fn main() -> std::process::ExitCode {
///     StampedeRuntime::with_args().run().await.into()
/// }
/// ```
pub struct StampedeRuntime {
    cli: StampedeCli,
}

impl StampedeRuntime {
    pub fn new(cli: StampedeCli) -> Self {
        Self { cli }
    }

    /// Configure the race from the process arguments.
    ///
    /// ```ignore
    /// $ stampede --target https://event.example.com -c 1500 --threshold 'p(95)<1500ms'
    /// $ STAMPEDE_TARGET=http://localhost:8080 stampede --credentials tokens.txt --json
    /// ```
    pub fn with_args() -> Self {
        Self::new(StampedeCli::parse())
    }

    #[instrument(name = "stampede", skip_all, fields(target = %self.cli.target))]
    pub async fn run(self) -> RunStatus {
        let json = self.cli.json;

        let result = match race(self.cli.into_config()).await {
            Ok(result) => result,
            Err(err) => {
                error!("{err:#}");
                eprintln!("stampede: {err:#}");
                return RunStatus::Fatal;
            }
        };

        if let Err(err) = report(&result, json) {
            error!("Unable to print summary: {err:#}");
        }

        if result.is_pass() {
            RunStatus::Pass
        } else {
            RunStatus::Fail
        }
    }
}

async fn race(config: RaceConfig) -> anyhow::Result<RunResult> {
    let scenario = RaceScenario::http(config).context("Unable to prepare race")?;
    let result = scenario.await.context("Race aborted")?;
    Ok(result)
}

fn report(result: &RunResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{result}");
    }
    Ok(())
}
