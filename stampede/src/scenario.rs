//! Race orchestration
use crate::allocator::{allocate, check_capacity};
use crate::classifier::Classifier;
use crate::error::RaceError;
use crate::pool::CredentialPool;
use crate::transaction::{record_outcome, run_client};
use crate::transport::{HttpTransport, Transport};
use crate::verdict::evaluate;
use stampede_core::{ClientId, LatencyThreshold, RaceConfig, RequestOutcome, RunResult};
use std::{
    future::{Future, IntoFuture},
    num::NonZeroUsize,
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Stages a race goes through, in order. Any fatal error before `Running` aborts the race without
/// sending a single request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RacePhase {
    Initializing,
    Loading,
    Launching,
    Running,
    Collecting,
    Verdict,
}

/// Stand-in deadline when the configured ceiling does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A spawned client, reporting its outcome and when it finished.
type Worker = JoinHandle<(RequestOutcome, Instant)>;

/// A configured race, ready to be awaited.
///
/// # Example
/// ```no_run
/// use stampede::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), RaceError> {
///     let config = RaceConfig::new("event-apply", "https://event.example.com".parse().unwrap());
///
///     let result = RaceScenario::http(config)?
///         .duration(Duration::from_secs(60))
///         .await?;
///
///     println!("{result}");
///     Ok(())
/// }
/// ```
pub struct RaceScenario<T> {
    config: RaceConfig,
    pool: Option<CredentialPool>,
    transport: T,
}

impl RaceScenario<HttpTransport> {
    /// Race over HTTP against `config.target`.
    pub fn http(config: RaceConfig) -> Result<Self, RaceError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> RaceScenario<T> {
    pub fn with_transport(config: RaceConfig, transport: T) -> Self {
        Self {
            config,
            pool: None,
            transport,
        }
    }

    /// Use an already loaded pool instead of reading `config.credentials`.
    pub fn pool(mut self, pool: CredentialPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn clients(mut self, clients: NonZeroUsize) -> Self {
        self.config.clients = clients;
        self
    }

    /// Hard ceiling for the whole race. Clients still pending afterwards are recorded as
    /// timeouts.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.max_duration = duration;
        self
    }

    pub fn threshold(mut self, threshold: LatencyThreshold) -> Self {
        self.config.latency = threshold;
        self
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub async fn run(self) -> Result<RunResult, RaceError> {
        run_race(self.config, self.pool, self.transport).await
    }
}

impl<T: Transport> IntoFuture for RaceScenario<T> {
    type Output = Result<RunResult, RaceError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

#[instrument(name = "race", skip_all, fields(name = %config.name, clients = config.clients.get()))]
pub(crate) async fn run_race<T: Transport>(
    config: RaceConfig,
    pool: Option<CredentialPool>,
    transport: T,
) -> Result<RunResult, RaceError> {
    enter(RacePhase::Initializing);
    config.validate()?;
    let classifier = Arc::new(Classifier::from_config(&config)?);
    info!(
        "Racing {} clients against {} (max duration {:?})",
        config.clients,
        config.endpoint()?,
        config.max_duration
    );

    enter(RacePhase::Loading);
    let pool = match pool {
        Some(pool) => pool,
        None => CredentialPool::load(&config.credentials)?,
    };
    check_capacity(&pool, config.clients)?;

    enter(RacePhase::Launching);
    let transport = Arc::new(transport);
    let (start_tx, start_rx) = watch::channel(false);
    let mut workers = Vec::with_capacity(config.clients.get());
    for client in ClientId::range(config.clients) {
        let credential = allocate(client, &pool)?.clone();
        let transport = transport.clone();
        let classifier = classifier.clone();
        let mut start = start_rx.clone();

        let handle = tokio::spawn(
            async move {
                // NOTE: Park until every worker exists so the requests leave together.
                let released = start.wait_for(|released| *released).await.is_ok();
                if !released {
                    return (RequestOutcome::aborted(client, Duration::ZERO), Instant::now());
                }

                let outcome =
                    run_client(client, &credential, transport.as_ref(), &classifier).await;
                (outcome, Instant::now())
            }
            .in_current_span(),
        );
        workers.push((client, handle));
    }
    drop(start_rx);

    enter(RacePhase::Running);
    let started = Instant::now();
    let deadline = started
        .checked_add(config.max_duration)
        .unwrap_or_else(|| started + FAR_FUTURE);
    start_tx.send_replace(true);

    enter(RacePhase::Collecting);
    let outcomes = collect(workers, started, deadline).await;

    enter(RacePhase::Verdict);
    let result = evaluate(outcomes, &config.latency, started.elapsed());
    info!(
        "Race complete: {} (accepted={}, rejected={}, failed={}, p({})={:?})",
        result.verdict,
        result.accepted,
        result.rejected,
        result.failed,
        result.threshold.percentile,
        result.observed,
    );

    Ok(result)
}

/// Wait for every worker or the deadline, whichever comes first. Always yields exactly one
/// outcome per worker.
///
/// A worker counts as finished only if it finished by the deadline. One that completes later,
/// even before its handle is reached here, is recorded as a timeout.
async fn collect(
    workers: Vec<(ClientId, Worker)>,
    started: Instant,
    deadline: Instant,
) -> Vec<RequestOutcome> {
    let mut outcomes = Vec::with_capacity(workers.len());
    let ceiling = deadline.saturating_duration_since(started);
    let mut cancelled = 0;
    let mut late = 0;

    for (client, mut handle) in workers {
        let outcome = match timeout_at(deadline, &mut handle).await {
            Ok(Ok((outcome, finished))) if finished <= deadline => outcome,
            Ok(Ok(_)) => {
                late += 1;
                RequestOutcome::timeout(client, ceiling)
            }
            Ok(Err(err)) => {
                error!(%client, "Worker ended without an outcome: {err}");
                RequestOutcome::aborted(client, started.elapsed())
            }
            Err(_) => {
                handle.abort();
                cancelled += 1;
                RequestOutcome::timeout(client, ceiling)
            }
        };
        record_outcome(&outcome);
        outcomes.push(outcome);
    }

    if cancelled > 0 {
        warn!("Deadline reached, cancelled {cancelled} pending clients");
    }
    if late > 0 {
        warn!("{late} clients finished after the deadline");
    }

    outcomes
}

fn enter(phase: RacePhase) {
    debug!(?phase, "Entering phase");
}
