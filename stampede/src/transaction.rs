//! One simulated client's single request/response cycle.
use crate::classifier::Classifier;
use crate::transport::Transport;
use stampede_core::{
    Classification, ClientId, Credential, RequestOutcome, ResultStatus, TransportError,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[cfg(feature = "metrics")]
const LATENCY_METRIC: &str = "stampede_request_latency";
#[cfg(feature = "metrics")]
const OUTCOME_METRIC: &str = "stampede_request_outcome";

/// Issue exactly one call and time it from send until the response is complete or the transport
/// gives up.
pub async fn execute<T: Transport>(
    transport: &T,
    credential: &Credential,
) -> (Duration, Result<u16, TransportError>) {
    let start = Instant::now();
    let res = transport.send(credential).await;
    let elapsed = start.elapsed();

    #[cfg(feature = "metrics")]
    {
        metrics::describe_histogram!(LATENCY_METRIC, metrics::Unit::Nanoseconds, "");
        metrics::histogram!(LATENCY_METRIC).record(elapsed.as_nanos() as f64);
    }

    (elapsed, res)
}

/// Execute and classify. Produces the client's one and only outcome record.
pub(crate) async fn run_client<T: Transport>(
    client: ClientId,
    credential: &Credential,
    transport: &T,
    classifier: &Classifier,
) -> RequestOutcome {
    let (duration, res) = execute(transport, credential).await;
    let classification = classifier.classify_result(&res);

    let status = match res {
        Ok(status) => {
            trace!(%client, status, ?duration, %classification, "Response");
            if classification == Classification::UnexpectedFailure {
                debug!(%client, status, "Unexpected status");
            }
            ResultStatus::Status(status)
        }
        Err(err) => {
            debug!(%client, ?duration, "Transport failure: {err}");
            ResultStatus::Transport(err)
        }
    };

    RequestOutcome::new(client, duration, status, classification)
}

/// Count a client's final outcome. Called once per client, including the ones cancelled at the
/// deadline.
pub(crate) fn record_outcome(outcome: &RequestOutcome) {
    #[cfg(feature = "metrics")]
    metrics::counter!(
        OUTCOME_METRIC,
        "classification" => outcome.classification().to_string()
    )
    .increment(1);

    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}
