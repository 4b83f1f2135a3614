//! Aggregation of outcomes into a [`RunResult`].
use stampede_core::{
    Classification, FailReason, FailureCounts, LatencyDistribution, LatencyThreshold,
    RequestOutcome, RunResult, Verdict,
};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, info, warn};

/// Count, measure and judge a finished race.
///
/// Every outcome contributes its duration to the latency distribution, failures included. The
/// run passes only when no outcome is an unexpected failure and the configured percentile is
/// below its limit.
pub fn evaluate(
    outcomes: Vec<RequestOutcome>,
    threshold: &LatencyThreshold,
    elapsed: Duration,
) -> RunResult {
    let mut accepted = 0;
    let mut rejected = 0;
    let mut failures = FailureCounts::default();

    for outcome in &outcomes {
        match outcome.classification() {
            Classification::Accepted => accepted += 1,
            Classification::ExpectedRejection => rejected += 1,
            Classification::UnexpectedFailure => {
                if let Some(kind) = outcome.failure_kind() {
                    failures.record(kind);
                }
                debug!(client = %outcome.client(), status = ?outcome.status(), "Unexpected failure");
            }
        }
    }

    let latency: LatencyDistribution = outcomes.iter().map(RequestOutcome::duration).collect();
    let observed = latency.quantile(threshold.quantile());

    let mut reasons = vec![];
    if failures.total() > 0 {
        warn!("{} unexpected failures", failures.total());
        reasons.push(FailReason::UnexpectedFailures {
            count: failures.total(),
        });
    }

    if !threshold.is_met(observed) {
        warn!("Latency threshold {threshold} exceeded: {observed:?}");
        reasons.push(FailReason::LatencyExceeded {
            percentile: threshold.percentile,
            observed,
            limit: threshold.limit,
        });
    }

    let verdict = if reasons.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail(reasons)
    };

    RunResult {
        total: outcomes.len(),
        accepted,
        rejected,
        failed: failures.total(),
        failures,
        latency,
        threshold: *threshold,
        observed,
        elapsed,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_core::{ClientId, ResultStatus, TransportError};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn threshold(limit: u64) -> LatencyThreshold {
        LatencyThreshold::new(95., ms(limit)).unwrap()
    }

    fn outcome(id: usize, millis: u64, status: u16) -> RequestOutcome {
        let classification = match status {
            202 => Classification::Accepted,
            409 => Classification::ExpectedRejection,
            _ => Classification::UnexpectedFailure,
        };
        RequestOutcome::new(
            ClientId::new(id).unwrap(),
            ms(millis),
            ResultStatus::Status(status),
            classification,
        )
    }

    /// One winner, everyone else rejected, all fast.
    fn race(clients: usize) -> Vec<RequestOutcome> {
        (1..=clients)
            .map(|id| outcome(id, 50 + (id as u64 % 150), if id == 1 { 202 } else { 409 }))
            .collect()
    }

    #[test]
    fn clean_race_passes() {
        let result = evaluate(race(1500), &threshold(1500), ms(900));
        assert_eq!(result.total, 1500);
        assert_eq!(result.accepted, 1);
        assert_eq!(result.rejected, 1499);
        assert_eq!(result.failed, 0);
        assert!(result.observed < ms(200));
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn one_timeout_fails_the_run() {
        let mut outcomes = race(1500);
        outcomes[36] = RequestOutcome::timeout(ClientId::new(37).unwrap(), ms(180));

        let result = evaluate(outcomes, &threshold(1500), ms(900));
        assert_eq!(result.total, 1500);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures.timeout, 1);
        assert_eq!(result.rejected, 1498);
        assert_eq!(
            result.verdict,
            Verdict::Fail(vec![FailReason::UnexpectedFailures { count: 1 }])
        );
    }

    #[test]
    fn failures_count_toward_latency() {
        let outcomes = vec![
            outcome(1, 10, 202),
            RequestOutcome::new(
                ClientId::new(2).unwrap(),
                ms(5_000),
                ResultStatus::Transport(TransportError::Timeout("slow".to_string())),
                Classification::UnexpectedFailure,
            ),
        ];

        let result = evaluate(outcomes, &threshold(1500), ms(5_000));
        assert_eq!(result.latency.len(), 2);
        assert_eq!(result.latency.max(), ms(5_000));
        assert_eq!(result.failures.transport, 1);

        let Verdict::Fail(reasons) = result.verdict else {
            panic!("expected failure");
        };
        assert_eq!(reasons.len(), 2);
        assert!(matches!(reasons[1], FailReason::LatencyExceeded { .. }));
    }

    #[test]
    fn slow_but_correct_fails_on_latency() {
        let outcomes: Vec<_> = (1..=100)
            .map(|id| outcome(id, 2_000, if id == 1 { 202 } else { 409 }))
            .collect();

        let result = evaluate(outcomes, &threshold(1500), ms(2_100));
        assert_eq!(result.failed, 0);
        assert_eq!(result.observed, ms(2_000));
        assert!(matches!(
            result.verdict,
            Verdict::Fail(ref reasons) if reasons.len() == 1
        ));
    }

    #[test]
    fn unexpected_status_fails_even_when_fast() {
        let mut outcomes = race(10);
        outcomes.push(outcome(11, 1, 500));

        let result = evaluate(outcomes, &threshold(1500), ms(100));
        assert_eq!(result.failures.unexpected_status, 1);
        assert!(!result.is_pass());
    }
}
