use crate::{FailureKind, LatencyThreshold};
use serde::{Serialize, Serializer};
use serde_with::{serde_as, DurationMilliSeconds, DurationMilliSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Every recorded request duration, sorted ascending.
///
/// Durations are kept exactly rather than sketched: one race produces one sample per client, so
/// the full set is small and the percentiles can be computed without approximation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatencyDistribution {
    sorted: Vec<Duration>,
}

impl LatencyDistribution {
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Linear interpolation between the two closest ranks. `quantile` is clamped to [0, 1] and an
    /// empty distribution yields zero.
    pub fn quantile(&self, quantile: f64) -> Duration {
        let (Some(first), Some(last)) = (self.sorted.first(), self.sorted.last()) else {
            return Duration::ZERO;
        };

        let quantile = if quantile.is_nan() {
            0.
        } else {
            quantile.clamp(0., 1.)
        };

        let rank = quantile * (self.sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        if lower == upper {
            return self.sorted[lower];
        }

        let (low, high) = (self.sorted[lower], self.sorted[upper]);
        let frac = rank - lower as f64;
        let secs = low.as_secs_f64() + (high.as_secs_f64() - low.as_secs_f64()) * frac;

        Duration::from_secs_f64(secs).clamp(*first, *last)
    }

    pub fn min(&self) -> Duration {
        self.sorted.first().copied().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.sorted.last().copied().unwrap_or_default()
    }

    pub fn mean(&self) -> Duration {
        if self.sorted.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.sorted.iter().sum();
        total / self.sorted.len() as u32
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.len(),
            min: self.min(),
            mean: self.mean(),
            p50: self.quantile(0.5),
            p90: self.quantile(0.9),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
            max: self.max(),
        }
    }
}

impl FromIterator<Duration> for LatencyDistribution {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        let mut sorted: Vec<Duration> = iter.into_iter().collect();
        sorted.sort_unstable();
        Self { sorted }
    }
}

impl Serialize for LatencyDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub mean: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p99: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:?}, mean={:?}, p50={:?}, p90={:?}, p95={:?}, p99={:?}, max={:?}",
            self.min, self.mean, self.p50, self.p90, self.p95, self.p99, self.max,
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub transport: usize,
    pub unexpected_status: usize,
    pub timeout: usize,
    pub aborted: usize,
}

impl FailureCounts {
    pub fn record(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Transport => self.transport += 1,
            FailureKind::UnexpectedStatus => self.unexpected_status += 1,
            FailureKind::Timeout => self.timeout += 1,
            FailureKind::Aborted => self.aborted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.transport + self.unexpected_status + self.timeout + self.aborted
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    UnexpectedFailures {
        count: usize,
    },
    LatencyExceeded {
        percentile: f64,
        #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
        observed: Duration,
        #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
        limit: Duration,
    },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::UnexpectedFailures { count } => {
                write!(f, "{count} response(s) outside the expected outcome set")
            }
            FailReason::LatencyExceeded {
                percentile,
                observed,
                limit,
            } => write!(f, "p({percentile}) latency {observed:?} is not below {limit:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "reasons", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Vec<FailReason>),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail(_) => f.write_str("FAIL"),
        }
    }
}

/// Aggregate of one race.
#[serde_as]
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub failures: FailureCounts,
    pub latency: LatencyDistribution,
    pub threshold: LatencyThreshold,
    /// The latency at `threshold.percentile`, over every recorded request.
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub observed: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub elapsed: Duration,
    pub verdict: Verdict,
}

impl RunResult {
    pub fn is_pass(&self) -> bool {
        self.verdict.is_pass()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Race finished in {:?}: {}", self.elapsed, self.verdict)?;
        writeln!(f, "  clients:             {}", self.total)?;
        writeln!(f, "  accepted:            {}", self.accepted)?;
        writeln!(f, "  expected rejections: {}", self.rejected)?;
        writeln!(
            f,
            "  unexpected failures: {} (transport={}, status={}, timeout={}, aborted={})",
            self.failed,
            self.failures.transport,
            self.failures.unexpected_status,
            self.failures.timeout,
            self.failures.aborted,
        )?;
        writeln!(f, "  latency:             {}", self.latency.summary())?;
        write!(
            f,
            "  threshold:           {} (observed {:?})",
            self.threshold, self.observed
        )?;

        if let Verdict::Fail(reasons) = &self.verdict {
            for reason in reasons {
                write!(f, "\n  failed: {reason}")?;
            }
        }

        Ok(())
    }
}
