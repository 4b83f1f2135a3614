use crate::{
    ConfigError, DEFAULT_ACCEPTED_STATUS, DEFAULT_CLIENTS, DEFAULT_CREDENTIALS,
    DEFAULT_LATENCY_LIMIT, DEFAULT_LATENCY_PERCENTILE, DEFAULT_MAX_DURATION, DEFAULT_PATH,
    DEFAULT_REJECTED_STATUS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Everything a race needs to know before it starts.
///
/// Built once at launch and shared read-only with every component of the run.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaceConfig {
    pub name: String,
    pub target: Url,
    pub path: String,
    pub credentials: PathBuf,
    pub clients: NonZeroUsize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_duration: Duration,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub request_timeout: Option<Duration>,
    pub accepted: StatusSet,
    pub rejected: StatusSet,
    pub latency: LatencyThreshold,
}

impl RaceConfig {
    pub fn new(name: &str, target: Url) -> Self {
        Self {
            name: name.to_string(),
            target,
            path: DEFAULT_PATH.to_string(),
            credentials: PathBuf::from(DEFAULT_CREDENTIALS),
            clients: DEFAULT_CLIENTS,
            max_duration: DEFAULT_MAX_DURATION,
            request_timeout: None,
            accepted: StatusSet::from([DEFAULT_ACCEPTED_STATUS]),
            rejected: StatusSet::from([DEFAULT_REJECTED_STATUS]),
            latency: LatencyThreshold::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.max_duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        validate_status_sets(&self.accepted, &self.rejected)?;
        self.latency.validate()
    }

    /// The full address every simulated client posts to.
    ///
    /// The path is appended to whatever path the target already carries, so a target of
    /// `https://host/v2` and a path of `/apply` yields `https://host/v2/apply`.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        if !matches!(self.target.scheme(), "http" | "https") || self.target.cannot_be_a_base() {
            return Err(ConfigError::InvalidTarget(self.target.to_string()));
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }

        let mut endpoint = self.target.clone();
        let base = endpoint.path().trim_end_matches('/').to_string();
        endpoint.set_path(&format!("{base}{}", self.path));
        Ok(endpoint)
    }
}

/// The accepted set must be non-empty and the two sets must not share a code, otherwise a
/// response could count as both a win and a loss.
pub fn validate_status_sets(accepted: &StatusSet, rejected: &StatusSet) -> Result<(), ConfigError> {
    if accepted.is_empty() {
        return Err(ConfigError::EmptyAcceptedSet);
    }

    match accepted.0.intersection(&rejected.0).next() {
        Some(code) => Err(ConfigError::OverlappingStatus(*code)),
        None => Ok(()),
    }
}

/// A small set of HTTP status codes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(BTreeSet<u16>);

impl StatusSet {
    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl<const N: usize> From<[u16; N]> for StatusSet {
    fn from(codes: [u16; N]) -> Self {
        Self(codes.into_iter().collect())
    }
}

impl FromIterator<u16> for StatusSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a comma separated list such as `202,409`.
impl FromStr for StatusSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| match code.parse::<u16>() {
                Ok(status @ 100..=599) => Ok(status),
                _ => Err(ConfigError::InvalidStatus(code.to_string())),
            })
            .collect()
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.iter().map(|code| code.to_string()).collect();
        write!(f, "{{{}}}", codes.join(", "))
    }
}

/// Upper bound for one latency percentile, e.g. `p(95)<1500ms`.
///
/// The bound is strict: the run only passes when the observed percentile is below `limit`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatencyThreshold {
    pub percentile: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub limit: Duration,
}

impl LatencyThreshold {
    pub fn new(percentile: f64, limit: Duration) -> Result<Self, ConfigError> {
        let threshold = Self { percentile, limit };
        threshold.validate()?;
        Ok(threshold)
    }

    /// The percentile as a fraction in (0, 1].
    pub fn quantile(&self) -> f64 {
        self.percentile / 100.
    }

    pub fn is_met(&self, observed: Duration) -> bool {
        observed < self.limit
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.percentile > 0. && self.percentile <= 100.) {
            return Err(ConfigError::PercentileOutOfRange(self.percentile));
        }

        Ok(())
    }
}

impl Default for LatencyThreshold {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_LATENCY_PERCENTILE,
            limit: DEFAULT_LATENCY_LIMIT,
        }
    }
}

/// Accepts `p(95)<1500ms`, `p95<1.5s` or `p(99.9)<800`. A bare number is read as milliseconds.
impl FromStr for LatencyThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidThreshold(s.to_string());
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let rest = compact.strip_prefix('p').ok_or_else(invalid)?;
        let (percentile, limit) = rest.split_once('<').ok_or_else(invalid)?;
        let percentile = percentile
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .unwrap_or(percentile);

        let percentile: f64 = percentile.parse().map_err(|_| invalid())?;
        let limit = match limit.parse::<f64>() {
            Ok(millis) if millis.is_finite() && millis > 0. => {
                Duration::try_from_secs_f64(millis / 1000.).map_err(|_| invalid())?
            }
            Ok(_) => return Err(invalid()),
            Err(_) => humantime::parse_duration(limit).map_err(|_| invalid())?,
        };

        if limit.is_zero() {
            return Err(invalid());
        }

        Self::new(percentile, limit)
    }
}

impl fmt::Display for LatencyThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p({})<{}",
            self.percentile,
            humantime::format_duration(self.limit)
        )
    }
}
