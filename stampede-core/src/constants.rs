use std::num::NonZeroUsize;
use std::time::Duration;

/// Number of simulated clients when none is configured.
pub const DEFAULT_CLIENTS: NonZeroUsize = match NonZeroUsize::new(1500) {
    Some(n) => n,
    None => unreachable!(),
};

/// Hard ceiling for a whole run.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(60);

/// Endpoint the race is fought over, joined onto the target base address.
pub const DEFAULT_PATH: &str = "/api/event/apply";

/// Default credential list, one bearer token per line.
pub const DEFAULT_CREDENTIALS: &str = "tokens.txt";

/// A caller who won the race.
pub const DEFAULT_ACCEPTED_STATUS: u16 = 202;

/// A caller who lost the race and was correctly turned away.
pub const DEFAULT_REJECTED_STATUS: u16 = 409;

/// Default latency percentile checked against [`DEFAULT_LATENCY_LIMIT`].
pub const DEFAULT_LATENCY_PERCENTILE: f64 = 95.;

pub const DEFAULT_LATENCY_LIMIT: Duration = Duration::from_millis(1500);
