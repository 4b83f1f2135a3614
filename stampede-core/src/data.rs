use crate::TransportError;
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Identity of one simulated client, numbered from 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClientId(NonZeroUsize);

impl ClientId {
    pub fn new(id: usize) -> Option<Self> {
        NonZeroUsize::new(id).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Zero-based slot in the credential pool owned by this client.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }

    /// Every identity of a run with `clients` participants, in order.
    pub fn range(clients: NonZeroUsize) -> impl Iterator<Item = ClientId> {
        (1..=clients.get()).filter_map(ClientId::new)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opaque bearer credential.
///
/// Cloning only bumps a reference count, so every worker can hold its own handle on the pool's
/// storage. The value never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// This caller won the race.
    Accepted,
    /// This caller lost the race and the server turned it away as expected.
    ExpectedRejection,
    UnexpectedFailure,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Accepted => "accepted",
            Classification::ExpectedRejection => "expected_rejection",
            Classification::UnexpectedFailure => "unexpected_failure",
        };
        f.write_str(s)
    }
}

/// What came back for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Status(u16),
    Transport(TransportError),
    /// Still pending when the run deadline expired.
    Timeout,
    /// The worker task died before reporting.
    Aborted,
}

/// Why an [`Classification::UnexpectedFailure`] happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    UnexpectedStatus,
    Timeout,
    Aborted,
}

/// The single record produced by one simulated client.
#[serde_as]
#[derive(Clone, Debug, Serialize)]
pub struct RequestOutcome {
    client: ClientId,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    duration: Duration,
    status: ResultStatus,
    classification: Classification,
}

impl RequestOutcome {
    pub fn new(
        client: ClientId,
        duration: Duration,
        status: ResultStatus,
        classification: Classification,
    ) -> Self {
        Self {
            client,
            duration,
            status,
            classification,
        }
    }

    /// A client the orchestrator had to cancel at the deadline.
    pub fn timeout(client: ClientId, elapsed: Duration) -> Self {
        Self::new(
            client,
            elapsed,
            ResultStatus::Timeout,
            Classification::UnexpectedFailure,
        )
    }

    pub fn aborted(client: ClientId, elapsed: Duration) -> Self {
        Self::new(
            client,
            elapsed,
            ResultStatus::Aborted,
            Classification::UnexpectedFailure,
        )
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn status(&self) -> &ResultStatus {
        &self.status
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.classification != Classification::UnexpectedFailure {
            return None;
        }

        Some(match self.status {
            ResultStatus::Status(_) => FailureKind::UnexpectedStatus,
            ResultStatus::Transport(_) => FailureKind::Transport,
            ResultStatus::Timeout => FailureKind::Timeout,
            ResultStatus::Aborted => FailureKind::Aborted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_one_based() {
        let ids: Vec<_> = ClientId::range(NonZeroUsize::new(3).unwrap()).collect();
        assert_eq!(ids.iter().map(|c| c.get()).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(ids.iter().map(|c| c.index()).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(ClientId::new(0).is_none());
        assert_eq!(ids[2].to_string(), "#3");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::from("secret-token");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(credential.expose(), "secret-token");
    }

    #[test]
    fn failure_kind_follows_status() {
        let client = ClientId::new(1).unwrap();
        let ms = Duration::from_millis(10);

        let ok = RequestOutcome::new(client, ms, ResultStatus::Status(202), Classification::Accepted);
        assert_eq!(ok.failure_kind(), None);

        let bad_status = RequestOutcome::new(
            client,
            ms,
            ResultStatus::Status(500),
            Classification::UnexpectedFailure,
        );
        assert_eq!(bad_status.failure_kind(), Some(FailureKind::UnexpectedStatus));

        let refused = RequestOutcome::new(
            client,
            ms,
            ResultStatus::Transport(TransportError::Connect("refused".to_string())),
            Classification::UnexpectedFailure,
        );
        assert_eq!(refused.failure_kind(), Some(FailureKind::Transport));

        assert_eq!(
            RequestOutcome::timeout(client, ms).failure_kind(),
            Some(FailureKind::Timeout)
        );
        assert_eq!(
            RequestOutcome::aborted(client, ms).failure_kind(),
            Some(FailureKind::Aborted)
        );
    }
}
