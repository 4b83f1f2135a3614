use stampede_core::{ClientId, ConfigError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a race before a verdict is reached.
///
/// Per-client problems (transport failures, unexpected statuses, timeouts) never show up here;
/// they are recorded as outcomes and counted against the verdict instead.
#[derive(Debug, Error)]
pub enum RaceError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential pool `{}` could not be read: {source}", path.display())]
    PoolUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential pool holds {available} entries but {required} clients are configured")]
    InsufficientPool { required: usize, available: usize },

    #[error("Clients {first} and {second} would share the same credential")]
    DuplicateCredential { first: ClientId, second: ClientId },

    #[error("Client {client} has no credential in a pool of {available}")]
    IndexOutOfRange { client: ClientId, available: usize },

    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),
}
