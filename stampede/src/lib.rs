#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod allocator;
pub mod classifier;
pub mod error;
pub mod pool;
pub mod scenario;
pub mod transaction;
pub mod transport;
pub mod verdict;

pub use error::RaceError;
pub use scenario::RaceScenario;
pub use stampede_core as types;

pub mod prelude {
    pub use crate::error::RaceError;
    pub use crate::pool::CredentialPool;
    pub use crate::scenario::{RacePhase, RaceScenario};
    pub use crate::transport::{HttpTransport, Transport};

    pub use stampede_core::{
        Classification, ClientId, Credential, LatencyThreshold, RaceConfig, RequestOutcome,
        RunResult, StatusSet, TransportError, Verdict,
    };
}
