use stampede_core::{
    validate_status_sets, Classification, ConfigError, RaceConfig, StatusSet, TransportError,
};

/// Per-response decision against the expected outcome sets. Holds no state between responses.
#[derive(Clone, Debug)]
pub struct Classifier {
    accepted: StatusSet,
    rejected: StatusSet,
}

impl Classifier {
    pub fn new(accepted: StatusSet, rejected: StatusSet) -> Result<Self, ConfigError> {
        validate_status_sets(&accepted, &rejected)?;
        Ok(Self { accepted, rejected })
    }

    pub fn from_config(config: &RaceConfig) -> Result<Self, ConfigError> {
        Self::new(config.accepted.clone(), config.rejected.clone())
    }

    pub fn classify(&self, status: u16) -> Classification {
        if self.accepted.contains(status) {
            Classification::Accepted
        } else if self.rejected.contains(status) {
            Classification::ExpectedRejection
        } else {
            Classification::UnexpectedFailure
        }
    }

    pub fn classify_result(&self, result: &Result<u16, TransportError>) -> Classification {
        match result {
            Ok(status) => self.classify(*status),
            Err(_) => Classification::UnexpectedFailure,
        }
    }
}
