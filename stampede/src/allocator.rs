//! Deterministic client to credential mapping.
//!
//! Client `i` always gets `pool[i - 1]`. The mapping is a pure lookup, so workers never
//! coordinate to obtain an identity.
use crate::error::RaceError;
use crate::pool::CredentialPool;
use stampede_core::{ClientId, Credential};
use std::num::NonZeroUsize;

pub fn allocate(client: ClientId, pool: &CredentialPool) -> Result<&Credential, RaceError> {
    pool.get(client.index()).ok_or(RaceError::IndexOutOfRange {
        client,
        available: pool.len(),
    })
}

/// Checked once before launch: every client in `1..=clients` must map to a distinct credential.
pub fn check_capacity(pool: &CredentialPool, clients: NonZeroUsize) -> Result<(), RaceError> {
    if pool.len() < clients.get() {
        return Err(RaceError::InsufficientPool {
            required: clients.get(),
            available: pool.len(),
        });
    }

    if let Some((first, second)) = pool.find_duplicate(clients.get()) {
        if let (Some(first), Some(second)) = (ClientId::new(first + 1), ClientId::new(second + 1))
        {
            return Err(RaceError::DuplicateCredential { first, second });
        }
    }

    Ok(())
}
