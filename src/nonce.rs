//! Nonce management for the Kanban ledger account
//!
//! The nonce is read from the ledger right before each submission. The
//! ledger may lag behind a transaction the bridge already accepted, so the
//! manager also remembers the last accepted nonce per address and never
//! hands out a value at or below it.
//!
//! The manager does not queue. Callers hold the address's
//! [`SubmissionLocks`] guard from the nonce read until `advance`.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::Result;
use crate::gateway::ChainGateway;

pub struct NonceManager {
    ledger: Arc<dyn ChainGateway>,
    accepted: Mutex<HashMap<Address, u64>>,
}

impl NonceManager {
    pub fn new(ledger: Arc<dyn ChainGateway>) -> Self {
        Self {
            ledger,
            accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Nonce for the next submission from `address`
    pub async fn current_nonce(&self, address: Address) -> Result<u64> {
        let remote = self
            .ledger
            .get_transaction_count(&address.to_string())
            .await?;

        let accepted = self.accepted.lock().await;
        match accepted.get(&address) {
            Some(&last) if last >= remote => {
                debug!(
                    address = %address,
                    remote,
                    last_accepted = last,
                    "Ledger nonce lags accepted submissions"
                );
                Ok(last + 1)
            }
            _ => Ok(remote),
        }
    }

    /// Record that the bridge accepted a submission using `used`
    pub async fn advance(&self, address: Address, used: u64) {
        let mut accepted = self.accepted.lock().await;
        let entry = accepted.entry(address).or_insert(used);
        if used > *entry {
            *entry = used;
        }
        debug!(address = %address, nonce = used, "Nonce advanced");
    }

    pub async fn last_accepted(&self, address: Address) -> Option<u64> {
        self.accepted.lock().await.get(&address).copied()
    }
}

/// Per-address submission serialization
#[derive(Default)]
pub struct SubmissionLocks {
    locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `address`; released when the guard drops
    pub async fn acquire(&self, address: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(address).or_default().clone()
        };
        lock.lock_owned().await
    }
}
