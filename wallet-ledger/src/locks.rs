//! Per-wallet exclusive locks
//!
//! Two transfers that share a wallet must not interleave their
//! read-check-write sequences. Each address owns one async mutex, created on
//! first use. A transfer locks both participants in ascending address order,
//! so `A -> B` and `B -> A` running at once queue up on the same first lock
//! instead of deadlocking.

use crate::{types::Address, Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};

/// Lock table keyed by wallet address
#[derive(Debug, Default)]
pub struct WalletLocks {
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

/// Both wallet locks of one transfer; released on drop
#[derive(Debug)]
pub struct PairGuard {
    _first: OwnedMutexGuard<()>,
    _second: OwnedMutexGuard<()>,
}

impl WalletLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, address: &Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Lock two distinct wallets in address order, waiting at most `wait`
    pub async fn acquire_pair(
        &self,
        a: &Address,
        b: &Address,
        wait: Duration,
    ) -> Result<PairGuard> {
        if a == b {
            return Err(Error::SelfTransfer(a.to_string()));
        }

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock_for(low);
        let second = self.lock_for(high);

        let acquire = async move {
            let first = first.lock_owned().await;
            let second = second.lock_owned().await;
            PairGuard {
                _first: first,
                _second: second,
            }
        };

        timeout(wait, acquire).await.map_err(|_| {
            tracing::warn!(first = %low, second = %high, wait_ms = wait.as_millis() as u64, "Wallet lock wait timed out");
            Error::LockTimeout {
                timeout_ms: wait.as_millis() as u64,
            }
        })
    }

    /// Lock a single wallet, waiting at most `wait`
    #[cfg(test)]
    pub(crate) async fn acquire(
        &self,
        address: &Address,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<()>> {
        let lock = self.lock_for(address);
        timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| Error::LockTimeout {
                timeout_ms: wait.as_millis() as u64,
            })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}
