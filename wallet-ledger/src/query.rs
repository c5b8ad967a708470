//! Read-only projections over the store

use crate::{
    storage::Storage,
    types::{Address, TransactionRecord, Wallet},
    Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Balance and history lookups
pub struct QueryService {
    storage: Arc<Storage>,
}

impl QueryService {
    /// Create a query service over a store handle
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Current balance of a wallet
    pub fn get_balance(&self, address: &str) -> Result<Decimal> {
        Ok(self.storage.get_wallet(&Address::new(address))?.balance)
    }

    /// Latest `n` ledger entries, newest first; `n <= 0` returns the full log
    pub fn list_recent(&self, n: i64) -> Result<Vec<TransactionRecord>> {
        self.storage.list_recent_transactions(n)
    }

    /// Latest `n` entries sent or received by one wallet
    pub fn wallet_history(&self, address: &str, n: i64) -> Result<Vec<TransactionRecord>> {
        let address = Address::new(address);
        if self.storage.find_wallet(&address)?.is_none() {
            return Err(Error::WalletNotFound(address.to_string()));
        }
        self.storage.list_wallet_transactions(&address, n)
    }

    /// Every wallet in address order
    pub fn list_wallets(&self) -> Result<Vec<Wallet>> {
        self.storage.list_wallets()
    }

    /// Number of wallets
    pub fn count_wallets(&self) -> Result<u64> {
        self.storage.count_wallets()
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> Result<Decimal> {
        Ok(self
            .storage
            .list_wallets()?
            .iter()
            .map(|w| w.balance)
            .sum())
    }

    /// Check money conservation against the total minted at creation
    ///
    /// Transfers only move value, so the sum of balances must equal
    /// `wallet count * opening balance` for a store seeded with one fixed
    /// opening balance. Returns the observed total on success.
    pub fn check_conservation(&self, expected_total: Decimal) -> Result<Decimal> {
        let total = self.total_balance()?;
        if total != expected_total {
            tracing::error!(%total, expected = %expected_total, "Money conservation violated");
            return Err(Error::InvariantViolation(format!(
                "total balance {} differs from expected {}",
                total, expected_total
            )));
        }
        Ok(total)
    }
}
