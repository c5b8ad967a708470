//! Transfer engine
//!
//! Moves value between two wallets as one atomic unit:
//!
//! 1. Validate the request (amount, self-transfer, both wallets exist,
//!    sufficient funds). Nothing is locked or written yet.
//! 2. Lock both wallets in address order, bounded by the lock timeout.
//! 3. Re-read both wallets under the locks and re-check funds; a concurrent
//!    transfer may have drained the sender since step 1.
//! 4. Commit both balances and the ledger entry in one store batch. The
//!    write runs on the blocking pool while the locks stay held.
//!
//! A failure anywhere leaves balances and the log exactly as they were.

use crate::{
    locks::WalletLocks,
    metrics::Metrics,
    storage::Storage,
    types::{parse_amount, Address, TransactionRecord, Wallet},
    Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

/// Drives single transfers against the store
pub struct TransferEngine {
    storage: Arc<Storage>,
    locks: Arc<WalletLocks>,
    lock_timeout: Duration,
    metrics: Option<Metrics>,
}

impl TransferEngine {
    /// Create an engine over a store handle
    pub fn new(storage: Arc<Storage>, locks: Arc<WalletLocks>, lock_timeout: Duration) -> Self {
        Self {
            storage,
            locks,
            lock_timeout,
            metrics: None,
        }
    }

    /// Record outcomes in the given metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Move `amount` from one wallet to another
    ///
    /// Returns the committed ledger entry. Only [`Error::LockTimeout`] is
    /// worth retrying.
    pub async fn transfer(&self, from: &str, to: &str, amount: &str) -> Result<TransactionRecord> {
        let started = Instant::now();
        let result = self.execute(from, to, amount).await;

        match &result {
            Ok(record) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_transfer(started.elapsed().as_secs_f64());
                }
                tracing::info!(
                    id = record.id,
                    from = %record.from,
                    to = %record.to,
                    amount = %record.amount,
                    "Transfer committed"
                );
            }
            Err(err) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_transfer_failure(err.kind());
                }
                if err.is_retryable() {
                    tracing::warn!(from, to, amount, error = %err, "Transfer not applied, retryable");
                } else {
                    tracing::info!(from, to, amount, kind = err.kind(), error = %err, "Transfer rejected");
                }
            }
        }

        result
    }

    async fn execute(&self, from: &str, to: &str, amount: &str) -> Result<TransactionRecord> {
        let amount = parse_amount(amount)?;

        if from == to {
            return Err(Error::SelfTransfer(from.to_string()));
        }

        let from = Address::new(from);
        let to = Address::new(to);

        let sender = self.load_sender(&from)?;
        self.load_recipient(&to)?;
        ensure_funds(&sender, amount)?;

        let _guard = self
            .locks
            .acquire_pair(&from, &to, self.lock_timeout)
            .await?;

        // Balances read before the locks may be stale
        let sender = self.load_sender(&from)?;
        let recipient = self.load_recipient(&to)?;
        ensure_funds(&sender, amount)?;

        let new_from = sender.balance.checked_sub(amount).ok_or_else(|| {
            Error::InvariantViolation(format!("debit of {} overflowed for {}", amount, from))
        })?;
        let new_to = recipient.balance.checked_add(amount).ok_or_else(|| {
            Error::InvalidAmount(format!("{} would overflow the balance of {}", amount, to))
        })?;

        let storage = self.storage.clone();
        let debited = Wallet::new(from, new_from);
        let credited = Wallet::new(to, new_to);
        tokio::task::spawn_blocking(move || storage.apply_transfer(&debited, &credited, amount))
            .await
            .map_err(|e| Error::StoreUnavailable(format!("commit task failed: {}", e)))?
    }

    fn load_sender(&self, address: &Address) -> Result<Wallet> {
        self.find(address)?
            .ok_or_else(|| Error::SenderNotFound(address.to_string()))
    }

    fn load_recipient(&self, address: &Address) -> Result<Wallet> {
        self.find(address)?
            .ok_or_else(|| Error::RecipientNotFound(address.to_string()))
    }

    // Only generated addresses can name a wallet
    fn find(&self, address: &Address) -> Result<Option<Wallet>> {
        if !address.is_well_formed() {
            return Ok(None);
        }
        self.storage.find_wallet(address)
    }
}

fn ensure_funds(sender: &Wallet, amount: Decimal) -> Result<()> {
    if sender.balance < amount {
        return Err(Error::InsufficientFunds {
            available: sender.balance,
            requested: amount,
        });
    }
    Ok(())
}
