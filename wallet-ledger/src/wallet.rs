//! Wallet factory
//!
//! New wallets get 32 bytes from the OS random source as their address and
//! a fixed opening balance. The store's uniqueness check is what actually
//! prevents collisions; the factory only regenerates and retries.

use crate::{
    metrics::Metrics,
    storage::Storage,
    types::{Address, Wallet, ADDRESS_BYTES},
    Error, Result,
};
use rand::{rngs::OsRng, RngCore};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Source of fresh wallet addresses
pub trait AddressSource: Send + Sync {
    /// Produce the next candidate address
    fn next_address(&self) -> Address;
}

/// Addresses from the operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngAddressSource;

impl AddressSource for OsRngAddressSource {
    fn next_address(&self) -> Address {
        let mut bytes = [0u8; ADDRESS_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Address::from_bytes(&bytes)
    }
}

/// Mints wallets into the store
pub struct WalletFactory {
    storage: Arc<Storage>,
    addresses: Arc<dyn AddressSource>,
    initial_balance: Decimal,
    max_attempts: u32,
    metrics: Option<Metrics>,
}

impl WalletFactory {
    /// Create a factory using OS randomness
    pub fn new(storage: Arc<Storage>, initial_balance: Decimal, max_attempts: u32) -> Self {
        Self {
            storage,
            addresses: Arc::new(OsRngAddressSource),
            initial_balance,
            max_attempts: max_attempts.max(1),
            metrics: None,
        }
    }

    /// Replace the address source
    pub fn with_address_source(mut self, addresses: Arc<dyn AddressSource>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Count created wallets in the given metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Create one wallet with a fresh address and the opening balance
    pub fn create_wallet(&self) -> Result<Wallet> {
        for attempt in 1..=self.max_attempts {
            let wallet = Wallet::new(self.addresses.next_address(), self.initial_balance);

            match self.storage.create_wallet(&wallet) {
                Ok(()) => {
                    if let Some(ref metrics) = self.metrics {
                        metrics.record_wallet_created();
                    }
                    tracing::info!(address = %wallet.address, balance = %wallet.balance, "Wallet created");
                    return Ok(wallet);
                }
                Err(Error::DuplicateAddress(address)) => {
                    tracing::warn!(%address, attempt, "Generated address already taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::error!(attempts = self.max_attempts, "Could not generate a free wallet address");
        Err(Error::AddressSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Create `count` wallets one after another
    ///
    /// Stops at the first failure; wallets created before it are kept.
    pub fn initialize_wallets(&self, count: usize) -> Result<Vec<Wallet>> {
        let mut wallets = Vec::with_capacity(count);
        for index in 0..count {
            let wallet = self.create_wallet().map_err(|source| {
                tracing::error!(index, error = %source, "Wallet seeding stopped");
                Error::SeedingFailed {
                    index,
                    source: Box::new(source),
                }
            })?;
            wallets.push(wallet);
        }
        tracing::info!(count, "Wallets initialized");
        Ok(wallets)
    }

    /// Seed `count` wallets only if the store holds none
    pub fn seed_if_empty(&self, count: usize) -> Result<Vec<Wallet>> {
        let existing = self.storage.count_wallets()?;
        if existing > 0 {
            tracing::debug!(existing, "Store already has wallets, skipping seeding");
            return Ok(Vec::new());
        }
        tracing::info!(count, "No wallets found, seeding");
        self.initialize_wallets(count)
    }
}
