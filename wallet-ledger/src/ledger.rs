//! Main ledger orchestration layer
//!
//! This module ties together storage, locking, transfers, wallet creation
//! and queries into the API used by the outer (HTTP/CLI) layer.
//!
//! # Example
//!
//! ```no_run
//! use wallet_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let alice = ledger.create_wallet()?;
//!     let bob = ledger.create_wallet()?;
//!     ledger
//!         .transfer(alice.address.as_str(), bob.address.as_str(), "30.00")
//!         .await?;
//!
//!     assert_eq!(ledger.get_balance(alice.address.as_str())?, "70.00");
//!     Ok(())
//! }
//! ```

use crate::{
    locks::WalletLocks,
    metrics::Metrics,
    query::QueryService,
    storage::{Storage, StorageStats},
    transfer::TransferEngine,
    types::{TransactionRecord, Wallet},
    wallet::{AddressSource, WalletFactory},
    Config, Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::Duration;

/// Main ledger interface
pub struct Ledger {
    /// Shared store handle
    storage: Arc<Storage>,

    /// Transfer engine
    transfers: TransferEngine,

    /// Wallet factory
    wallets: WalletFactory,

    /// Read paths
    queries: QueryService,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        let transfers = TransferEngine::new(
            storage.clone(),
            Arc::new(WalletLocks::new()),
            Duration::from_millis(config.transfer.lock_timeout_ms),
        )
        .with_metrics(metrics.clone());

        let wallets = WalletFactory::new(
            storage.clone(),
            config.wallets.initial_balance,
            config.wallets.max_address_attempts,
        )
        .with_metrics(metrics.clone());

        let queries = QueryService::new(storage.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            data_dir = ?config.data_dir,
            "Ledger opened"
        );

        Ok(Self {
            storage,
            transfers,
            wallets,
            queries,
            metrics,
            config,
        })
    }

    /// Replace the wallet address source
    pub fn with_address_source(mut self, addresses: Arc<dyn AddressSource>) -> Self {
        self.wallets = self.wallets.with_address_source(addresses);
        self
    }

    /// Create a wallet with a fresh address and the configured opening balance
    pub fn create_wallet(&self) -> Result<Wallet> {
        self.wallets.create_wallet()
    }

    /// Balance as a decimal string with two fractional digits
    pub fn get_balance(&self, address: &str) -> Result<String> {
        Ok(self.queries.get_balance(address)?.to_string())
    }

    /// Move funds between two wallets
    pub async fn transfer(&self, from: &str, to: &str, amount: &str) -> Result<TransactionRecord> {
        self.transfers.transfer(from, to, amount).await
    }

    /// Latest `n` ledger entries, newest first; `n <= 0` returns all
    pub fn list_recent_transactions(&self, n: i64) -> Result<Vec<TransactionRecord>> {
        self.queries.list_recent(n)
    }

    /// Create `n` wallets; stops at the first failure
    pub fn initialize_wallets(&self, n: usize) -> Result<()> {
        self.wallets.initialize_wallets(n).map(|_| ())
    }

    /// Seed the configured number of wallets if the store is empty
    pub fn seed_if_empty(&self) -> Result<Vec<Wallet>> {
        self.wallets.seed_if_empty(self.config.wallets.seed_count)
    }

    /// Latest `n` entries involving one wallet
    pub fn wallet_history(&self, address: &str, n: i64) -> Result<Vec<TransactionRecord>> {
        self.queries.wallet_history(address, n)
    }

    /// Every wallet
    pub fn list_wallets(&self) -> Result<Vec<Wallet>> {
        self.queries.list_wallets()
    }

    /// Number of wallets
    pub fn count_wallets(&self) -> Result<u64> {
        self.queries.count_wallets()
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> Result<Decimal> {
        self.queries.total_balance()
    }

    /// Check money conservation
    ///
    /// Compares the sum of balances with the total of every opening balance
    /// the store has issued, whatever the configuration was at the time.
    pub fn check_money_conservation(&self) -> Result<Decimal> {
        let expected = self.storage.total_minted()?;
        self.queries.check_conservation(expected)
    }

    /// Store statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub fn shutdown(self) -> Result<()> {
        let Self {
            storage,
            transfers,
            wallets,
            queries,
            ..
        } = self;
        // Components hold clones of the store handle
        drop((transfers, wallets, queries));

        match Arc::try_unwrap(storage) {
            Ok(storage) => storage.close(),
            Err(_) => {
                tracing::warn!("Store handle still shared, skipping explicit close");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.rocksdb.sync_writes = false;

        (Ledger::open(config).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_ledger_open() {
        let (ledger, _temp) = create_test_ledger();
        assert_eq!(ledger.count_wallets().unwrap(), 0);
        ledger.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_boundary_round_trip() {
        let (ledger, _temp) = create_test_ledger();

        let a = ledger.create_wallet().unwrap();
        let b = ledger.create_wallet().unwrap();
        assert_eq!(ledger.get_balance(a.address.as_str()).unwrap(), "100.00");

        let record = ledger
            .transfer(a.address.as_str(), b.address.as_str(), "30.00")
            .await
            .unwrap();

        assert_eq!(ledger.get_balance(a.address.as_str()).unwrap(), "70.00");
        assert_eq!(ledger.get_balance(b.address.as_str()).unwrap(), "130.00");
        assert_eq!(ledger.list_recent_transactions(10).unwrap(), vec![record.clone()]);
        assert_eq!(ledger.wallet_history(b.address.as_str(), 0).unwrap(), vec![record]);
        assert_eq!(ledger.check_money_conservation().unwrap().to_string(), "200.00");
        assert_eq!(ledger.metrics().transfers_total.get(), 1);
        assert_eq!(ledger.metrics().wallets_created.get(), 2);

        ledger.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_initialize_and_seed() {
        let (ledger, _temp) = create_test_ledger();

        ledger.initialize_wallets(3).unwrap();
        assert_eq!(ledger.count_wallets().unwrap(), 3);
        // Not empty any more
        assert!(ledger.seed_if_empty().unwrap().is_empty());
        assert_eq!(
            ledger.stats().unwrap(),
            StorageStats {
                total_wallets: 3,
                total_transactions: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_reopen_preserves_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let (a, b) = {
            let ledger = Ledger::open(config.clone()).unwrap();
            let a = ledger.create_wallet().unwrap();
            let b = ledger.create_wallet().unwrap();
            ledger
                .transfer(a.address.as_str(), b.address.as_str(), "12.34")
                .await
                .unwrap();
            ledger.shutdown().unwrap();
            (a, b)
        };

        let ledger = Ledger::open(config).unwrap();
        assert_eq!(ledger.get_balance(a.address.as_str()).unwrap(), "87.66");
        assert_eq!(ledger.get_balance(b.address.as_str()).unwrap(), "112.34");
        let next = ledger
            .transfer(b.address.as_str(), a.address.as_str(), "0.34")
            .await
            .unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(ledger.list_recent_transactions(0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conservation_survives_initial_balance_change() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.rocksdb.sync_writes = false;

        {
            let ledger = Ledger::open(config.clone()).unwrap();
            ledger.initialize_wallets(2).unwrap();
            ledger.shutdown().unwrap();
        }

        config.wallets.initial_balance = Decimal::new(5000, 2);
        let ledger = Ledger::open(config).unwrap();
        assert_eq!(ledger.check_money_conservation().unwrap().to_string(), "200.00");

        let wallet = ledger.create_wallet().unwrap();
        assert_eq!(wallet.balance.to_string(), "50.00");
        let wallets = ledger.list_wallets().unwrap();
        ledger
            .transfer(wallets[0].address.as_str(), wallets[1].address.as_str(), "12.50")
            .await
            .unwrap();
        assert_eq!(ledger.check_money_conservation().unwrap().to_string(), "250.00");
    }
}
