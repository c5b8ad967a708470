//! Configuration for the wallet ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Transfer engine configuration
    pub transfer: TransferConfig,

    /// Wallet factory configuration
    pub wallets: WalletConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallet-ledger"),
            service_name: "wallet-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            transfer: TransferConfig::default(),
            wallets: WalletConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,

    /// fsync the WAL before a write returns
    pub sync_writes: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
            sync_writes: true,
        }
    }
}

/// Transfer engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Upper bound on waiting for both wallet locks (milliseconds)
    pub lock_timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
        }
    }
}

/// Wallet factory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Opening balance of every new wallet
    #[serde(with = "rust_decimal::serde::str")]
    pub initial_balance: Decimal,

    /// Wallets created at startup when the store is empty
    pub seed_count: usize,

    /// Address generations tried before giving up
    pub max_address_attempts: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::new(10000, 2), // 100.00
            seed_count: 10,
            max_address_attempts: 3,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("WALLET_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(timeout) = std::env::var("WALLET_LEDGER_LOCK_TIMEOUT_MS") {
            config.transfer.lock_timeout_ms = timeout.parse().map_err(|e| {
                crate::Error::Config(format!("WALLET_LEDGER_LOCK_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(count) = std::env::var("WALLET_LEDGER_SEED_COUNT") {
            config.wallets.seed_count = count
                .parse()
                .map_err(|e| crate::Error::Config(format!("WALLET_LEDGER_SEED_COUNT: {}", e)))?;
        }

        if let Ok(balance) = std::env::var("WALLET_LEDGER_INITIAL_BALANCE") {
            config.wallets.initial_balance = balance.parse().map_err(|e| {
                crate::Error::Config(format!("WALLET_LEDGER_INITIAL_BALANCE: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.wallets.initial_balance < Decimal::ZERO {
            return Err(crate::Error::Config(
                "initial_balance must not be negative".to_string(),
            ));
        }
        if self.wallets.initial_balance.normalize().scale() > crate::types::MONEY_SCALE {
            return Err(crate::Error::Config(
                "initial_balance has more than two fractional digits".to_string(),
            ));
        }
        if self.wallets.max_address_attempts == 0 {
            return Err(crate::Error::Config(
                "max_address_attempts must be at least 1".to_string(),
            ));
        }
        if self.transfer.lock_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "lock_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
