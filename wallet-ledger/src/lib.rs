//! Wallet Ledger
//!
//! Funds-transfer ledger engine: wallet balances and the atomic movement of
//! value between them.
//!
//! # Architecture
//!
//! - **Ledger Store**: RocksDB column families for wallets, the append-only
//!   transaction log and its indices; one `WriteBatch` per mutation
//! - **Transfer Engine**: validate, lock both wallets, re-read, debit, credit,
//!   append, all-or-nothing
//! - **Wallet Factory**: random 32-byte addresses, fixed opening balance
//! - **Query Service**: balances, recent transactions, per-wallet history
//!
//! # Invariants
//!
//! - Money conservation: transfers never change the sum of balances
//! - Non-negative balances
//! - Append-only: transaction records are never modified or deleted
//! - Transfers sharing a wallet are serialised; locks are taken in address
//!   order so they cannot deadlock

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod metrics;
pub mod query;
pub mod storage;
pub mod transfer;
pub mod types;
pub mod wallet;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{Address, TransactionRecord, Wallet};
