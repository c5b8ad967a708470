//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet rows (key: address)
//! - `transactions` - Append-only transfer log (key: id, big-endian)
//! - `indices` - Per-wallet index (key: address || '|' || id)
//! - `timeline` - Commit-time index (key: created_at nanos || id)
//! - `meta` - Counters (wallet count, total minted)
//!
//! Every mutation is a single `WriteBatch`, so readers see either all of a
//! transfer or none of it.

use crate::{
    error::{Error, Result},
    types::{Address, TransactionRecord, Wallet, MONEY_SCALE},
    Config,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode,
    Options, WriteBatch, WriteOptions, DB,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";
const CF_TIMELINE: &str = "timeline";
const CF_META: &str = "meta";

const KEY_WALLET_COUNT: &[u8] = b"wallet_count";
const KEY_TOTAL_MINTED: &[u8] = b"total_minted";
const ID_BYTES: usize = 8;
const INDEX_SEPARATOR: u8 = b'|';

/// Next id and the timestamp floor for the following commit
#[derive(Debug)]
struct Sequence {
    next_id: u64,
    last_created_at: Option<DateTime<Utc>>,
}

impl Sequence {
    /// Commit timestamps never go backwards, even if the wall clock does
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_created_at {
            Some(last) if now < last => last,
            _ => now,
        }
    }

    fn advance(&mut self, record: &TransactionRecord) {
        self.next_id = record.id + 1;
        self.last_created_at = Some(record.created_at);
    }
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    sync_writes: bool,
    // Makes the exists-check in create_wallet authoritative
    wallet_insert: Mutex<()>,
    // Held across id assignment and the commit write
    sequence: Mutex<Sequence>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .field("sync_writes", &self.sync_writes)
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_compaction_style(DBCompactionStyle::Level);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_TIMELINE, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let mut storage = Self {
            db: Arc::new(db),
            sync_writes: config.rocksdb.sync_writes,
            wallet_insert: Mutex::new(()),
            sequence: Mutex::new(Sequence {
                next_id: 1,
                last_created_at: None,
            }),
        };

        if let Some(last) = storage.last_transaction()? {
            storage.sequence.get_mut().advance(&last);
        }

        tracing::info!(
            path = ?path,
            next_transaction_id = storage.sequence.lock().next_id,
            "Opened wallet store"
        );

        Ok(storage)
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Point lookups by address on every transfer
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::StoreUnavailable(format!("Column family {} not found", name)))
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }

    // Wallet operations

    /// Get wallet by address, `None` if absent
    pub fn find_wallet(&self, address: &Address) -> Result<Option<Wallet>> {
        let cf = self.cf(CF_WALLETS)?;
        match self.db.get_pinned_cf(&cf, address.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get wallet by address
    pub fn get_wallet(&self, address: &Address) -> Result<Wallet> {
        self.find_wallet(address)?
            .ok_or_else(|| Error::WalletNotFound(address.to_string()))
    }

    /// Insert a new wallet; the address must not exist yet
    ///
    /// The opening balance is added to the minted total in the same batch.
    pub fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        check_balance(wallet)?;

        let cf_wallets = self.cf(CF_WALLETS)?;
        let cf_meta = self.cf(CF_META)?;
        let key = wallet.address.as_str().as_bytes();

        let _guard = self.wallet_insert.lock();

        if self.db.get_pinned_cf(&cf_wallets, key)?.is_some() {
            return Err(Error::DuplicateAddress(wallet.address.to_string()));
        }

        let count = self.count_wallets()?;
        let minted = self
            .total_minted()?
            .checked_add(wallet.balance)
            .ok_or_else(|| Error::InvariantViolation("minted total overflowed".to_string()))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_wallets, key, bincode::serialize(wallet)?);
        batch.put_cf(&cf_meta, KEY_WALLET_COUNT, (count + 1).to_be_bytes());
        batch.put_cf(&cf_meta, KEY_TOTAL_MINTED, minted.to_string());
        self.db.write_opt(batch, &self.write_options())?;

        tracing::debug!(address = %wallet.address, balance = %wallet.balance, "Wallet stored");

        Ok(())
    }

    /// Overwrite an existing wallet's balance
    ///
    /// The caller must hold the wallet's lock; transfers go through
    /// [`Storage::apply_transfer`] instead.
    pub fn save_wallet(&self, wallet: &Wallet) -> Result<()> {
        let cf = self.cf(CF_WALLETS)?;
        let key = wallet.address.as_str().as_bytes();

        if self.db.get_pinned_cf(&cf, key)?.is_none() {
            return Err(Error::WalletNotFound(wallet.address.to_string()));
        }
        check_balance(wallet)?;

        self.db
            .put_cf_opt(&cf, key, bincode::serialize(wallet)?, &self.write_options())?;

        Ok(())
    }

    /// Number of wallets ever created
    pub fn count_wallets(&self) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        match self.db.get_pinned_cf(&cf, KEY_WALLET_COUNT)? {
            Some(value) => decode_u64(&value),
            None => Ok(0),
        }
    }

    /// Sum of every opening balance ever issued
    ///
    /// Transfers only move value, so this is what the balances must add up to.
    pub fn total_minted(&self) -> Result<Decimal> {
        let cf = self.cf(CF_META)?;
        match self.db.get_pinned_cf(&cf, KEY_TOTAL_MINTED)? {
            Some(value) => std::str::from_utf8(&value)
                .ok()
                .and_then(|raw| Decimal::from_str(raw).ok())
                .ok_or_else(|| Error::InvariantViolation("malformed minted total".to_string())),
            None => Ok(Decimal::ZERO),
        }
    }

    /// All wallets in address order
    pub fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let cf = self.cf(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            wallets.push(bincode::deserialize(&value)?);
        }
        Ok(wallets)
    }

    // Transaction operations

    /// Append a ledger entry without touching balances
    pub fn append_transaction(
        &self,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<TransactionRecord> {
        self.commit(from, to, amount, &[])
    }

    /// Persist both updated wallets and the ledger entry as one unit
    ///
    /// `from` and `to` carry the balances after the transfer.
    pub fn apply_transfer(
        &self,
        from: &Wallet,
        to: &Wallet,
        amount: Decimal,
    ) -> Result<TransactionRecord> {
        if from.address == to.address {
            return Err(Error::SelfTransfer(from.address.to_string()));
        }
        check_balance(from)?;
        check_balance(to)?;

        self.commit(&from.address, &to.address, amount, &[from, to])
    }

    fn commit(
        &self,
        from: &Address,
        to: &Address,
        amount: Decimal,
        wallets: &[&Wallet],
    ) -> Result<TransactionRecord> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount.to_string()));
        }

        let cf_wallets = self.cf(CF_WALLETS)?;
        let cf_transactions = self.cf(CF_TRANSACTIONS)?;
        let cf_indices = self.cf(CF_INDICES)?;
        let cf_timeline = self.cf(CF_TIMELINE)?;

        let mut sequence = self.sequence.lock();

        let record = TransactionRecord {
            id: sequence.next_id,
            from: from.clone(),
            to: to.clone(),
            amount,
            created_at: sequence.stamp(Utc::now()),
        };

        let mut batch = WriteBatch::default();

        // 1. Balances
        for wallet in wallets {
            batch.put_cf(
                &cf_wallets,
                wallet.address.as_str().as_bytes(),
                bincode::serialize(wallet)?,
            );
        }

        // 2. Ledger entry
        batch.put_cf(
            &cf_transactions,
            record.id.to_be_bytes(),
            bincode::serialize(&record)?,
        );

        // 3. Indices
        batch.put_cf(&cf_indices, index_key(&record.from, record.id), b"");
        batch.put_cf(&cf_indices, index_key(&record.to, record.id), b"");
        batch.put_cf(&cf_timeline, timeline_key(&record), b"");

        // Atomic commit
        self.db.write_opt(batch, &self.write_options())?;
        sequence.advance(&record);

        tracing::debug!(
            id = record.id,
            from = %record.from,
            to = %record.to,
            amount = %record.amount,
            "Transaction committed"
        );

        Ok(record)
    }

    /// Get transaction by id
    pub fn get_transaction(&self, id: u64) -> Result<Option<TransactionRecord>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        match self.db.get_pinned_cf(&cf, id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Newest first by commit time, ties by id; `limit <= 0` returns everything
    pub fn list_recent_transactions(&self, limit: i64) -> Result<Vec<TransactionRecord>> {
        let cf = self.cf(CF_TIMELINE)?;
        let max = usize::try_from(limit).ok().filter(|n| *n > 0);

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            if max.is_some_and(|max| records.len() >= max) {
                break;
            }
            let (key, _) = item?;
            let id = decode_u64(key.get(ID_BYTES..).unwrap_or_default())?;
            records.push(self.load_transaction(id)?);
        }
        Ok(records)
    }

    /// Transfers sent or received by one wallet, newest first
    pub fn list_wallet_transactions(
        &self,
        address: &Address,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>> {
        let cf = self.cf(CF_INDICES)?;
        let max = usize::try_from(limit).ok().filter(|n| *n > 0);

        let mut prefix = address.as_str().as_bytes().to_vec();
        prefix.push(INDEX_SEPARATOR);
        // First key past every `address|id` entry
        let mut upper = address.as_str().as_bytes().to_vec();
        upper.push(INDEX_SEPARATOR + 1);

        let mut records = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(upper.as_slice(), Direction::Reverse));
        for item in iter {
            if max.is_some_and(|max| records.len() >= max) {
                break;
            }
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                if &key[..] < prefix.as_slice() {
                    break;
                }
                continue;
            }
            // Longer suffix: entry of an address that extends this one with '|'
            let suffix = &key[prefix.len()..];
            if suffix.len() != ID_BYTES {
                continue;
            }
            let id = decode_u64(suffix)?;
            records.push(self.load_transaction(id)?);
        }
        Ok(records)
    }

    fn load_transaction(&self, id: u64) -> Result<TransactionRecord> {
        self.get_transaction(id)?.ok_or_else(|| {
            Error::InvariantViolation(format!("index points at missing transaction {}", id))
        })
    }

    fn last_transaction(&self) -> Result<Option<TransactionRecord>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        if let Some(item) = self.db.iterator_cf(&cf, IteratorMode::End).next() {
            let (_, value) = item?;
            return Ok(Some(bincode::deserialize(&value)?));
        }
        Ok(None)
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_wallets: self.count_wallets()?,
            total_transactions: self.sequence.lock().next_id - 1,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Wallets created
    pub total_wallets: u64,
    /// Ledger entries committed
    pub total_transactions: u64,
}

/// Stored balances are non-negative and carry exactly two decimals
fn check_balance(wallet: &Wallet) -> Result<()> {
    if wallet.balance < Decimal::ZERO {
        return Err(Error::InvariantViolation(format!(
            "negative balance {} for {}",
            wallet.balance, wallet.address
        )));
    }
    if wallet.balance.scale() != MONEY_SCALE {
        return Err(Error::InvariantViolation(format!(
            "balance {} for {} is not scaled to {} decimals",
            wallet.balance, wallet.address, MONEY_SCALE
        )));
    }
    Ok(())
}

// Key helpers

fn index_key(address: &Address, id: u64) -> Vec<u8> {
    let mut key = address.as_str().as_bytes().to_vec();
    key.push(INDEX_SEPARATOR);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn timeline_key(record: &TransactionRecord) -> Vec<u8> {
    let nanos = record.created_at.timestamp_nanos_opt().unwrap_or(i64::MAX);
    // Flip the sign bit so negative timestamps sort first
    let ordered = (nanos as u64) ^ (1 << 63);
    let mut key = ordered.to_be_bytes().to_vec();
    key.extend_from_slice(&record.id.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::InvariantViolation(format!("malformed key of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, ADDRESS_BYTES};
    use crate::Config;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn wallet(seed: u8, cents: i64) -> Wallet {
        Wallet::new(
            Address::from_bytes(&[seed; ADDRESS_BYTES]),
            Decimal::new(cents, 2),
        )
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_WALLETS).is_some());
        assert!(storage.db.cf_handle(CF_TIMELINE).is_some());
        assert_eq!(storage.count_wallets().unwrap(), 0);
    }

    #[test]
    fn test_create_and_get_wallet() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let w = wallet(1, 10000);
        storage.create_wallet(&w).unwrap();

        assert_eq!(storage.get_wallet(&w.address).unwrap(), w);
        assert_eq!(storage.count_wallets().unwrap(), 1);
        assert!(matches!(
            storage.get_wallet(&Address::new("missing")),
            Err(Error::WalletNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        storage.create_wallet(&wallet(1, 10000)).unwrap();
        let err = storage.create_wallet(&wallet(1, 500)).unwrap_err();
        assert!(matches!(err, Error::DuplicateAddress(_)));

        // Original row and count untouched
        let stored = storage.get_wallet(&wallet(1, 0).address).unwrap();
        assert_eq!(stored.balance, Decimal::new(10000, 2));
        assert_eq!(storage.count_wallets().unwrap(), 1);
    }

    #[test]
    fn test_create_wallet_rejects_bad_balance() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let negative = Wallet {
            address: Address::new("neg"),
            balance: Decimal::new(-500, 2),
        };
        assert!(matches!(
            storage.create_wallet(&negative),
            Err(Error::InvariantViolation(_))
        ));

        let unscaled = Wallet {
            address: Address::new("raw"),
            balance: Decimal::new(5, 0),
        };
        assert!(matches!(
            storage.create_wallet(&unscaled),
            Err(Error::InvariantViolation(_))
        ));

        assert!(storage.find_wallet(&negative.address).unwrap().is_none());
        assert!(storage.find_wallet(&unscaled.address).unwrap().is_none());
        assert_eq!(storage.count_wallets().unwrap(), 0);
        assert_eq!(storage.total_minted().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_total_minted_tracks_opening_balances() {
        let (config, _temp) = test_config();
        {
            let storage = Storage::open(&config).unwrap();
            storage.create_wallet(&wallet(1, 10000)).unwrap();
            storage.create_wallet(&wallet(2, 2550)).unwrap();
            // Rejected inserts mint nothing
            assert!(storage.create_wallet(&wallet(1, 999)).is_err());
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.total_minted().unwrap().to_string(), "125.50");
    }

    #[test]
    fn test_save_wallet_requires_existing_row() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut w = wallet(2, 10000);
        assert!(matches!(storage.save_wallet(&w), Err(Error::WalletNotFound(_))));

        storage.create_wallet(&w).unwrap();
        w.balance = Decimal::new(4200, 2);
        storage.save_wallet(&w).unwrap();
        assert_eq!(
            storage.get_wallet(&w.address).unwrap().balance,
            Decimal::new(4200, 2)
        );
    }

    #[test]
    fn test_apply_transfer_writes_everything() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = wallet(1, 10000);
        let b = wallet(2, 10000);
        storage.create_wallet(&a).unwrap();
        storage.create_wallet(&b).unwrap();

        let amount = Decimal::new(3000, 2);
        let new_a = Wallet::new(a.address.clone(), a.balance - amount);
        let new_b = Wallet::new(b.address.clone(), b.balance + amount);
        let record = storage.apply_transfer(&new_a, &new_b, amount).unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(storage.get_wallet(&a.address).unwrap().balance.to_string(), "70.00");
        assert_eq!(storage.get_wallet(&b.address).unwrap().balance.to_string(), "130.00");
        assert_eq!(storage.get_transaction(1).unwrap(), Some(record.clone()));
        assert_eq!(storage.list_wallet_transactions(&a.address, 0).unwrap(), vec![record.clone()]);
        assert_eq!(storage.list_wallet_transactions(&b.address, 0).unwrap(), vec![record]);
    }

    #[test]
    fn test_apply_transfer_rejects_negative_balance() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = wallet(1, 1000);
        let b = wallet(2, 1000);
        storage.create_wallet(&a).unwrap();
        storage.create_wallet(&b).unwrap();

        let overdrawn = Wallet {
            address: a.address.clone(),
            balance: Decimal::new(-500, 2),
        };
        let err = storage
            .apply_transfer(&overdrawn, &b, Decimal::new(1500, 2))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(storage.get_wallet(&a.address).unwrap(), a);
        assert_eq!(storage.get_wallet(&b.address).unwrap(), b);
        assert!(storage.list_recent_transactions(0).unwrap().is_empty());
        assert_eq!(storage.get_stats().unwrap().total_transactions, 0);

        // The rejected commit did not use up an id
        let amount = Decimal::new(500, 2);
        let record = storage
            .apply_transfer(
                &Wallet::new(a.address.clone(), a.balance - amount),
                &Wallet::new(b.address.clone(), b.balance + amount),
                amount,
            )
            .unwrap();
        assert_eq!(record.id, 1);
        assert!(storage.get_transaction(2).unwrap().is_none());
    }

    #[test]
    fn test_list_recent_newest_first() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = Address::new("a");
        let b = Address::new("b");
        for cents in [100, 200, 300] {
            storage.append_transaction(&a, &b, Decimal::new(cents, 2)).unwrap();
        }

        let ids: Vec<u64> = storage
            .list_recent_transactions(2)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(storage.list_recent_transactions(0).unwrap().len(), 3);
        assert_eq!(storage.list_recent_transactions(-7).unwrap().len(), 3);
    }

    #[test]
    fn test_wallet_index_does_not_leak_between_addresses() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = Address::new("aa");
        let b = Address::new("ab");
        let c = Address::new("b");
        storage.append_transaction(&a, &c, Decimal::ONE).unwrap();
        storage.append_transaction(&b, &c, Decimal::ONE).unwrap();
        storage.append_transaction(&c, &a, Decimal::ONE).unwrap();

        let ids: Vec<u64> = storage
            .list_wallet_transactions(&a, 0)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(storage.list_wallet_transactions(&c, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_wallet_index_skips_addresses_extending_with_separator() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = Address::new("a");
        let nested = Address::new("a|b");
        let other = Address::new("c");
        storage.append_transaction(&nested, &other, Decimal::ONE).unwrap();
        storage.append_transaction(&a, &other, Decimal::ONE).unwrap();
        storage.append_transaction(&other, &nested, Decimal::ONE).unwrap();

        let ids: Vec<u64> = storage
            .list_wallet_transactions(&a, 0)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![2]);

        let nested_ids: Vec<u64> = storage
            .list_wallet_transactions(&nested, 0)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(nested_ids, vec![3, 1]);
    }

    #[test]
    fn test_reopen_keeps_sequence() {
        let (config, _temp) = test_config();
        {
            let storage = Storage::open(&config).unwrap();
            storage.create_wallet(&wallet(1, 100)).unwrap();
            storage
                .append_transaction(&Address::new("a"), &Address::new("b"), Decimal::ONE)
                .unwrap();
            storage
                .append_transaction(&Address::new("b"), &Address::new("a"), Decimal::ONE)
                .unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        let record = storage
            .append_transaction(&Address::new("a"), &Address::new("b"), Decimal::ONE)
            .unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(
            storage.get_stats().unwrap(),
            StorageStats {
                total_wallets: 1,
                total_transactions: 3,
            }
        );
    }
}
