//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Validation errors are produced before anything is written. Only
/// [`Error::LockTimeout`] is worth retrying; every other error is final for
/// the request that caused it.
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is not a positive decimal with at most two fractional digits
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender and recipient are the same wallet
    #[error("Cannot transfer funds to the same wallet: {0}")]
    SelfTransfer(String),

    /// Sender wallet does not exist
    #[error("Sender wallet not found: {0}")]
    SenderNotFound(String),

    /// Recipient wallet does not exist
    #[error("Recipient wallet not found: {0}")]
    RecipientNotFound(String),

    /// Sender balance is lower than the requested amount
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the time of the check
        available: Decimal,
        /// Amount the caller asked to move
        requested: Decimal,
    },

    /// Wallet lookup by address failed
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Address already taken by another wallet
    #[error("Duplicate wallet address: {0}")]
    DuplicateAddress(String),

    /// Every generated address collided with an existing wallet
    #[error("Could not find a free wallet address after {attempts} attempts")]
    AddressSpaceExhausted {
        /// Number of addresses tried
        attempts: u32,
    },

    /// Wallet locks could not be acquired in time
    #[error("Timed out after {timeout_ms}ms waiting for wallet locks")]
    LockTimeout {
        /// Configured wait bound
        timeout_ms: u64,
    },

    /// Durable storage failed (RocksDB)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Bulk seeding stopped at a wallet
    #[error("Wallet seeding failed at index {index}: {source}")]
    SeedingFailed {
        /// Zero-based index of the wallet that failed
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Invariant violation (money conservation, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }

    /// Stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::SelfTransfer(_) => "self_transfer",
            Error::SenderNotFound(_) => "sender_not_found",
            Error::RecipientNotFound(_) => "recipient_not_found",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::WalletNotFound(_) => "wallet_not_found",
            Error::DuplicateAddress(_) => "duplicate_address",
            Error::AddressSpaceExhausted { .. } => "address_space_exhausted",
            Error::LockTimeout { .. } => "lock_timeout",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::Serialization(_) => "serialization",
            Error::SeedingFailed { .. } => "seeding_failed",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(Error::LockTimeout { timeout_ms: 10 }.is_retryable());
        assert!(!Error::StoreUnavailable("disk gone".into()).is_retryable());
        assert!(!Error::SelfTransfer("ab".into()).is_retryable());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = Error::InsufficientFunds {
            available: Decimal::new(7000, 2),
            requested: Decimal::new(10000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: available 70.00, requested 100.00"
        );
        assert_eq!(err.kind(), "insufficient_funds");
    }
}
