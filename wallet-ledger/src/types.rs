//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money, always scale 2)
//! - A stable JSON shape for the HTTP layer sitting on top of the core

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits carried by every balance and amount
pub const MONEY_SCALE: u32 = 2;

/// Raw bytes behind a wallet address
pub const ADDRESS_BYTES: usize = 32;

/// Wallet address: 32 random bytes, lowercase hex
///
/// Addresses are opaque. Lookups accept any string, a malformed one simply
/// never matches a wallet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string as-is
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Encode raw bytes as an address
    pub fn from_bytes(bytes: &[u8; ADDRESS_BYTES]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for 64 lowercase hex characters
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ADDRESS_BYTES * 2
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Wallet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Primary key
    pub address: Address,

    /// Current balance, never negative
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

impl Wallet {
    /// Create a wallet with the given opening balance
    pub fn new(address: Address, balance: Decimal) -> Self {
        Self {
            address,
            balance: to_money(balance),
        }
    }
}

/// Ledger entry for one committed transfer
///
/// Records are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned sequence number
    pub id: u64,

    /// Debited wallet
    pub from: Address,

    /// Credited wallet
    pub to: Address,

    /// Amount moved, always positive
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

/// Parse a caller-supplied amount string
///
/// Accepts plain decimals only (`"30"`, `"30.5"`, `"30.50"`). Signs,
/// exponents, separators and whitespace are rejected, as are zero and values
/// with more than two significant fractional digits. The result has scale 2.
pub fn parse_amount(input: &str) -> crate::Result<Decimal> {
    let invalid = |reason: &str| crate::Error::InvalidAmount(format!("{:?}: {}", input, reason));

    let mut dots = 0;
    let mut digits = 0;
    for b in input.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return Err(invalid("not a plain decimal number")),
        }
    }
    if digits == 0 || dots > 1 {
        return Err(invalid("not a plain decimal number"));
    }

    let value = Decimal::from_str(input).map_err(|e| invalid(&e.to_string()))?;
    if value <= Decimal::ZERO {
        return Err(invalid("amount must be positive"));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(invalid("at most two fractional digits allowed"));
    }

    let money = to_money(value);
    if money.scale() != MONEY_SCALE {
        return Err(invalid("amount out of range"));
    }
    Ok(money)
}

/// Rescale to the fixed money precision
pub fn to_money(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(MONEY_SCALE);
    value
}
