//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `wallet_ledger_transfers_total` - Transfers committed
//! - `wallet_ledger_transfer_failures_total{kind}` - Rejected or failed transfers by error kind
//! - `wallet_ledger_transfer_duration_seconds` - Histogram of transfer latencies
//! - `wallet_ledger_wallets_created_total` - Wallets created
//!
//! Metrics live on a registry owned by the collector, so several ledgers can
//! coexist in one process (tests open many).

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transfers committed
    pub transfers_total: IntCounter,

    /// Failed transfers by error kind
    pub transfer_failures: IntCounterVec,

    /// Transfer duration histogram
    pub transfer_duration: Histogram,

    /// Wallets created
    pub wallets_created: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_total = IntCounter::new(
            "wallet_ledger_transfers_total",
            "Total number of committed transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let transfer_failures = IntCounterVec::new(
            Opts::new(
                "wallet_ledger_transfer_failures_total",
                "Transfers that did not commit, by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(transfer_failures.clone()))?;

        let transfer_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_ledger_transfer_duration_seconds",
                "Histogram of transfer latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(transfer_duration.clone()))?;

        let wallets_created = IntCounter::new(
            "wallet_ledger_wallets_created_total",
            "Total number of wallets created",
        )?;
        registry.register(Box::new(wallets_created.clone()))?;

        Ok(Self {
            transfers_total,
            transfer_failures,
            transfer_duration,
            wallets_created,
            registry,
        })
    }

    /// Record a committed transfer
    pub fn record_transfer(&self, duration_seconds: f64) {
        self.transfers_total.inc();
        self.transfer_duration.observe(duration_seconds);
    }

    /// Record a transfer that did not commit
    pub fn record_transfer_failure(&self, kind: &str) {
        self.transfer_failures.with_label_values(&[kind]).inc();
    }

    /// Record wallet creation
    pub fn record_wallet_created(&self) {
        self.wallets_created.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
