//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_deposits_credited_total` - Invoices credited exactly once
//! - `wallet_reconcile_replays_total` - Paid observations dropped as duplicates
//! - `wallet_games_settled_total` - Game outcomes applied to balances
//! - `wallet_withdrawals_completed_total` - Transfers accepted by the provider
//! - `wallet_withdrawals_compensated_total` - Debits refunded after a failed transfer
//! - `wallet_promo_activations_total` - Promo codes redeemed
//! - `wallet_referral_bonuses_total` - One-shot referral bonuses paid
//! - `wallet_daily_bonuses_total` - Daily task rewards credited
//! - `wallet_mutation_duration_seconds` - Latency of ledger mutations

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Invoices credited
    pub deposits_credited: IntCounter,

    /// Duplicate paid observations (webhook/poll race)
    pub reconcile_replays: IntCounter,

    /// Game outcomes settled
    pub games_settled: IntCounter,

    /// Withdrawals completed
    pub withdrawals_completed: IntCounter,

    /// Withdrawals compensated after provider failure
    pub withdrawals_compensated: IntCounter,

    /// Promo activations
    pub promo_activations: IntCounter,

    /// Referral bonuses paid
    pub referral_bonuses: IntCounter,

    /// Daily task rewards credited
    pub daily_bonuses: IntCounter,

    /// Mutation latency histogram
    pub mutation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let deposits_credited = counter(
            "wallet_deposits_credited_total",
            "Invoices credited exactly once",
        )?;
        let reconcile_replays = counter(
            "wallet_reconcile_replays_total",
            "Paid observations dropped as duplicates",
        )?;
        let games_settled = counter(
            "wallet_games_settled_total",
            "Game outcomes applied to balances",
        )?;
        let withdrawals_completed = counter(
            "wallet_withdrawals_completed_total",
            "Transfers accepted by the provider",
        )?;
        let withdrawals_compensated = counter(
            "wallet_withdrawals_compensated_total",
            "Debits refunded after a failed transfer",
        )?;
        let promo_activations =
            counter("wallet_promo_activations_total", "Promo codes redeemed")?;
        let referral_bonuses = counter(
            "wallet_referral_bonuses_total",
            "One-shot referral bonuses paid",
        )?;
        let daily_bonuses =
            counter("wallet_daily_bonuses_total", "Daily task rewards credited")?;

        let mutation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_mutation_duration_seconds",
                "Latency of ledger mutations",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(mutation_duration.clone()))?;

        Ok(Self {
            deposits_credited,
            reconcile_replays,
            games_settled,
            withdrawals_completed,
            withdrawals_compensated,
            promo_activations,
            referral_bonuses,
            daily_bonuses,
            mutation_duration,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
