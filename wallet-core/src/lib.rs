//! Chipvault Wallet Core
//!
//! Ledger and balance-settlement core for a casino platform bot: per-user
//! balances under concurrent game outcomes, idempotent deposit
//! reconciliation, one-shot referral bonuses, and capped promo codes.
//!
//! # Architecture
//!
//! - **Single Writer**: every mutation runs through one actor task, so a
//!   read-modify-write is one turn and one atomic `WriteBatch` commit
//! - **Exact money**: `Decimal` everywhere, no binary floats
//! - **Idempotent reconciliation**: webhook and poll share one entry
//!   point; the pending->paid transition credits exactly once
//! - **Compensation over locking**: provider calls run outside any
//!   transaction; a committed debit is re-credited on provider failure
//!
//! # Invariants
//!
//! - Balance equals the sum of all applied deltas, under any interleaving
//! - `total_deposited`/`total_spent` only ever grow
//! - An invoice credits its account at most once
//! - A referrer is paid the deposit bonus at most once per referred user
//! - `current_activations` never exceeds `max_activations`
//! - `referral_level` never decreases and tracks `referral_count`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod referral;
pub mod storage;
pub mod sweep;
pub mod types;
pub mod wallet;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use storage::Storage;
pub use types::{
    Account, AccountStats, ActionEntry, ActionKind, Balances, CreateOutcome, DailyOutcome,
    Invoice, InvoiceState, Leaderboards, LevelUp, PendingDeposit, PromoCode, ReconcileOutcome,
    ReferralPayout, ReferralProgress, UserId, Withdrawal, WithdrawalStatus,
};
pub use wallet::Wallet;
