//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Named fields everywhere a row is read or written

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External user identity (the chat platform's numeric id)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(u64);

impl UserId {
    /// Create a new user id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Big-endian storage key bytes
    pub(crate) fn key_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Per-user financial record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owning user
    pub user_id: UserId,

    /// Display name (for leaderboards and logs)
    pub display_name: String,

    /// Main spendable balance
    pub primary_balance: Decimal,

    /// Referral earnings, transferable onto the primary balance
    pub referral_balance: Decimal,

    /// Number of users this account referred
    pub referral_count: u32,

    /// Lifetime sum of positive balance mutations
    pub total_deposited: Decimal,

    /// Lifetime sum of negative balance mutations (absolute)
    pub total_spent: Decimal,

    /// Lifetime game counter
    pub games_played: u64,

    /// Who referred this account (weak reference, set at most once)
    pub referrer_id: Option<UserId>,

    /// One-shot flag: the referrer has been paid for this account
    pub referral_bonus_given: bool,

    /// Current referral level, derived from `referral_count`
    pub referral_level: u8,

    /// Date the daily task was last claimed
    pub last_daily_task: Option<NaiveDate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account at level 1 with zero balances
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        referrer_id: Option<UserId>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            primary_balance: Decimal::ZERO,
            referral_balance: Decimal::ZERO,
            referral_count: 0,
            total_deposited: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            games_played: 0,
            referrer_id,
            referral_bonus_given: false,
            referral_level: 1,
            last_daily_task: None,
            created_at: Utc::now(),
        }
    }

    /// Apply a primary-balance delta and roll the matching accumulator
    ///
    /// Positive deltas accumulate into `total_deposited`, negative ones
    /// into `total_spent`. The balance itself is not floored; callers
    /// pre-validate funds.
    pub(crate) fn apply_balance_delta(&mut self, delta: Decimal) {
        self.primary_balance += delta;
        if delta > Decimal::ZERO {
            self.total_deposited += delta;
        } else if delta < Decimal::ZERO {
            self.total_spent -= delta;
        }
    }

    /// Primary plus referral balance
    pub fn total_balance(&self) -> Decimal {
        self.primary_balance + self.referral_balance
    }
}

/// A provider-tracked deposit request awaiting confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Provider invoice id (external unique key)
    pub provider_invoice_id: String,
    /// Owning user
    pub user_id: UserId,
    /// Requested amount
    pub amount: Decimal,
    /// Lifecycle state
    pub status: InvoiceState,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Invoice lifecycle: `Pending -> Paid`, exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceState {
    /// Awaiting a paid observation
    Pending,
    /// Credited; terminal
    Paid,
}

/// One payout attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Withdrawal id (UUIDv7 for time-ordering)
    pub withdrawal_id: Uuid,
    /// Owning user
    pub user_id: UserId,
    /// Payout amount
    pub amount: Decimal,
    /// Lifecycle state
    pub status: WithdrawalStatus,
    /// Provider transfer id once completed
    pub transfer_id: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Provider-side idempotency key for this withdrawal's transfer
    ///
    /// Stable across retries, so re-driving a transfer after a crash
    /// cannot pay out twice.
    pub fn spend_id(&self) -> String {
        format!("wd-{}", self.withdrawal_id)
    }
}

/// Withdrawal lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Balance debited, transfer not yet resolved
    Pending,
    /// Transfer accepted by the provider; terminal
    Completed,
    /// Transfer failed, balance re-credited; terminal
    Failed,
}

/// A capped, shareable reward token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    /// Code, stored uppercase, matched case-insensitively
    pub code: String,
    /// Reward credited on activation
    pub reward_amount: Decimal,
    /// Activation cap
    pub max_activations: u32,
    /// Activations so far (never exceeds the cap)
    pub current_activations: u32,
    /// Optional expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Admin who created the code
    pub created_by: Option<UserId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Canonical form codes are stored and compared in
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Expiry and cap checks, in the order callers report them
    pub(crate) fn check_redeemable(&self, now: DateTime<Utc>) -> crate::Result<()> {
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return Err(crate::Error::PromoExpired(self.code.clone()));
            }
        }
        if self.current_activations >= self.max_activations {
            return Err(crate::Error::PromoLimitReached(self.code.clone()));
        }
        Ok(())
    }
}

/// One redemption of a promo code by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoUse {
    /// Redeemed code (normalized)
    pub code: String,
    /// Redeeming user
    pub user_id: UserId,
    /// Redemption timestamp
    pub used_at: DateTime<Utc>,
}

/// Kind of a balance-affecting event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Game win or loss
    GameResult,
    /// Deposit credited after reconciliation
    Deposit,
    /// Withdrawal debit
    WithdrawalDebit,
    /// Compensating credit after a failed withdrawal
    WithdrawalRefund,
    /// Referral bonus credited to a referrer
    ReferralBonus,
    /// Referral balance moved onto the primary balance
    ReferralTransfer,
    /// Promo code reward
    PromoActivation,
    /// Daily task reward
    DailyBonus,
    /// Manual admin correction
    Adjustment,
}

impl ActionKind {
    /// Stable label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::GameResult => "game_result",
            ActionKind::Deposit => "deposit",
            ActionKind::WithdrawalDebit => "withdrawal_debit",
            ActionKind::WithdrawalRefund => "withdrawal_refund",
            ActionKind::ReferralBonus => "referral_bonus",
            ActionKind::ReferralTransfer => "referral_transfer",
            ActionKind::PromoActivation => "promo_activation",
            ActionKind::DailyBonus => "daily_bonus",
            ActionKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only audit record of one balance-affecting event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Entry id (UUIDv7 for time-ordering)
    pub entry_id: Uuid,
    /// Affected user
    pub user_id: UserId,
    /// Event kind
    pub kind: ActionKind,
    /// Signed amount
    pub amount: Decimal,
    /// Free-text reason
    pub reason: String,
    /// Event timestamp
    pub created_at: DateTime<Utc>,
}

impl ActionEntry {
    /// New entry stamped now
    pub fn new(
        user_id: UserId,
        kind: ActionKind,
        amount: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            user_id,
            kind,
            amount,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

/// Result of `create_account`
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// Whether a new account row was created
    pub created: bool,
    /// Referrer promotion triggered by this attribution, if any
    pub level_up: Option<LevelUp>,
}

/// A referrer crossing into a higher level
#[derive(Debug, Clone)]
pub struct LevelUp {
    /// The promoted referrer
    pub user_id: UserId,
    /// New level
    pub level: u8,
    /// Bonus rate of the new level
    pub bonus_rate: Decimal,
    /// Display name of the new level
    pub name: String,
}

/// Result of invoice reconciliation
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The pending->paid transition happened; the account was credited
    Credited {
        /// Credited amount
        amount: Decimal,
        /// One-shot referral payout applied in the same commit, if any
        referral_bonus: Option<ReferralPayout>,
    },
    /// Invoice was already paid; nothing was credited
    AlreadyPaid,
    /// Observation was not "paid"; nothing changed
    StillPending,
}

/// Referral bonus applied during a deposit credit
#[derive(Debug, Clone)]
pub struct ReferralPayout {
    /// The paid referrer
    pub referrer_id: UserId,
    /// Bonus amount
    pub amount: Decimal,
}

/// Result of a daily-task claim
#[derive(Debug, Clone)]
pub enum DailyOutcome {
    /// Task complete, reward credited
    Rewarded {
        /// Credited reward
        amount: Decimal,
    },
    /// Already claimed today
    AlreadyClaimed,
    /// Task not yet complete
    InProgress {
        /// Current counter value
        current: Decimal,
        /// Target to reach
        target: Decimal,
    },
    /// Courtesy cooldown between attempts
    OnCooldown {
        /// Seconds until the next attempt is accepted
        retry_in_secs: u64,
    },
}

/// A deposit awaiting payment, as handed back to the UI layer
#[derive(Debug, Clone)]
pub struct PendingDeposit {
    /// Provider invoice id to poll with
    pub provider_invoice_id: String,
    /// URL the user pays at
    pub pay_url: String,
    /// Invoice amount
    pub amount: Decimal,
}

/// Cached balance pair
#[derive(Debug, Clone, Copy)]
pub struct Balances {
    /// Primary balance
    pub primary: Decimal,
    /// Referral balance
    pub referral: Decimal,
}

/// Cached per-user counters
#[derive(Debug, Clone, Copy)]
pub struct AccountStats {
    /// Lifetime games
    pub games_played: u64,
    /// Lifetime deposits
    pub total_deposited: Decimal,
    /// Lifetime spend
    pub total_spent: Decimal,
    /// Referral count
    pub referral_count: u32,
}

/// Top-N snapshots for the leaderboard view
#[derive(Debug, Clone, Default)]
pub struct Leaderboards {
    /// By lifetime deposits
    pub top_deposited: Vec<(String, Decimal)>,
    /// By lifetime spend
    pub top_spent: Vec<(String, Decimal)>,
    /// By referral count
    pub top_referrals: Vec<(String, u32)>,
}

/// Referral-level summary for one user
#[derive(Debug, Clone)]
pub struct ReferralProgress {
    /// Current level
    pub level: u8,
    /// Level display name
    pub name: String,
    /// Bonus rate of the current level
    pub bonus_rate: Decimal,
    /// Referral count backing the level
    pub referral_count: u32,
    /// Referrals required for the next level, if any
    pub next_level_at: Option<u32>,
}
