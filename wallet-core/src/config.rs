//! Configuration for the wallet core
//!
//! Money fields are decimal strings in TOML (`deposit_bonus = "0.30"`),
//! matching the string serde of [`Decimal`] used across the workspace.

use crate::referral::LevelTable;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Provider asset all balances are denominated in
    pub asset: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Referral program configuration
    pub referral: ReferralConfig,

    /// Read-side cache configuration
    pub cache: CacheConfig,

    /// Withdrawal sweep configuration
    pub withdrawal: WithdrawalConfig,

    /// Daily task configuration
    pub daily: DailyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallet"),
            service_name: "wallet-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            asset: "USDT".to_string(),
            rocksdb: RocksDbConfig::default(),
            referral: ReferralConfig::default(),
            cache: CacheConfig::default(),
            withdrawal: WithdrawalConfig::default(),
            daily: DailyConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Level 0 file num compaction trigger
    pub level0_file_num_compaction_trigger: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 4,
            level0_file_num_compaction_trigger: 4,
            enable_statistics: false,
        }
    }
}

/// Referral program configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Flat bonus paid to the referrer on a referral's first qualifying deposit
    pub deposit_bonus: Decimal,

    /// Minimum deposit that qualifies for the one-shot bonus
    pub min_qualifying_deposit: Decimal,

    /// Level ladder
    pub levels: LevelTable,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            deposit_bonus: Decimal::new(30, 2),          // 0.30
            min_qualifying_deposit: Decimal::new(200, 2), // 2.00
            levels: LevelTable::default(),
        }
    }
}

/// Read-side cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Balance cache TTL (seconds)
    pub balance_ttl_secs: u64,

    /// Stats cache TTL (seconds)
    pub stats_ttl_secs: u64,

    /// Leaderboard snapshot TTL (seconds)
    pub leaderboard_ttl_secs: u64,

    /// Leaderboard size (top N)
    pub leaderboard_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balance_ttl_secs: 30,
            stats_ttl_secs: 60,
            leaderboard_ttl_secs: 120,
            leaderboard_size: 5,
        }
    }
}

/// Withdrawal sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalConfig {
    /// Enable the background sweeper
    pub sweep_enabled: bool,

    /// Sweep interval (seconds)
    pub sweep_interval_secs: u64,

    /// Age after which a pending withdrawal is considered orphaned (seconds)
    pub pending_timeout_secs: u64,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: true,
            sweep_interval_secs: 60,
            pending_timeout_secs: 300,
        }
    }
}

/// Daily task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConfig {
    /// Courtesy cooldown between claim attempts (seconds)
    pub cooldown_secs: u64,

    /// Date the rotation is anchored to
    pub anchor_date: NaiveDate,

    /// Rotating task list
    pub tasks: Vec<DailyTask>,
}

impl DailyConfig {
    /// Task scheduled for `today`, rotating through the list daily
    pub fn task_for(&self, today: NaiveDate) -> Option<&DailyTask> {
        if self.tasks.is_empty() {
            return None;
        }
        let offset = (today - self.anchor_date).num_days();
        let index = offset.rem_euclid(self.tasks.len() as i64) as usize;
        self.tasks.get(index)
    }
}

impl Default for DailyConfig {
    fn default() -> Self {
        let task = |kind, target: i64, target_scale, reward_cents: i64, description: &str| {
            DailyTask {
                kind,
                target: Decimal::new(target, target_scale),
                reward: Decimal::new(reward_cents, 2),
                description: description.to_string(),
            }
        };

        Self {
            cooldown_secs: 60,
            anchor_date: NaiveDate::from_ymd_opt(2025, 9, 19).expect("valid anchor date"),
            tasks: vec![
                task(TaskKind::GamesPlayed, 5, 0, 50, "Play 5 games"),
                task(TaskKind::TotalDeposited, 10, 0, 100, "Deposit 10$ in total"),
                task(TaskKind::Referrals, 1, 0, 50, "Invite a friend"),
                task(TaskKind::TotalSpent, 5, 0, 50, "Wager 5$ in total"),
            ],
        }
    }
}

/// One rotating daily task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTask {
    /// Counter the task is measured against
    pub kind: TaskKind,
    /// Counter value that completes the task
    pub target: Decimal,
    /// Reward credited on completion
    pub reward: Decimal,
    /// Human-readable description
    pub description: String,
}

/// Account counter a daily task reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// `games_played`
    GamesPlayed,
    /// `total_deposited`
    TotalDeposited,
    /// `total_spent`
    TotalSpent,
    /// `referral_count`
    Referrals,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Load defaults with environment overrides
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("WALLET_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(asset) = std::env::var("WALLET_ASSET") {
            config.asset = asset;
        }

        Ok(config)
    }
}
