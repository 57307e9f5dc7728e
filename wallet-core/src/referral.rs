//! Referral level ladder
//!
//! The ladder is configuration, not logic: an ordered list of
//! (threshold, bonus rate, name) tiers. Lookup picks the highest tier
//! whose threshold is at or below the referral count, falling back to
//! the first tier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tier of the referral ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelTier {
    /// Level number (1-based)
    pub level: u8,
    /// Referrals required to reach this tier
    pub required_referrals: u32,
    /// Bonus rate granted at this tier
    pub bonus_rate: Decimal,
    /// Display name
    pub name: String,
}

/// Ordered referral ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelTable {
    tiers: Vec<LevelTier>,
}

impl LevelTable {
    /// Build a table, ordering tiers by threshold
    ///
    /// An empty list falls back to the default ladder so `level_for`
    /// always has a tier to return.
    pub fn new(mut tiers: Vec<LevelTier>) -> Self {
        if tiers.is_empty() {
            return Self::default();
        }
        tiers.sort_by_key(|t| t.required_referrals);
        Self { tiers }
    }

    /// Highest tier whose threshold is `<= referral_count`
    pub fn level_for(&self, referral_count: u32) -> &LevelTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| referral_count >= t.required_referrals)
            .unwrap_or(&self.tiers[0])
    }

    /// Threshold of the tier directly above `level`, if one exists
    pub fn next_threshold(&self, level: u8) -> Option<u32> {
        self.tiers
            .iter()
            .find(|t| t.level > level)
            .map(|t| t.required_referrals)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        let tier = |level: u8, required: u32, rate_cents: i64, name: &str| LevelTier {
            level,
            required_referrals: required,
            bonus_rate: Decimal::new(rate_cents, 2),
            name: name.to_string(),
        };

        Self::new(vec![
            tier(1, 0, 30, "Novice"),
            tier(2, 5, 35, "Regular"),
            tier(3, 10, 40, "Hustler"),
            tier(4, 25, 45, "Insider"),
            tier(5, 50, 50, "Shark"),
            tier(6, 100, 60, "High Roller"),
            tier(7, 200, 70, "Magnate"),
            tier(8, 350, 80, "Baron"),
            tier(9, 500, 90, "Tycoon"),
            tier(10, 1000, 100, "Legend"),
        ])
    }
}
