//! Main wallet orchestration layer
//!
//! Ties storage, the single-writer actor, the payment provider, caches,
//! and metrics into the high-level API the UI layer calls. Provider I/O
//! always happens here, never inside the actor: deposits create the
//! invoice before recording it, withdrawals debit first and compensate
//! if the transfer fails.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_core::{Config, Wallet};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let config = Config::default();
//!     let provider = Arc::new(provider::CryptoPayClient::new(
//!         "https://pay.example",
//!         "token",
//!     ));
//!     let wallet = Arc::new(Wallet::open(config, provider).await?);
//!     wallet.sweeper().spawn();
//!
//!     // let outcome = wallet.record_game_result(user, delta, "dice win").await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_wallet_actor, BalanceOp, WalletHandle, WithdrawalResolution},
    cache::{SnapshotCache, TtlCache},
    metrics::Metrics,
    sweep::WithdrawalSweeper,
    types::{
        Account, AccountStats, ActionEntry, ActionKind, Balances, CreateOutcome, DailyOutcome,
        Invoice, InvoiceState, Leaderboards, PendingDeposit, PromoCode, ReconcileOutcome,
        ReferralProgress, UserId, Withdrawal,
    },
    Config, Error, Result, Storage,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use provider::{InvoiceEvent, PaymentProvider};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main wallet interface
pub struct Wallet {
    /// Actor handle for mutations
    handle: WalletHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// External payment provider
    provider: Arc<dyn PaymentProvider>,

    /// Configuration
    config: Arc<Config>,

    /// Metrics collector
    metrics: Metrics,

    /// Balance cache (short TTL)
    balances: TtlCache<Balances>,

    /// Stats cache (longer TTL)
    stats: TtlCache<AccountStats>,

    /// Leaderboard snapshot cache
    tops: SnapshotCache<Leaderboards>,

    /// Daily-task attempt cooldowns
    daily_attempts: DashMap<u64, Instant>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").finish_non_exhaustive()
    }
}

impl Wallet {
    /// Open the wallet with configuration and a payment provider
    pub async fn open(config: Config, provider: Arc<dyn PaymentProvider>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let config = Arc::new(config);
        let handle = spawn_wallet_actor(storage.clone(), config.clone());
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {e}")))?;

        Ok(Self {
            handle,
            storage,
            provider,
            balances: TtlCache::new(Duration::from_secs(config.cache.balance_ttl_secs)),
            stats: TtlCache::new(Duration::from_secs(config.cache.stats_ttl_secs)),
            tops: SnapshotCache::new(Duration::from_secs(config.cache.leaderboard_ttl_secs)),
            daily_attempts: DashMap::new(),
            config,
            metrics,
        })
    }

    /// Metrics collector (for the scrape endpoint)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Build the withdrawal sweeper for this wallet
    pub fn sweeper(&self) -> WithdrawalSweeper {
        WithdrawalSweeper::new(
            self.storage.clone(),
            self.handle.clone(),
            self.provider.clone(),
            self.config.clone(),
            self.metrics.clone(),
        )
    }

    /// Shutdown the wallet actor
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    // Accounts

    /// Create an account, or attach a referrer to an existing one
    pub async fn create_account(
        &self,
        user_id: UserId,
        display_name: impl Into<String>,
        referrer_id: Option<UserId>,
    ) -> Result<CreateOutcome> {
        let outcome = self
            .handle
            .create_account(user_id, display_name, referrer_id)
            .await?;

        if let Some(referrer) = referrer_id {
            self.invalidate_user(referrer);
        }

        Ok(outcome)
    }

    /// Full account row
    pub async fn account(&self, user_id: UserId) -> Result<Account> {
        self.storage.get_account(user_id)
    }

    /// Cached balance pair
    pub async fn balances(&self, user_id: UserId) -> Result<Balances> {
        if let Some(hit) = self.balances.get(user_id.as_u64()) {
            return Ok(hit);
        }

        let account = self.storage.get_account(user_id)?;
        let balances = Balances {
            primary: account.primary_balance,
            referral: account.referral_balance,
        };
        self.balances.put(user_id.as_u64(), balances);
        Ok(balances)
    }

    /// Cached per-user counters
    pub async fn stats(&self, user_id: UserId) -> Result<AccountStats> {
        if let Some(hit) = self.stats.get(user_id.as_u64()) {
            return Ok(hit);
        }

        let account = self.storage.get_account(user_id)?;
        let stats = AccountStats {
            games_played: account.games_played,
            total_deposited: account.total_deposited,
            total_spent: account.total_spent,
            referral_count: account.referral_count,
        };
        self.stats.put(user_id.as_u64(), stats);
        Ok(stats)
    }

    /// Cached top-N leaderboards
    pub async fn leaderboards(&self) -> Result<Leaderboards> {
        if let Some(hit) = self.tops.get() {
            return Ok(hit);
        }

        let tops = self
            .storage
            .leaderboards(self.config.cache.leaderboard_size)?;
        self.tops.put(tops.clone());
        Ok(tops)
    }

    /// Recent action-log entries, newest first
    pub async fn recent_actions(
        &self,
        user: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<ActionEntry>> {
        self.storage.recent_actions(user, limit)
    }

    /// Referral-level summary for one user
    pub async fn referral_progress(&self, user_id: UserId) -> Result<ReferralProgress> {
        let account = self.storage.get_account(user_id)?;
        let tier = self.config.referral.levels.level_for(account.referral_count);

        Ok(ReferralProgress {
            level: tier.level,
            name: tier.name.clone(),
            bonus_rate: tier.bonus_rate,
            referral_count: account.referral_count,
            next_level_at: self.config.referral.levels.next_threshold(tier.level),
        })
    }

    // Ledger operations

    /// Apply one game outcome: counter bump, balance delta, log entry
    pub async fn record_game_result(
        &self,
        user_id: UserId,
        delta: Decimal,
        reason: impl Into<String>,
    ) -> Result<Decimal> {
        let started = Instant::now();
        let balance = self
            .handle
            .mutate_balance(user_id, delta, BalanceOp::game(reason))
            .await?;
        self.metrics
            .mutation_duration
            .observe(started.elapsed().as_secs_f64());
        self.metrics.games_settled.inc();
        self.invalidate_user(user_id);
        Ok(balance)
    }

    /// Manual balance correction (admin surface)
    pub async fn adjust_balance(
        &self,
        user_id: UserId,
        delta: Decimal,
        reason: impl Into<String>,
    ) -> Result<Decimal> {
        let balance = self
            .handle
            .mutate_balance(
                user_id,
                delta,
                BalanceOp::logged(ActionKind::Adjustment, reason),
            )
            .await?;
        self.invalidate_user(user_id);
        Ok(balance)
    }

    /// Move the whole referral balance onto the primary balance
    pub async fn transfer_referral_balance(&self, user_id: UserId) -> Result<Decimal> {
        let moved = self.handle.transfer_referral_balance(user_id).await?;
        self.invalidate_user(user_id);
        Ok(moved)
    }

    // Deposits

    /// Create a provider invoice and record it as pending
    pub async fn initiate_deposit(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<PendingDeposit> {
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "deposit amount must be positive".to_string(),
            ));
        }
        // Surface a missing account before touching the provider
        self.storage.get_account(user_id)?;

        let new_invoice = self
            .provider
            .create_invoice(amount, "Balance top-up")
            .await?;

        let provider_invoice_id = new_invoice.invoice_id.to_string();
        self.handle
            .record_invoice(Invoice {
                provider_invoice_id: provider_invoice_id.clone(),
                user_id,
                amount,
                status: InvoiceState::Pending,
                created_at: Utc::now(),
            })
            .await?;

        Ok(PendingDeposit {
            provider_invoice_id,
            pay_url: new_invoice.pay_url,
            amount,
        })
    }

    /// User-initiated payment poll ("check payment")
    ///
    /// Verifies invoice ownership, asks the provider for the current
    /// status, and forwards the observation to reconciliation. Safe to
    /// race with the webhook: crediting happens at most once.
    pub async fn check_payment(
        &self,
        user_id: UserId,
        provider_invoice_id: &str,
    ) -> Result<ReconcileOutcome> {
        let invoice = self.storage.get_invoice(provider_invoice_id)?;
        if invoice.user_id != user_id {
            return Err(Error::Validation(
                "invoice belongs to another account".to_string(),
            ));
        }

        let snapshot = self.provider.invoice_status(provider_invoice_id).await?;
        let outcome = self
            .handle
            .reconcile(provider_invoice_id, snapshot.status, Some(snapshot.amount))
            .await?;

        self.note_reconcile(invoice.user_id, &outcome);
        Ok(outcome)
    }

    /// Inbound webhook observation
    pub async fn process_webhook(&self, event: InvoiceEvent) -> Result<ReconcileOutcome> {
        let invoice = self.storage.get_invoice(&event.invoice_id)?;

        let outcome = self
            .handle
            .reconcile(event.invoice_id, event.status, event.amount)
            .await?;

        self.note_reconcile(invoice.user_id, &outcome);
        Ok(outcome)
    }

    /// Poll every pending invoice of one user (menu-open refresh)
    pub async fn check_pending_deposits(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(String, ReconcileOutcome)>> {
        let pending = self.storage.pending_invoices(user_id)?;

        let mut outcomes = Vec::with_capacity(pending.len());
        for invoice in pending {
            let snapshot = match self
                .provider
                .invoice_status(&invoice.provider_invoice_id)
                .await
            {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        invoice = %invoice.provider_invoice_id,
                        "Status poll failed: {e}"
                    );
                    continue;
                }
            };

            let outcome = self
                .handle
                .reconcile(
                    invoice.provider_invoice_id.clone(),
                    snapshot.status,
                    Some(snapshot.amount),
                )
                .await?;
            self.note_reconcile(invoice.user_id, &outcome);
            outcomes.push((invoice.provider_invoice_id, outcome));
        }

        Ok(outcomes)
    }

    // Withdrawals

    /// Pay out to the user's provider-side account
    ///
    /// Debit-first with explicit compensation: the balance is debited
    /// atomically, then the transfer runs outside any lock; a provider
    /// failure re-credits the debit and marks the withdrawal failed.
    pub async fn withdraw(&self, user_id: UserId, amount: Decimal) -> Result<Withdrawal> {
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        // Pre-check funds before touching the provider; the debit
        // re-checks inside the actor turn
        let account = self.storage.get_account(user_id)?;
        if account.primary_balance < amount {
            return Err(Error::InsufficientFunds {
                available: account.primary_balance,
                requested: amount,
            });
        }

        // Provider float check before any debit
        let float = self.provider.available_balance(&self.config.asset).await?;
        if float < amount {
            return Err(Error::ProviderFloatInsufficient {
                available: float,
                requested: amount,
            });
        }

        let withdrawal = self.handle.begin_withdrawal(user_id, amount).await?;
        self.invalidate_user(user_id);

        let transfer = self
            .provider
            .create_transfer(
                user_id.as_u64(),
                &self.config.asset,
                amount,
                &withdrawal.spend_id(),
            )
            .await;

        match transfer {
            Ok(receipt) => {
                let resolved = self
                    .handle
                    .resolve_withdrawal(
                        withdrawal.withdrawal_id,
                        WithdrawalResolution::Completed {
                            transfer_id: receipt.transfer_id.to_string(),
                        },
                    )
                    .await?;
                self.metrics.withdrawals_completed.inc();
                Ok(resolved)
            }
            Err(e) => {
                tracing::error!(
                    withdrawal = %withdrawal.withdrawal_id,
                    %user_id,
                    "Transfer failed, compensating: {e}"
                );
                self.handle
                    .resolve_withdrawal(withdrawal.withdrawal_id, WithdrawalResolution::Failed)
                    .await?;
                self.invalidate_user(user_id);
                self.metrics.withdrawals_compensated.inc();
                Err(Error::Provider(e))
            }
        }
    }

    // Promo codes

    /// Redeem a promo code and credit its reward
    pub async fn redeem_promo(&self, user_id: UserId, code: &str) -> Result<Decimal> {
        let reward = self.handle.activate_promo(code, user_id).await?;

        let normalized = PromoCode::normalize(code);
        self.handle
            .mutate_balance(
                user_id,
                reward,
                BalanceOp::logged(ActionKind::PromoActivation, format!("promo code {normalized}")),
            )
            .await?;

        self.invalidate_user(user_id);
        self.metrics.promo_activations.inc();
        Ok(reward)
    }

    /// Create a promo code (admin surface)
    pub async fn create_promo(
        &self,
        code: &str,
        reward_amount: Decimal,
        max_activations: u32,
        expires_at: Option<DateTime<Utc>>,
        created_by: Option<UserId>,
    ) -> Result<()> {
        if reward_amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "promo reward must be positive".to_string(),
            ));
        }
        if max_activations == 0 {
            return Err(Error::Validation(
                "promo needs at least one activation".to_string(),
            ));
        }

        self.handle
            .create_promo(PromoCode {
                code: code.to_string(),
                reward_amount,
                max_activations,
                current_activations: 0,
                expires_at,
                created_by,
                created_at: Utc::now(),
            })
            .await
    }

    /// All promo codes, newest first (admin surface)
    pub async fn list_promos(&self) -> Result<Vec<PromoCode>> {
        self.storage.list_promos()
    }

    /// Delete a promo code and its redemptions (admin surface)
    pub async fn delete_promo(&self, code: &str) -> Result<()> {
        self.handle.delete_promo(code).await
    }

    // Daily tasks

    /// Claim the rotating daily task
    ///
    /// The cooldown is a courtesy rate limit; correctness comes from the
    /// per-day idempotence check inside the actor.
    pub async fn claim_daily_task(&self, user_id: UserId) -> Result<DailyOutcome> {
        let cooldown = Duration::from_secs(self.config.daily.cooldown_secs);
        if let Some(last) = self.daily_attempts.get(&user_id.as_u64()) {
            let elapsed = last.elapsed();
            if elapsed < cooldown {
                return Ok(DailyOutcome::OnCooldown {
                    retry_in_secs: (cooldown - elapsed).as_secs().max(1),
                });
            }
        }
        self.daily_attempts.insert(user_id.as_u64(), Instant::now());

        let today = Utc::now().date_naive();
        let task = self
            .config
            .daily
            .task_for(today)
            .ok_or_else(|| Error::Config("no daily tasks configured".to_string()))?
            .clone();

        let outcome = self.handle.claim_daily(user_id, task, today).await?;

        if matches!(outcome, DailyOutcome::Rewarded { .. }) {
            self.invalidate_user(user_id);
            self.metrics.daily_bonuses.inc();
        }

        Ok(outcome)
    }

    // Internals

    /// Drop a user's cached reads after a mutation
    fn invalidate_user(&self, user_id: UserId) {
        self.balances.invalidate(user_id.as_u64());
        self.stats.invalidate(user_id.as_u64());
    }

    /// Cache and metrics bookkeeping after a reconcile outcome
    fn note_reconcile(&self, user_id: UserId, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Credited {
                referral_bonus, ..
            } => {
                self.invalidate_user(user_id);
                self.metrics.deposits_credited.inc();
                if let Some(payout) = referral_bonus {
                    self.invalidate_user(payout.referrer_id);
                    self.metrics.referral_bonuses.inc();
                }
            }
            ReconcileOutcome::AlreadyPaid => {
                self.metrics.reconcile_replays.inc();
            }
            ReconcileOutcome::StillPending => {}
        }
    }
}
