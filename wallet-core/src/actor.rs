//! Single-writer actor for ledger mutations
//!
//! Every balance-affecting operation is serialized through one Tokio
//! task. A read-modify-write happens entirely inside one actor turn and
//! commits through one RocksDB [`WriteBatch`], so concurrent callers can
//! never lose an update for a user, double-credit an invoice, or
//! oversubscribe a promo code. Provider I/O never happens inside the
//! actor; the wallet layer calls out before or after a turn and
//! compensates on failure.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Request handlers (games, deposits,          │
//! │           withdrawals, promo, webhook, poll)         │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ WalletHandle (Clone)
//!                       ▼
//!                mpsc::channel (bounded)
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              WalletActor (Single Task)                │
//! │   read rows → mutate in memory → WriteBatch commit    │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::{
    config::{Config, DailyTask, TaskKind},
    types::{
        Account, ActionEntry, ActionKind, CreateOutcome, DailyOutcome, Invoice, InvoiceState,
        LevelUp, PromoCode, PromoUse, ReconcileOutcome, ReferralPayout, UserId, Withdrawal,
        WithdrawalStatus,
    },
    Error, Result, Storage,
};
use chrono::{NaiveDate, Utc};
use provider::InvoiceStatus;
use rocksdb::WriteBatch;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Side data for a primary-balance mutation
#[derive(Debug, Clone)]
pub struct BalanceOp {
    /// Bump `games_played` alongside the mutation
    pub count_game: bool,
    /// Action-log line to append in the same commit
    pub log: Option<LogLine>,
}

impl BalanceOp {
    /// Mutation with no side data
    pub fn silent() -> Self {
        Self {
            count_game: false,
            log: None,
        }
    }

    /// Plain mutation with a log line
    pub fn logged(kind: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            count_game: false,
            log: Some(LogLine {
                kind,
                reason: reason.into(),
            }),
        }
    }

    /// Game-outcome mutation: bumps the game counter too
    pub fn game(reason: impl Into<String>) -> Self {
        Self {
            count_game: true,
            log: Some(LogLine {
                kind: ActionKind::GameResult,
                reason: reason.into(),
            }),
        }
    }
}

/// Action-log line attached to a mutation
#[derive(Debug, Clone)]
pub struct LogLine {
    /// Event kind
    pub kind: ActionKind,
    /// Free-text reason
    pub reason: String,
}

/// How a pending withdrawal resolved
#[derive(Debug, Clone)]
pub enum WithdrawalResolution {
    /// Provider accepted the transfer
    Completed {
        /// Provider transfer id
        transfer_id: String,
    },
    /// Transfer failed; the debit is re-credited
    Failed,
}

/// Message sent to the wallet actor
pub enum WalletMessage {
    /// Create or re-attribute an account
    CreateAccount {
        /// User to create
        user_id: UserId,
        /// Display name
        display_name: String,
        /// Optional referrer
        referrer_id: Option<UserId>,
        /// Response channel
        response: oneshot::Sender<Result<CreateOutcome>>,
    },

    /// Apply a primary-balance delta
    MutateBalance {
        /// Target user
        user_id: UserId,
        /// Signed delta
        delta: Decimal,
        /// Side data
        op: BalanceOp,
        /// Response: new primary balance
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Apply a referral-balance delta
    MutateReferralBalance {
        /// Target user
        user_id: UserId,
        /// Signed delta
        delta: Decimal,
        /// Action-log line
        log: Option<LogLine>,
        /// Response: new referral balance
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Move the whole referral balance onto the primary balance
    TransferReferralBalance {
        /// Target user
        user_id: UserId,
        /// Response: moved amount
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Persist a freshly created pending invoice
    RecordInvoice {
        /// The invoice
        invoice: Invoice,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Apply a provider observation to an invoice
    Reconcile {
        /// Provider invoice id
        provider_invoice_id: String,
        /// Observed status
        observed_status: InvoiceStatus,
        /// Observed amount, if the observation carried one
        observed_amount: Option<Decimal>,
        /// Response channel
        response: oneshot::Sender<Result<ReconcileOutcome>>,
    },

    /// Redeem a promo code for a user
    ActivatePromo {
        /// Raw code as typed by the user
        code: String,
        /// Redeeming user
        user_id: UserId,
        /// Response: reward amount
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Create a promo code
    CreatePromo {
        /// The code
        promo: PromoCode,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Delete a promo code and its redemptions
    DeletePromo {
        /// Raw code
        code: String,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Debit the balance and open a pending withdrawal
    BeginWithdrawal {
        /// Paying user
        user_id: UserId,
        /// Payout amount
        amount: Decimal,
        /// Response: the pending withdrawal
        response: oneshot::Sender<Result<Withdrawal>>,
    },

    /// Resolve a pending withdrawal (complete or compensate)
    ResolveWithdrawal {
        /// Withdrawal id
        withdrawal_id: Uuid,
        /// Outcome observed at the provider
        resolution: WithdrawalResolution,
        /// Response: the final withdrawal row
        response: oneshot::Sender<Result<Withdrawal>>,
    },

    /// Claim the daily task
    ClaimDaily {
        /// Claiming user
        user_id: UserId,
        /// Today's task
        task: DailyTask,
        /// Claim date
        today: NaiveDate,
        /// Response channel
        response: oneshot::Sender<Result<DailyOutcome>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes wallet messages
pub struct WalletActor {
    storage: Arc<Storage>,
    config: Arc<Config>,
    mailbox: mpsc::Receiver<WalletMessage>,
}

impl WalletActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        config: Arc<Config>,
        mailbox: mpsc::Receiver<WalletMessage>,
    ) -> Self {
        Self {
            storage,
            config,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, WalletMessage::Shutdown) {
                break;
            }
            self.handle_message(msg);
        }
    }

    fn handle_message(&mut self, msg: WalletMessage) {
        match msg {
            WalletMessage::CreateAccount {
                user_id,
                display_name,
                referrer_id,
                response,
            } => {
                let _ = response.send(self.create_account(user_id, display_name, referrer_id));
            }
            WalletMessage::MutateBalance {
                user_id,
                delta,
                op,
                response,
            } => {
                let _ = response.send(self.mutate_balance(user_id, delta, op));
            }
            WalletMessage::MutateReferralBalance {
                user_id,
                delta,
                log,
                response,
            } => {
                let _ = response.send(self.mutate_referral_balance(user_id, delta, log));
            }
            WalletMessage::TransferReferralBalance { user_id, response } => {
                let _ = response.send(self.transfer_referral_balance(user_id));
            }
            WalletMessage::RecordInvoice { invoice, response } => {
                let _ = response.send(self.record_invoice(invoice));
            }
            WalletMessage::Reconcile {
                provider_invoice_id,
                observed_status,
                observed_amount,
                response,
            } => {
                let _ = response.send(self.reconcile(
                    &provider_invoice_id,
                    observed_status,
                    observed_amount,
                ));
            }
            WalletMessage::ActivatePromo {
                code,
                user_id,
                response,
            } => {
                let _ = response.send(self.activate_promo(&code, user_id));
            }
            WalletMessage::CreatePromo { promo, response } => {
                let _ = response.send(self.create_promo(promo));
            }
            WalletMessage::DeletePromo { code, response } => {
                let _ = response.send(self.delete_promo(&code));
            }
            WalletMessage::BeginWithdrawal {
                user_id,
                amount,
                response,
            } => {
                let _ = response.send(self.begin_withdrawal(user_id, amount));
            }
            WalletMessage::ResolveWithdrawal {
                withdrawal_id,
                resolution,
                response,
            } => {
                let _ = response.send(self.resolve_withdrawal(withdrawal_id, resolution));
            }
            WalletMessage::ClaimDaily {
                user_id,
                task,
                today,
                response,
            } => {
                let _ = response.send(self.claim_daily(user_id, task, today));
            }
            WalletMessage::Shutdown => {}
        }
    }

    // Handlers. Each reads rows, mutates in memory, and commits one batch.

    fn create_account(
        &self,
        user_id: UserId,
        display_name: String,
        referrer_id: Option<UserId>,
    ) -> Result<CreateOutcome> {
        // Self-referral carries no attribution
        let referrer_id = referrer_id.filter(|r| *r != user_id);

        match self.storage.get_account(user_id) {
            Ok(mut existing) => {
                let mut level_up = None;

                // First attribution wins; a set referrer is immutable
                if existing.referrer_id.is_none() {
                    if let Some(referrer) = referrer_id {
                        let mut batch = WriteBatch::default();
                        existing.referrer_id = Some(referrer);
                        level_up = self.attach_referral(&mut batch, referrer)?;
                        self.storage.batch_put_account(&mut batch, &existing)?;
                        self.storage.commit(batch)?;

                        tracing::info!(%user_id, %referrer, "Referrer attached to existing account");
                    }
                }

                Ok(CreateOutcome {
                    created: false,
                    level_up,
                })
            }
            Err(Error::AccountNotFound(_)) => {
                let account = Account::new(user_id, display_name, referrer_id);

                let mut batch = WriteBatch::default();
                let mut level_up = None;
                if let Some(referrer) = referrer_id {
                    level_up = self.attach_referral(&mut batch, referrer)?;
                }
                self.storage.batch_put_account(&mut batch, &account)?;
                self.storage.commit(batch)?;

                tracing::info!(%user_id, referrer = ?referrer_id, "Account created");

                Ok(CreateOutcome {
                    created: true,
                    level_up,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Bump a referrer's count and recompute their level
    ///
    /// The referrer is a weak reference: a dangling id skips the bump.
    fn attach_referral(
        &self,
        batch: &mut WriteBatch,
        referrer_id: UserId,
    ) -> Result<Option<LevelUp>> {
        let mut referrer = match self.storage.get_account(referrer_id) {
            Ok(account) => account,
            Err(Error::AccountNotFound(_)) => {
                tracing::warn!(%referrer_id, "Referrer account missing, skipping attribution");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        referrer.referral_count += 1;
        let tier = self
            .config
            .referral
            .levels
            .level_for(referrer.referral_count);
        let promoted = tier.level > referrer.referral_level;
        // Levels never go down, even if the table shrinks
        referrer.referral_level = referrer.referral_level.max(tier.level);

        let level_up = promoted.then(|| LevelUp {
            user_id: referrer_id,
            level: tier.level,
            bonus_rate: tier.bonus_rate,
            name: tier.name.clone(),
        });

        self.storage.batch_put_account(batch, &referrer)?;
        Ok(level_up)
    }

    fn mutate_balance(&self, user_id: UserId, delta: Decimal, op: BalanceOp) -> Result<Decimal> {
        let mut account = self.storage.get_account(user_id)?;
        account.apply_balance_delta(delta);
        if op.count_game {
            account.games_played += 1;
        }

        let mut batch = WriteBatch::default();
        self.storage.batch_put_account(&mut batch, &account)?;
        if let Some(log) = op.log {
            self.append_log(&mut batch, user_id, log.kind, delta, log.reason);
        }
        self.storage.commit(batch)?;

        tracing::debug!(%user_id, %delta, balance = %account.primary_balance, "Balance mutated");

        Ok(account.primary_balance)
    }

    fn mutate_referral_balance(
        &self,
        user_id: UserId,
        delta: Decimal,
        log: Option<LogLine>,
    ) -> Result<Decimal> {
        let mut account = self.storage.get_account(user_id)?;
        account.referral_balance += delta;

        let mut batch = WriteBatch::default();
        self.storage.batch_put_account(&mut batch, &account)?;
        if let Some(log) = log {
            self.append_log(&mut batch, user_id, log.kind, delta, log.reason);
        }
        self.storage.commit(batch)?;

        Ok(account.referral_balance)
    }

    fn transfer_referral_balance(&self, user_id: UserId) -> Result<Decimal> {
        let mut account = self.storage.get_account(user_id)?;
        let amount = account.referral_balance;
        if amount <= Decimal::ZERO {
            return Err(Error::Validation("referral balance is empty".to_string()));
        }

        account.referral_balance = Decimal::ZERO;
        account.apply_balance_delta(amount);

        let mut batch = WriteBatch::default();
        self.storage.batch_put_account(&mut batch, &account)?;
        self.append_log(
            &mut batch,
            user_id,
            ActionKind::ReferralTransfer,
            amount,
            "referral balance moved to primary",
        );
        self.storage.commit(batch)?;

        Ok(amount)
    }

    fn record_invoice(&self, invoice: Invoice) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.storage.batch_put_invoice(&mut batch, &invoice)?;
        self.storage.commit(batch)?;

        tracing::info!(
            invoice = %invoice.provider_invoice_id,
            user = %invoice.user_id,
            amount = %invoice.amount,
            "Invoice recorded"
        );

        Ok(())
    }

    fn reconcile(
        &self,
        provider_invoice_id: &str,
        observed_status: InvoiceStatus,
        observed_amount: Option<Decimal>,
    ) -> Result<ReconcileOutcome> {
        let mut invoice = self.storage.get_invoice(provider_invoice_id)?;

        // The race breaker: a second paid observation is a no-op
        if invoice.status == InvoiceState::Paid {
            tracing::debug!(invoice = %provider_invoice_id, "Duplicate paid observation ignored");
            return Ok(ReconcileOutcome::AlreadyPaid);
        }

        if observed_status != InvoiceStatus::Paid {
            return Ok(ReconcileOutcome::StillPending);
        }

        let amount = observed_amount.unwrap_or(invoice.amount);
        let mut account = self.storage.get_account(invoice.user_id)?;
        account.apply_balance_delta(amount);
        invoice.status = InvoiceState::Paid;

        let mut batch = WriteBatch::default();

        // One-shot referral bonus, keyed to the depositor
        let mut referral_bonus = None;
        if let Some(referrer_id) = account.referrer_id {
            if !account.referral_bonus_given
                && amount >= self.config.referral.min_qualifying_deposit
            {
                match self.storage.get_account(referrer_id) {
                    Ok(mut referrer) => {
                        let bonus = self.config.referral.deposit_bonus;
                        referrer.referral_balance += bonus;
                        account.referral_bonus_given = true;
                        self.storage.batch_put_account(&mut batch, &referrer)?;
                        self.append_log(
                            &mut batch,
                            referrer_id,
                            ActionKind::ReferralBonus,
                            bonus,
                            format!(
                                "bonus for referral {} first deposit of {amount}",
                                invoice.user_id
                            ),
                        );
                        referral_bonus = Some(ReferralPayout {
                            referrer_id,
                            amount: bonus,
                        });
                    }
                    Err(Error::AccountNotFound(_)) => {
                        tracing::warn!(%referrer_id, "Referrer missing, bonus skipped");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.storage.batch_put_account(&mut batch, &account)?;
        self.storage.batch_put_invoice(&mut batch, &invoice)?;
        self.append_log(
            &mut batch,
            invoice.user_id,
            ActionKind::Deposit,
            amount,
            format!("invoice {provider_invoice_id}"),
        );
        self.storage.commit(batch)?;

        tracing::info!(
            invoice = %provider_invoice_id,
            user = %invoice.user_id,
            %amount,
            "Deposit credited"
        );

        Ok(ReconcileOutcome::Credited {
            amount,
            referral_bonus,
        })
    }

    fn activate_promo(&self, code: &str, user_id: UserId) -> Result<Decimal> {
        let code = PromoCode::normalize(code);

        if self.storage.promo_use_exists(&code, user_id)? {
            return Err(Error::PromoAlreadyActivated(code));
        }

        let mut promo = self.storage.get_promo(&code)?;
        promo.check_redeemable(Utc::now())?;
        promo.current_activations += 1;

        let mut batch = WriteBatch::default();
        self.storage.batch_put_promo(&mut batch, &promo)?;
        self.storage.batch_put_promo_use(
            &mut batch,
            &PromoUse {
                code: code.clone(),
                user_id,
                used_at: Utc::now(),
            },
        )?;
        self.storage.commit(batch)?;

        tracing::info!(%code, %user_id, "Promo code activated");

        Ok(promo.reward_amount)
    }

    fn create_promo(&self, mut promo: PromoCode) -> Result<()> {
        promo.code = PromoCode::normalize(&promo.code);

        if self.storage.get_promo(&promo.code).is_ok() {
            return Err(Error::Validation(format!(
                "promo code {} already exists",
                promo.code
            )));
        }

        let mut batch = WriteBatch::default();
        self.storage.batch_put_promo(&mut batch, &promo)?;
        self.storage.commit(batch)?;
        Ok(())
    }

    fn delete_promo(&self, code: &str) -> Result<()> {
        let code = PromoCode::normalize(code);
        // Surface absence before blindly deleting
        self.storage.get_promo(&code)?;
        self.storage.delete_promo(&code)
    }

    fn begin_withdrawal(&self, user_id: UserId, amount: Decimal) -> Result<Withdrawal> {
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let mut account = self.storage.get_account(user_id)?;
        if account.primary_balance < amount {
            return Err(Error::InsufficientFunds {
                available: account.primary_balance,
                requested: amount,
            });
        }

        account.apply_balance_delta(-amount);

        let withdrawal = Withdrawal {
            withdrawal_id: Uuid::now_v7(),
            user_id,
            amount,
            status: WithdrawalStatus::Pending,
            transfer_id: None,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        self.storage.batch_put_account(&mut batch, &account)?;
        self.storage.batch_put_withdrawal(&mut batch, &withdrawal)?;
        self.append_log(
            &mut batch,
            user_id,
            ActionKind::WithdrawalDebit,
            -amount,
            format!("withdrawal {}", withdrawal.withdrawal_id),
        );
        self.storage.commit(batch)?;

        tracing::info!(%user_id, %amount, withdrawal = %withdrawal.withdrawal_id, "Withdrawal debited");

        Ok(withdrawal)
    }

    fn resolve_withdrawal(
        &self,
        withdrawal_id: Uuid,
        resolution: WithdrawalResolution,
    ) -> Result<Withdrawal> {
        let mut withdrawal = self.storage.get_withdrawal(withdrawal_id)?;

        // The request path and the sweeper may race; first resolution wins
        if withdrawal.status != WithdrawalStatus::Pending {
            return Ok(withdrawal);
        }

        let mut batch = WriteBatch::default();
        match resolution {
            WithdrawalResolution::Completed { transfer_id } => {
                withdrawal.status = WithdrawalStatus::Completed;
                withdrawal.transfer_id = Some(transfer_id);

                tracing::info!(withdrawal = %withdrawal_id, "Withdrawal completed");
            }
            WithdrawalResolution::Failed => {
                withdrawal.status = WithdrawalStatus::Failed;

                let mut account = self.storage.get_account(withdrawal.user_id)?;
                account.apply_balance_delta(withdrawal.amount);
                self.storage.batch_put_account(&mut batch, &account)?;
                self.append_log(
                    &mut batch,
                    withdrawal.user_id,
                    ActionKind::WithdrawalRefund,
                    withdrawal.amount,
                    format!("refund for failed withdrawal {withdrawal_id}"),
                );

                tracing::warn!(withdrawal = %withdrawal_id, "Withdrawal failed, debit compensated");
            }
        }
        self.storage.batch_put_withdrawal(&mut batch, &withdrawal)?;
        self.storage.commit(batch)?;

        Ok(withdrawal)
    }

    fn claim_daily(
        &self,
        user_id: UserId,
        task: DailyTask,
        today: NaiveDate,
    ) -> Result<DailyOutcome> {
        let mut account = self.storage.get_account(user_id)?;

        if account.last_daily_task == Some(today) {
            return Ok(DailyOutcome::AlreadyClaimed);
        }

        let current = match task.kind {
            TaskKind::GamesPlayed => Decimal::from(account.games_played),
            TaskKind::TotalDeposited => account.total_deposited,
            TaskKind::TotalSpent => account.total_spent,
            TaskKind::Referrals => Decimal::from(account.referral_count),
        };

        if current < task.target {
            return Ok(DailyOutcome::InProgress {
                current,
                target: task.target,
            });
        }

        account.apply_balance_delta(task.reward);
        account.last_daily_task = Some(today);

        let mut batch = WriteBatch::default();
        self.storage.batch_put_account(&mut batch, &account)?;
        self.append_log(
            &mut batch,
            user_id,
            ActionKind::DailyBonus,
            task.reward,
            format!("daily task complete: {}", task.description),
        );
        self.storage.commit(batch)?;

        Ok(DailyOutcome::Rewarded {
            amount: task.reward,
        })
    }

    /// Stage a log entry; a serialization failure is swallowed so the
    /// originating balance operation never fails on logging.
    fn append_log(
        &self,
        batch: &mut WriteBatch,
        user_id: UserId,
        kind: ActionKind,
        amount: Decimal,
        reason: impl Into<String>,
    ) {
        let entry = ActionEntry::new(user_id, kind, amount, reason);
        if let Err(e) = self.storage.batch_append_action(batch, &entry) {
            tracing::warn!(%user_id, kind = %kind, "Action log write skipped: {e}");
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct WalletHandle {
    sender: mpsc::Sender<WalletMessage>,
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHandle").finish_non_exhaustive()
    }
}

impl WalletHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WalletMessage>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> WalletMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create or re-attribute an account
    pub async fn create_account(
        &self,
        user_id: UserId,
        display_name: impl Into<String>,
        referrer_id: Option<UserId>,
    ) -> Result<CreateOutcome> {
        let display_name = display_name.into();
        self.call(|response| WalletMessage::CreateAccount {
            user_id,
            display_name,
            referrer_id,
            response,
        })
        .await
    }

    /// Apply a primary-balance delta; returns the new balance
    pub async fn mutate_balance(
        &self,
        user_id: UserId,
        delta: Decimal,
        op: BalanceOp,
    ) -> Result<Decimal> {
        self.call(|response| WalletMessage::MutateBalance {
            user_id,
            delta,
            op,
            response,
        })
        .await
    }

    /// Apply a referral-balance delta; returns the new referral balance
    pub async fn mutate_referral_balance(
        &self,
        user_id: UserId,
        delta: Decimal,
        log: Option<LogLine>,
    ) -> Result<Decimal> {
        self.call(|response| WalletMessage::MutateReferralBalance {
            user_id,
            delta,
            log,
            response,
        })
        .await
    }

    /// Move the whole referral balance onto the primary balance
    pub async fn transfer_referral_balance(&self, user_id: UserId) -> Result<Decimal> {
        self.call(|response| WalletMessage::TransferReferralBalance { user_id, response })
            .await
    }

    /// Persist a pending invoice
    pub async fn record_invoice(&self, invoice: Invoice) -> Result<()> {
        self.call(|response| WalletMessage::RecordInvoice { invoice, response })
            .await
    }

    /// Apply a provider observation to an invoice
    pub async fn reconcile(
        &self,
        provider_invoice_id: impl Into<String>,
        observed_status: InvoiceStatus,
        observed_amount: Option<Decimal>,
    ) -> Result<ReconcileOutcome> {
        let provider_invoice_id = provider_invoice_id.into();
        self.call(|response| WalletMessage::Reconcile {
            provider_invoice_id,
            observed_status,
            observed_amount,
            response,
        })
        .await
    }

    /// Redeem a promo code; returns the reward amount
    pub async fn activate_promo(
        &self,
        code: impl Into<String>,
        user_id: UserId,
    ) -> Result<Decimal> {
        let code = code.into();
        self.call(|response| WalletMessage::ActivatePromo {
            code,
            user_id,
            response,
        })
        .await
    }

    /// Create a promo code
    pub async fn create_promo(&self, promo: PromoCode) -> Result<()> {
        self.call(|response| WalletMessage::CreatePromo { promo, response })
            .await
    }

    /// Delete a promo code
    pub async fn delete_promo(&self, code: impl Into<String>) -> Result<()> {
        let code = code.into();
        self.call(|response| WalletMessage::DeletePromo { code, response })
            .await
    }

    /// Debit the balance and open a pending withdrawal
    pub async fn begin_withdrawal(&self, user_id: UserId, amount: Decimal) -> Result<Withdrawal> {
        self.call(|response| WalletMessage::BeginWithdrawal {
            user_id,
            amount,
            response,
        })
        .await
    }

    /// Resolve a pending withdrawal
    pub async fn resolve_withdrawal(
        &self,
        withdrawal_id: Uuid,
        resolution: WithdrawalResolution,
    ) -> Result<Withdrawal> {
        self.call(|response| WalletMessage::ResolveWithdrawal {
            withdrawal_id,
            resolution,
            response,
        })
        .await
    }

    /// Claim the daily task
    pub async fn claim_daily(
        &self,
        user_id: UserId,
        task: DailyTask,
        today: NaiveDate,
    ) -> Result<DailyOutcome> {
        self.call(|response| WalletMessage::ClaimDaily {
            user_id,
            task,
            today,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WalletMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the wallet actor
pub fn spawn_wallet_actor(storage: Arc<Storage>, config: Arc<Config>) -> WalletHandle {
    let (tx, rx) = mpsc::channel(1024); // Bounded channel for backpressure
    let actor = WalletActor::new(storage, config, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    WalletHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_handle() -> (WalletHandle, Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        let handle = spawn_wallet_actor(storage.clone(), Arc::new(config));
        (handle, storage, temp_dir)
    }

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[tokio::test]
    async fn concurrent_mutations_never_lose_updates() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(1);
        handle.create_account(user, "alice", None).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                h.mutate_balance(user, dec(100), BalanceOp::silent())
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.primary_balance, dec(5000));
        assert_eq!(account.total_deposited, dec(5000));
    }

    #[tokio::test]
    async fn concurrent_credit_and_debit_scenario() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(1);
        handle.create_account(user, "alice", None).await.unwrap();
        handle
            .mutate_balance(user, dec(1000), BalanceOp::silent())
            .await
            .unwrap();

        let h1 = handle.clone();
        let h2 = handle.clone();
        let credit = tokio::spawn(async move {
            h1.mutate_balance(user, dec(500), BalanceOp::silent())
                .await
                .unwrap()
        });
        let debit = tokio::spawn(async move {
            h2.mutate_balance(user, dec(-300), BalanceOp::silent())
                .await
                .unwrap()
        });
        credit.await.unwrap();
        debit.await.unwrap();

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.primary_balance, dec(1200));
        assert_eq!(account.total_deposited, dec(1500));
        assert_eq!(account.total_spent, dec(300));
    }

    #[tokio::test]
    async fn game_outcome_bumps_counter_and_logs() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(2);
        handle.create_account(user, "bob", None).await.unwrap();

        handle
            .mutate_balance(user, dec(-150), BalanceOp::game("dice loss"))
            .await
            .unwrap();

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.games_played, 1);
        assert_eq!(account.total_spent, dec(150));

        let log = storage.recent_actions(Some(user), 10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ActionKind::GameResult);
        assert_eq!(log[0].amount, dec(-150));
    }

    #[tokio::test]
    async fn referrer_attribution_is_first_wins() {
        let (handle, storage, _temp) = test_handle().await;
        let referrer = UserId::new(10);
        let user = UserId::new(11);
        handle.create_account(referrer, "ref", None).await.unwrap();

        let outcome = handle
            .create_account(user, "newbie", Some(referrer))
            .await
            .unwrap();
        assert!(outcome.created);
        assert_eq!(storage.get_account(referrer).unwrap().referral_count, 1);

        // A different referrer later never overwrites the first
        let other = UserId::new(12);
        handle.create_account(other, "other", None).await.unwrap();
        let outcome = handle
            .create_account(user, "newbie", Some(other))
            .await
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(
            storage.get_account(user).unwrap().referrer_id,
            Some(referrer)
        );
        assert_eq!(storage.get_account(other).unwrap().referral_count, 0);
    }

    #[tokio::test]
    async fn late_attribution_attaches_once() {
        let (handle, storage, _temp) = test_handle().await;
        let referrer = UserId::new(20);
        let user = UserId::new(21);
        handle.create_account(referrer, "ref", None).await.unwrap();
        handle.create_account(user, "solo", None).await.unwrap();

        let outcome = handle
            .create_account(user, "solo", Some(referrer))
            .await
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(
            storage.get_account(user).unwrap().referrer_id,
            Some(referrer)
        );
        assert_eq!(storage.get_account(referrer).unwrap().referral_count, 1);
    }

    #[tokio::test]
    async fn self_referral_is_ignored() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(30);

        handle
            .create_account(user, "loop", Some(user))
            .await
            .unwrap();

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.referrer_id, None);
        assert_eq!(account.referral_count, 0);
    }

    #[tokio::test]
    async fn level_up_surfaces_only_on_promotion() {
        let (handle, storage, _temp) = test_handle().await;
        let referrer = UserId::new(40);
        handle.create_account(referrer, "ref", None).await.unwrap();

        let mut level_ups = 0;
        for i in 0..5u64 {
            let user = UserId::new(100 + i);
            let outcome = handle
                .create_account(user, format!("u{i}"), Some(referrer))
                .await
                .unwrap();
            if let Some(level_up) = outcome.level_up {
                assert_eq!(level_up.level, 2);
                level_ups += 1;
            }
        }

        // Default ladder promotes at 5 referrals, exactly once
        assert_eq!(level_ups, 1);
        assert_eq!(storage.get_account(referrer).unwrap().referral_level, 2);
    }

    #[tokio::test]
    async fn reconcile_credits_exactly_once() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(50);
        handle.create_account(user, "payer", None).await.unwrap();
        handle
            .record_invoice(Invoice {
                provider_invoice_id: "900".to_string(),
                user_id: user,
                amount: dec(2000),
                status: InvoiceState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        // Webhook and poll race: both observe paid
        let first = handle
            .reconcile("900", InvoiceStatus::Paid, Some(dec(2000)))
            .await
            .unwrap();
        let second = handle
            .reconcile("900", InvoiceStatus::Paid, Some(dec(2000)))
            .await
            .unwrap();

        assert!(matches!(first, ReconcileOutcome::Credited { .. }));
        assert!(matches!(second, ReconcileOutcome::AlreadyPaid));

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.primary_balance, dec(2000));
        assert_eq!(
            storage.get_invoice("900").unwrap().status,
            InvoiceState::Paid
        );
    }

    #[tokio::test]
    async fn reconcile_not_paid_is_noop() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(51);
        handle.create_account(user, "payer", None).await.unwrap();
        handle
            .record_invoice(Invoice {
                provider_invoice_id: "901".to_string(),
                user_id: user,
                amount: dec(1000),
                status: InvoiceState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let outcome = handle
            .reconcile("901", InvoiceStatus::Active, None)
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::StillPending));
        assert_eq!(
            storage.get_account(user).unwrap().primary_balance,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn reconcile_unknown_invoice_is_error() {
        let (handle, _storage, _temp) = test_handle().await;
        let err = handle
            .reconcile("nope", InvoiceStatus::Paid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvoiceNotFound(_)));
    }

    #[tokio::test]
    async fn referral_bonus_paid_once_across_deposits() {
        let (handle, storage, _temp) = test_handle().await;
        let referrer = UserId::new(60);
        let user = UserId::new(61);
        handle.create_account(referrer, "ref", None).await.unwrap();
        handle
            .create_account(user, "friend", Some(referrer))
            .await
            .unwrap();

        for (id, amount) in [("910", dec(500)), ("911", dec(700))] {
            handle
                .record_invoice(Invoice {
                    provider_invoice_id: id.to_string(),
                    user_id: user,
                    amount,
                    status: InvoiceState::Pending,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            handle
                .reconcile(id, InvoiceStatus::Paid, Some(amount))
                .await
                .unwrap();
        }

        // Both deposits qualify (>= 2.00) but the bonus is one-shot
        let bonus = Config::default().referral.deposit_bonus;
        assert_eq!(
            storage.get_account(referrer).unwrap().referral_balance,
            bonus
        );
        assert!(storage.get_account(user).unwrap().referral_bonus_given);
    }

    #[tokio::test]
    async fn small_first_deposit_does_not_burn_the_bonus() {
        let (handle, storage, _temp) = test_handle().await;
        let referrer = UserId::new(62);
        let user = UserId::new(63);
        handle.create_account(referrer, "ref", None).await.unwrap();
        handle
            .create_account(user, "friend", Some(referrer))
            .await
            .unwrap();

        // 1.00 is below the qualifying minimum
        handle
            .record_invoice(Invoice {
                provider_invoice_id: "920".to_string(),
                user_id: user,
                amount: dec(100),
                status: InvoiceState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        handle
            .reconcile("920", InvoiceStatus::Paid, Some(dec(100)))
            .await
            .unwrap();

        assert_eq!(
            storage.get_account(referrer).unwrap().referral_balance,
            Decimal::ZERO
        );
        assert!(!storage.get_account(user).unwrap().referral_bonus_given);

        // The next qualifying deposit still pays it
        handle
            .record_invoice(Invoice {
                provider_invoice_id: "921".to_string(),
                user_id: user,
                amount: dec(300),
                status: InvoiceState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        handle
            .reconcile("921", InvoiceStatus::Paid, Some(dec(300)))
            .await
            .unwrap();

        assert!(storage.get_account(user).unwrap().referral_bonus_given);
    }

    #[tokio::test]
    async fn promo_cap_holds_under_concurrency() {
        let (handle, storage, _temp) = test_handle().await;
        let a = UserId::new(70);
        let b = UserId::new(71);
        handle.create_account(a, "a", None).await.unwrap();
        handle.create_account(b, "b", None).await.unwrap();

        handle
            .create_promo(PromoCode {
                code: "WELCOME".to_string(),
                reward_amount: dec(500),
                max_activations: 1,
                current_activations: 0,
                expires_at: None,
                created_by: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let h1 = handle.clone();
        let h2 = handle.clone();
        let r1 = tokio::spawn(async move { h1.activate_promo("WELCOME", a).await });
        let r2 = tokio::spawn(async move { h2.activate_promo("welcome", b).await });
        let results = [r1.await.unwrap(), r2.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::PromoLimitReached(_)))));

        assert_eq!(
            storage.get_promo("WELCOME").unwrap().current_activations,
            1
        );
    }

    #[tokio::test]
    async fn promo_double_submit_by_same_user_rejected() {
        let (handle, _storage, _temp) = test_handle().await;
        let user = UserId::new(72);
        handle.create_account(user, "a", None).await.unwrap();

        handle
            .create_promo(PromoCode {
                code: "TWICE".to_string(),
                reward_amount: dec(100),
                max_activations: 10,
                current_activations: 0,
                expires_at: None,
                created_by: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        handle.activate_promo("TWICE", user).await.unwrap();
        let err = handle.activate_promo("twice", user).await.unwrap_err();
        assert!(matches!(err, Error::PromoAlreadyActivated(_)));
    }

    #[tokio::test]
    async fn withdrawal_begin_and_refund() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(80);
        handle.create_account(user, "payee", None).await.unwrap();
        handle
            .mutate_balance(user, dec(1000), BalanceOp::silent())
            .await
            .unwrap();

        let wd = handle.begin_withdrawal(user, dec(400)).await.unwrap();
        assert_eq!(
            storage.get_account(user).unwrap().primary_balance,
            dec(600)
        );

        let resolved = handle
            .resolve_withdrawal(wd.withdrawal_id, WithdrawalResolution::Failed)
            .await
            .unwrap();
        assert_eq!(resolved.status, WithdrawalStatus::Failed);
        assert_eq!(
            storage.get_account(user).unwrap().primary_balance,
            dec(1000)
        );

        // Second resolution is a no-op
        let again = handle
            .resolve_withdrawal(
                wd.withdrawal_id,
                WithdrawalResolution::Completed {
                    transfer_id: "t9".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(again.status, WithdrawalStatus::Failed);
        assert_eq!(
            storage.get_account(user).unwrap().primary_balance,
            dec(1000)
        );
    }

    #[tokio::test]
    async fn withdrawal_rejects_insufficient_funds() {
        let (handle, _storage, _temp) = test_handle().await;
        let user = UserId::new(81);
        handle.create_account(user, "poor", None).await.unwrap();

        let err = handle.begin_withdrawal(user, dec(100)).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn referral_transfer_moves_everything() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(90);
        handle.create_account(user, "earner", None).await.unwrap();
        handle
            .mutate_referral_balance(user, dec(250), None)
            .await
            .unwrap();

        let moved = handle.transfer_referral_balance(user).await.unwrap();
        assert_eq!(moved, dec(250));

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.referral_balance, Decimal::ZERO);
        assert_eq!(account.primary_balance, dec(250));

        let err = handle.transfer_referral_balance(user).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn daily_claim_is_idempotent_per_day() {
        let (handle, storage, _temp) = test_handle().await;
        let user = UserId::new(95);
        handle.create_account(user, "daily", None).await.unwrap();

        // Complete the games task
        for _ in 0..5 {
            handle
                .mutate_balance(user, dec(-10), BalanceOp::game("spin"))
                .await
                .unwrap();
        }

        let task = Config::default().daily.tasks[0].clone();
        let today = Utc::now().date_naive();

        let first = handle.claim_daily(user, task.clone(), today).await.unwrap();
        assert!(matches!(first, DailyOutcome::Rewarded { .. }));

        let second = handle.claim_daily(user, task, today).await.unwrap();
        assert!(matches!(second, DailyOutcome::AlreadyClaimed));

        let account = storage.get_account(user).unwrap();
        assert_eq!(account.last_daily_task, Some(today));
    }

    #[tokio::test]
    async fn daily_claim_reports_progress() {
        let (handle, _storage, _temp) = test_handle().await;
        let user = UserId::new(96);
        handle.create_account(user, "slow", None).await.unwrap();

        let task = Config::default().daily.tasks[0].clone();
        let outcome = handle
            .claim_daily(user, task, Utc::now().date_naive())
            .await
            .unwrap();

        match outcome {
            DailyOutcome::InProgress { current, target } => {
                assert_eq!(current, Decimal::ZERO);
                assert_eq!(target, Decimal::from(5));
            }
            other => panic!("expected InProgress, got {other:?}"),
        }
    }
}
