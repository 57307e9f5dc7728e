//! Background reconciliation of orphaned withdrawals
//!
//! A withdrawal is debited before the provider transfer runs; a crash
//! between the two leaves it Pending with money gone and no payout. The
//! sweeper re-drives such withdrawals with the SAME `spend_id`, so the
//! provider either executes the transfer once or acknowledges the one it
//! already ran:
//!
//! - transfer accepted -> mark Completed
//! - definitive provider rejection -> compensate the debit, mark Failed
//! - network failure -> leave Pending for the next sweep

use crate::{
    actor::{WalletHandle, WithdrawalResolution},
    metrics::Metrics,
    Config, Result, Storage,
};
use chrono::{Duration as ChronoDuration, Utc};
use provider::PaymentProvider;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Withdrawal sweeper
pub struct WithdrawalSweeper {
    storage: Arc<Storage>,
    handle: WalletHandle,
    provider: Arc<dyn PaymentProvider>,
    config: Arc<Config>,
    metrics: Metrics,
}

impl std::fmt::Debug for WithdrawalSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithdrawalSweeper").finish_non_exhaustive()
    }
}

impl WithdrawalSweeper {
    /// Create a sweeper over the wallet's storage and actor
    pub(crate) fn new(
        storage: Arc<Storage>,
        handle: WalletHandle,
        provider: Arc<dyn PaymentProvider>,
        config: Arc<Config>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            handle,
            provider,
            config,
            metrics,
        }
    }

    /// Spawn the sweep loop as a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.withdrawal.sweep_enabled {
                tracing::info!("Withdrawal sweeper disabled by config");
                return;
            }

            let mut ticker =
                interval(Duration::from_secs(self.config.withdrawal.sweep_interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.sweep_once().await {
                    Ok(0) => {}
                    Ok(resolved) => {
                        tracing::info!(resolved, "Sweep resolved orphaned withdrawals");
                    }
                    Err(e) => {
                        tracing::error!("Withdrawal sweep failed: {e}");
                    }
                }
            }
        })
    }

    /// One sweep pass; returns how many withdrawals were resolved
    pub async fn sweep_once(&self) -> Result<usize> {
        let timeout = ChronoDuration::seconds(self.config.withdrawal.pending_timeout_secs as i64);
        let cutoff = Utc::now() - timeout;
        let orphans = self.storage.pending_withdrawals(cutoff)?;

        let mut resolved = 0;
        for withdrawal in orphans {
            tracing::warn!(
                withdrawal = %withdrawal.withdrawal_id,
                user = %withdrawal.user_id,
                amount = %withdrawal.amount,
                "Re-driving orphaned withdrawal"
            );

            let transfer = self
                .provider
                .create_transfer(
                    withdrawal.user_id.as_u64(),
                    &self.config.asset,
                    withdrawal.amount,
                    &withdrawal.spend_id(),
                )
                .await;

            match transfer {
                Ok(receipt) => {
                    self.handle
                        .resolve_withdrawal(
                            withdrawal.withdrawal_id,
                            WithdrawalResolution::Completed {
                                transfer_id: receipt.transfer_id.to_string(),
                            },
                        )
                        .await?;
                    self.metrics.withdrawals_completed.inc();
                    resolved += 1;
                }
                Err(provider::Error::Api { code, message }) => {
                    // The provider saw the request and said no; safe to refund
                    tracing::warn!(
                        withdrawal = %withdrawal.withdrawal_id,
                        code,
                        %message,
                        "Provider rejected re-driven transfer, compensating"
                    );
                    self.handle
                        .resolve_withdrawal(
                            withdrawal.withdrawal_id,
                            WithdrawalResolution::Failed,
                        )
                        .await?;
                    self.metrics.withdrawals_compensated.inc();
                    resolved += 1;
                }
                Err(e) => {
                    // Can't tell what happened; keep it pending
                    tracing::warn!(
                        withdrawal = %withdrawal.withdrawal_id,
                        "Transfer re-drive inconclusive, retrying next sweep: {e}"
                    );
                }
            }
        }

        Ok(resolved)
    }
}
