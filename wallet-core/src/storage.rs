//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - One row per user (key: user id, big-endian)
//! - `invoices` - Deposit invoices (key: provider invoice id)
//! - `withdrawals` - Payout attempts (key: withdrawal id)
//! - `promos` - Promo codes (key: normalized code)
//! - `promo_uses` - One row per (code, user) redemption
//! - `actions` - Append-only action log (key: UUIDv7, time-ordered)
//! - `indices` - Tagged secondary indices for per-user lookups
//!
//! Multi-row mutations commit through a single [`WriteBatch`]; the
//! `batch_*` helpers let the actor compose one atomic commit per
//! operation.

use crate::{
    error::{Error, Result},
    types::{
        Account, ActionEntry, Invoice, InvoiceState, Leaderboards, PromoCode, PromoUse, UserId,
        Withdrawal, WithdrawalStatus,
    },
    Config,
};
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_INVOICES: &str = "invoices";
const CF_WITHDRAWALS: &str = "withdrawals";
const CF_PROMOS: &str = "promos";
const CF_PROMO_USES: &str = "promo_uses";
const CF_ACTIONS: &str = "actions";
const CF_INDICES: &str = "indices";

/// Index key tags
const IDX_USER_ACTION: u8 = b'a';
const IDX_USER_INVOICE: u8 = b'i';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_INVOICES, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_WITHDRAWALS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_PROMOS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_PROMO_USES, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_ACTIONS, Self::cf_options_actions()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_rows() -> Options {
        let mut opts = Options::default();
        // Hot row state, prefer decompression speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_actions() -> Options {
        let mut opts = Options::default();
        // Append-only, read rarely; squeeze it
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {name} not found")))
    }

    // Account operations

    /// Get account by user id
    pub fn get_account(&self, user_id: UserId) -> Result<Account> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = self
            .db
            .get_cf(cf, user_id.key_bytes())?
            .ok_or(Error::AccountNotFound(user_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Whether an account row exists
    pub fn account_exists(&self, user_id: UserId) -> Result<bool> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        Ok(self.db.get_cf(cf, user_id.key_bytes())?.is_some())
    }

    /// Stage an account row into a batch
    pub(crate) fn batch_put_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        batch.put_cf(cf, account.user_id.key_bytes(), bincode::serialize(account)?);
        Ok(())
    }

    // Invoice operations

    /// Get invoice by provider id
    pub fn get_invoice(&self, provider_invoice_id: &str) -> Result<Invoice> {
        let cf = self.cf_handle(CF_INVOICES)?;
        let value = self
            .db
            .get_cf(cf, provider_invoice_id.as_bytes())?
            .ok_or_else(|| Error::InvoiceNotFound(provider_invoice_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Stage an invoice row and its per-user index entry
    pub(crate) fn batch_put_invoice(&self, batch: &mut WriteBatch, invoice: &Invoice) -> Result<()> {
        let cf = self.cf_handle(CF_INVOICES)?;
        batch.put_cf(
            cf,
            invoice.provider_invoice_id.as_bytes(),
            bincode::serialize(invoice)?,
        );

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let key = Self::index_key_user_invoice(invoice.user_id, &invoice.provider_invoice_id);
        batch.put_cf(cf_indices, key, b"");

        Ok(())
    }

    /// Pending invoices of one user, oldest first
    pub fn pending_invoices(&self, user_id: UserId) -> Result<Vec<Invoice>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_prefix(IDX_USER_INVOICE, user_id);

        let mut invoices = Vec::new();
        for item in self.db.prefix_iterator_cf(cf_indices, &prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let invoice_id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let invoice = self.get_invoice(&invoice_id)?;
            if invoice.status == InvoiceState::Pending {
                invoices.push(invoice);
            }
        }

        Ok(invoices)
    }

    // Withdrawal operations

    /// Get withdrawal by id
    pub fn get_withdrawal(&self, withdrawal_id: Uuid) -> Result<Withdrawal> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;
        let value = self
            .db
            .get_cf(cf, withdrawal_id.as_bytes())?
            .ok_or(Error::WithdrawalNotFound(withdrawal_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Stage a withdrawal row into a batch
    pub(crate) fn batch_put_withdrawal(
        &self,
        batch: &mut WriteBatch,
        withdrawal: &Withdrawal,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;
        batch.put_cf(
            cf,
            withdrawal.withdrawal_id.as_bytes(),
            bincode::serialize(withdrawal)?,
        );
        Ok(())
    }

    /// Put a withdrawal row directly (tests and sweeper fixtures)
    pub(crate) fn put_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_put_withdrawal(&mut batch, withdrawal)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Pending withdrawals created at or before `cutoff`
    pub fn pending_withdrawals(&self, cutoff: DateTime<Utc>) -> Result<Vec<Withdrawal>> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;

        let mut orphans = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let withdrawal: Withdrawal = bincode::deserialize(&value)?;
            if withdrawal.status == WithdrawalStatus::Pending && withdrawal.created_at <= cutoff {
                orphans.push(withdrawal);
            }
        }

        Ok(orphans)
    }

    // Promo operations

    /// Get promo code (expects a normalized code)
    pub fn get_promo(&self, code: &str) -> Result<PromoCode> {
        let cf = self.cf_handle(CF_PROMOS)?;
        let value = self
            .db
            .get_cf(cf, code.as_bytes())?
            .ok_or_else(|| Error::PromoNotFound(code.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Stage a promo row into a batch
    pub(crate) fn batch_put_promo(&self, batch: &mut WriteBatch, promo: &PromoCode) -> Result<()> {
        let cf = self.cf_handle(CF_PROMOS)?;
        batch.put_cf(cf, promo.code.as_bytes(), bincode::serialize(promo)?);
        Ok(())
    }

    /// Whether `user_id` has redeemed `code`
    pub fn promo_use_exists(&self, code: &str, user_id: UserId) -> Result<bool> {
        let cf = self.cf_handle(CF_PROMO_USES)?;
        Ok(self
            .db
            .get_cf(cf, Self::promo_use_key(code, user_id))?
            .is_some())
    }

    /// Stage a promo-use row into a batch
    pub(crate) fn batch_put_promo_use(
        &self,
        batch: &mut WriteBatch,
        promo_use: &PromoUse,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_PROMO_USES)?;
        batch.put_cf(
            cf,
            Self::promo_use_key(&promo_use.code, promo_use.user_id),
            bincode::serialize(promo_use)?,
        );
        Ok(())
    }

    /// All promo codes, newest first
    pub fn list_promos(&self) -> Result<Vec<PromoCode>> {
        let cf = self.cf_handle(CF_PROMOS)?;

        let mut promos = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            promos.push(bincode::deserialize::<PromoCode>(&value)?);
        }
        promos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(promos)
    }

    /// Delete a promo code and all its use rows
    pub(crate) fn delete_promo(&self, code: &str) -> Result<()> {
        let cf_promos = self.cf_handle(CF_PROMOS)?;
        let cf_uses = self.cf_handle(CF_PROMO_USES)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(cf_promos, code.as_bytes());

        let mut prefix = code.as_bytes().to_vec();
        prefix.push(b'|');
        for item in self.db.prefix_iterator_cf(cf_uses, &prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            batch.delete_cf(cf_uses, key);
        }

        self.db.write(batch)?;
        Ok(())
    }

    // Action log operations

    /// Stage an action entry and its per-user index entry
    pub(crate) fn batch_append_action(
        &self,
        batch: &mut WriteBatch,
        entry: &ActionEntry,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_ACTIONS)?;
        batch.put_cf(cf, entry.entry_id.as_bytes(), bincode::serialize(entry)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let key = Self::index_key_user_action(entry.user_id, entry.entry_id);
        batch.put_cf(cf_indices, key, b"");

        Ok(())
    }

    /// Get action entry by id
    fn get_action(&self, entry_id: Uuid) -> Result<ActionEntry> {
        let cf = self.cf_handle(CF_ACTIONS)?;
        let value = self
            .db
            .get_cf(cf, entry_id.as_bytes())?
            .ok_or_else(|| Error::Storage(format!("Action entry {entry_id} missing")))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Most recent action entries, newest first
    ///
    /// With a user, walks the per-user index; without, walks the whole
    /// log backwards. UUIDv7 keys keep both time-ordered.
    pub fn recent_actions(&self, user: Option<UserId>, limit: usize) -> Result<Vec<ActionEntry>> {
        match user {
            Some(user_id) => {
                let cf_indices = self.cf_handle(CF_INDICES)?;
                let prefix = Self::index_prefix(IDX_USER_ACTION, user_id);

                let mut entry_ids = Vec::new();
                for item in self.db.prefix_iterator_cf(cf_indices, &prefix) {
                    let (key, _) = item?;
                    if !key.starts_with(&prefix) {
                        break;
                    }
                    if key.len() == prefix.len() + 16 {
                        let id_bytes: [u8; 16] = key[prefix.len()..]
                            .try_into()
                            .map_err(|_| Error::Storage("Malformed action index key".into()))?;
                        entry_ids.push(Uuid::from_bytes(id_bytes));
                    }
                }

                entry_ids
                    .into_iter()
                    .rev()
                    .take(limit)
                    .map(|id| self.get_action(id))
                    .collect()
            }
            None => {
                let cf = self.cf_handle(CF_ACTIONS)?;
                let mut entries = Vec::new();
                for item in self.db.iterator_cf(cf, IteratorMode::End).take(limit) {
                    let (_, value) = item?;
                    entries.push(bincode::deserialize::<ActionEntry>(&value)?);
                }
                Ok(entries)
            }
        }
    }

    // Leaderboards

    /// Top-N accounts by deposits, spend, and referral count
    pub fn leaderboards(&self, n: usize) -> Result<Leaderboards> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;

        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            accounts.push(bincode::deserialize::<Account>(&value)?);
        }

        let mut by_deposited = accounts.clone();
        by_deposited.sort_by(|a, b| b.total_deposited.cmp(&a.total_deposited));

        let mut by_spent = accounts.clone();
        by_spent.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));

        let mut by_referrals = accounts;
        by_referrals.sort_by(|a, b| b.referral_count.cmp(&a.referral_count));

        Ok(Leaderboards {
            top_deposited: by_deposited
                .iter()
                .take(n)
                .map(|a| (a.display_name.clone(), a.total_deposited))
                .collect(),
            top_spent: by_spent
                .iter()
                .take(n)
                .map(|a| (a.display_name.clone(), a.total_spent))
                .collect(),
            top_referrals: by_referrals
                .iter()
                .take(n)
                .map(|a| (a.display_name.clone(), a.referral_count))
                .collect(),
        })
    }

    // Batch commit

    /// Atomic commit of a staged batch
    pub(crate) fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
        Ok(())
    }

    // Index key helpers

    fn index_prefix(tag: u8, user_id: UserId) -> Vec<u8> {
        let mut key = Vec::with_capacity(9);
        key.push(tag);
        key.extend_from_slice(&user_id.key_bytes());
        key
    }

    fn index_key_user_action(user_id: UserId, entry_id: Uuid) -> Vec<u8> {
        let mut key = Self::index_prefix(IDX_USER_ACTION, user_id);
        key.extend_from_slice(entry_id.as_bytes());
        key
    }

    fn index_key_user_invoice(user_id: UserId, invoice_id: &str) -> Vec<u8> {
        let mut key = Self::index_prefix(IDX_USER_INVOICE, user_id);
        key.extend_from_slice(invoice_id.as_bytes());
        key
    }

    fn promo_use_key(code: &str, user_id: UserId) -> Vec<u8> {
        let mut key = code.as_bytes().to_vec();
        key.push(b'|');
        key.extend_from_slice(&user_id.key_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn put_account(storage: &Storage, account: &Account) {
        let mut batch = WriteBatch::default();
        storage.batch_put_account(&mut batch, account).unwrap();
        storage.commit(batch).unwrap();
    }

    #[test]
    fn account_roundtrip() {
        let (storage, _temp) = test_storage();

        let mut account = Account::new(UserId::new(42), "alice", Some(UserId::new(7)));
        account.primary_balance = Decimal::new(1050, 2);
        put_account(&storage, &account);

        let read = storage.get_account(UserId::new(42)).unwrap();
        assert_eq!(read.display_name, "alice");
        assert_eq!(read.primary_balance, Decimal::new(1050, 2));
        assert_eq!(read.referrer_id, Some(UserId::new(7)));

        assert!(matches!(
            storage.get_account(UserId::new(99)),
            Err(Error::AccountNotFound(_))
        ));
    }

    #[test]
    fn invoice_roundtrip_and_pending_index() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(1);

        let mut batch = WriteBatch::default();
        for (id, status) in [("101", InvoiceState::Pending), ("102", InvoiceState::Paid)] {
            let invoice = Invoice {
                provider_invoice_id: id.to_string(),
                user_id: user,
                amount: Decimal::TEN,
                status,
                created_at: Utc::now(),
            };
            storage.batch_put_invoice(&mut batch, &invoice).unwrap();
        }
        storage.commit(batch).unwrap();

        let pending = storage.pending_invoices(user).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].provider_invoice_id, "101");

        // Another user's index is untouched
        assert!(storage.pending_invoices(UserId::new(2)).unwrap().is_empty());
    }

    #[test]
    fn atomic_batch_commits_all_rows() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(5);

        let account = Account::new(user, "bob", None);
        let invoice = Invoice {
            provider_invoice_id: "555".to_string(),
            user_id: user,
            amount: Decimal::TEN,
            status: InvoiceState::Paid,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        storage.batch_put_account(&mut batch, &account).unwrap();
        storage.batch_put_invoice(&mut batch, &invoice).unwrap();
        storage
            .batch_append_action(
                &mut batch,
                &ActionEntry::new(user, ActionKind::Deposit, Decimal::TEN, "invoice 555"),
            )
            .unwrap();
        storage.commit(batch).unwrap();

        assert!(storage.account_exists(user).unwrap());
        assert_eq!(
            storage.get_invoice("555").unwrap().status,
            InvoiceState::Paid
        );
        assert_eq!(storage.recent_actions(Some(user), 10).unwrap().len(), 1);
    }

    #[test]
    fn promo_use_uniqueness_key() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(3);

        assert!(!storage.promo_use_exists("WELCOME", user).unwrap());

        let mut batch = WriteBatch::default();
        storage
            .batch_put_promo_use(
                &mut batch,
                &PromoUse {
                    code: "WELCOME".to_string(),
                    user_id: user,
                    used_at: Utc::now(),
                },
            )
            .unwrap();
        storage.commit(batch).unwrap();

        assert!(storage.promo_use_exists("WELCOME", user).unwrap());
        assert!(!storage.promo_use_exists("WELCOME", UserId::new(4)).unwrap());
        assert!(!storage.promo_use_exists("OTHER", user).unwrap());
    }

    #[test]
    fn delete_promo_removes_uses() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(3);

        let promo = PromoCode {
            code: "GONE".to_string(),
            reward_amount: Decimal::ONE,
            max_activations: 10,
            current_activations: 1,
            expires_at: None,
            created_by: None,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        storage.batch_put_promo(&mut batch, &promo).unwrap();
        storage
            .batch_put_promo_use(
                &mut batch,
                &PromoUse {
                    code: "GONE".to_string(),
                    user_id: user,
                    used_at: Utc::now(),
                },
            )
            .unwrap();
        storage.commit(batch).unwrap();

        storage.delete_promo("GONE").unwrap();

        assert!(matches!(
            storage.get_promo("GONE"),
            Err(Error::PromoNotFound(_))
        ));
        assert!(!storage.promo_use_exists("GONE", user).unwrap());
    }

    #[test]
    fn recent_actions_newest_first() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(8);

        for i in 0..5 {
            let mut batch = WriteBatch::default();
            storage
                .batch_append_action(
                    &mut batch,
                    &ActionEntry::new(
                        user,
                        ActionKind::GameResult,
                        Decimal::from(i),
                        format!("game {i}"),
                    ),
                )
                .unwrap();
            storage.commit(batch).unwrap();
            // Keep UUIDv7 keys strictly time-ordered across entries
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let entries = storage.recent_actions(Some(user), 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].reason, "game 4");
        assert_eq!(entries[2].reason, "game 2");

        let all = storage.recent_actions(None, 100).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].reason, "game 4");
    }

    #[test]
    fn pending_withdrawals_filters_status_and_age() {
        let (storage, _temp) = test_storage();
        let user = UserId::new(9);

        let old_pending = Withdrawal {
            withdrawal_id: Uuid::now_v7(),
            user_id: user,
            amount: Decimal::ONE,
            status: WithdrawalStatus::Pending,
            transfer_id: None,
            created_at: Utc::now() - chrono::Duration::minutes(10),
        };
        let fresh_pending = Withdrawal {
            withdrawal_id: Uuid::now_v7(),
            user_id: user,
            amount: Decimal::ONE,
            status: WithdrawalStatus::Pending,
            transfer_id: None,
            created_at: Utc::now(),
        };
        let completed = Withdrawal {
            withdrawal_id: Uuid::now_v7(),
            user_id: user,
            amount: Decimal::ONE,
            status: WithdrawalStatus::Completed,
            transfer_id: Some("t1".to_string()),
            created_at: Utc::now() - chrono::Duration::minutes(10),
        };

        for wd in [&old_pending, &fresh_pending, &completed] {
            storage.put_withdrawal(wd).unwrap();
        }

        let cutoff = Utc::now() - chrono::Duration::minutes(5);
        let orphans = storage.pending_withdrawals(cutoff).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].withdrawal_id, old_pending.withdrawal_id);
    }

    #[test]
    fn leaderboards_rank_accounts() {
        let (storage, _temp) = test_storage();

        for (id, name, deposited, spent, referrals) in [
            (1u64, "a", 100, 5, 0u32),
            (2, "b", 50, 50, 3),
            (3, "c", 10, 90, 1),
        ] {
            let mut account = Account::new(UserId::new(id), name, None);
            account.total_deposited = Decimal::from(deposited);
            account.total_spent = Decimal::from(spent);
            account.referral_count = referrals;
            put_account(&storage, &account);
        }

        let tops = storage.leaderboards(2).unwrap();
        assert_eq!(tops.top_deposited[0].0, "a");
        assert_eq!(tops.top_spent[0].0, "c");
        assert_eq!(tops.top_referrals[0].0, "b");
        assert_eq!(tops.top_deposited.len(), 2);
    }
}
