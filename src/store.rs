//! Read/write contract against the attendance document store.
//!
//! Layout mirrors the hosted store: each user owns subjects, each subject owns
//! the confirmed records keyed by [`OccurrenceKey`]. Writes for the same key
//! overwrite each other; there are no transactions across subjects.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{LedgerError, Result};
use crate::models::{OccurrenceKey, OccurrenceRecord, Subject, UserId};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Schedule definitions for every subject the user registered.
    async fn list_subjects(&self, user: &UserId) -> Result<Vec<Subject>>;

    /// Full confirmed history of one subject, oldest first.
    async fn list_occurrences(&self, user: &UserId, subject: &str)
        -> Result<Vec<OccurrenceRecord>>;

    async fn get_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
    ) -> Result<Option<OccurrenceRecord>>;

    /// Registers a subject, merging its weekdays into any already stored.
    async fn write_subject(&self, user: &UserId, subject: &Subject) -> Result<()>;

    /// Upserts a confirmed record; last write for a key wins.
    async fn write_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
        record: &OccurrenceRecord,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
struct UserLedger {
    subjects: BTreeMap<String, Subject>,
    records: BTreeMap<String, BTreeMap<String, OccurrenceRecord>>,
}

/// Process-local store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    users: RwLock<HashMap<UserId, UserLedger>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every read fails with `StoreUnavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// While set, every write fails with `StoreWrite` and changes nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::StoreUnavailable(
                "memory store reads disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::StoreWrite(
                "memory store writes disabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn list_subjects(&self, user: &UserId) -> Result<Vec<Subject>> {
        self.check_read()?;
        let users = self.users.read().await;
        Ok(users
            .get(user)
            .map(|ledger| ledger.subjects.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_occurrences(
        &self,
        user: &UserId,
        subject: &str,
    ) -> Result<Vec<OccurrenceRecord>> {
        self.check_read()?;
        let users = self.users.read().await;
        let mut records: Vec<OccurrenceRecord> = users
            .get(user)
            .and_then(|ledger| ledger.records.get(subject))
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|record| record.date);
        Ok(records)
    }

    async fn get_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
    ) -> Result<Option<OccurrenceRecord>> {
        self.check_read()?;
        let users = self.users.read().await;
        Ok(users
            .get(user)
            .and_then(|ledger| ledger.records.get(subject))
            .and_then(|records| records.get(&key.to_string()))
            .cloned())
    }

    async fn write_subject(&self, user: &UserId, subject: &Subject) -> Result<()> {
        self.check_write()?;
        let mut users = self.users.write().await;
        let ledger = users.entry(user.clone()).or_default();
        ledger
            .subjects
            .entry(subject.name.clone())
            .and_modify(|stored| stored.add_days(subject.days.iter().copied()))
            .or_insert_with(|| subject.clone());
        Ok(())
    }

    async fn write_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
        record: &OccurrenceRecord,
    ) -> Result<()> {
        self.check_write()?;
        let mut users = self.users.write().await;
        users
            .entry(user.clone())
            .or_default()
            .records
            .entry(subject.to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}
