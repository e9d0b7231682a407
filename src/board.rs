//! Staged attendance for the occurrences a user is looking at.
//!
//! Each [`OccurrenceKey`] moves from unset to a chosen status and, once the
//! record has been written to the store, to locked. Locked entries never
//! change again for the lifetime of the board.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{ConfirmationError, LedgerError, Result};
use crate::models::{AttendanceStatus, OccurrenceKey, OccurrenceRecord, Subject, UserId};
use crate::store::LedgerStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardEntry {
    pub status: Option<AttendanceStatus>,
    pub locked: bool,
}

#[derive(Debug, Default)]
pub struct AttendanceBoard {
    entries: HashMap<OccurrenceKey, BoardEntry>,
}

impl AttendanceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &OccurrenceKey) -> BoardEntry {
        self.entries.get(key).copied().unwrap_or_default()
    }

    pub fn status(&self, key: &OccurrenceKey) -> Option<AttendanceStatus> {
        self.entry(key).status
    }

    pub fn is_locked(&self, key: &OccurrenceKey) -> bool {
        self.entry(key).locked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stages a status, replacing any earlier unconfirmed choice.
    pub fn set_status(&mut self, key: &OccurrenceKey, status: AttendanceStatus) -> Result<()> {
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.locked {
            return Err(LedgerError::Locked(key.clone()));
        }
        debug!(key = %key, status = %status, "staged attendance");
        entry.status = Some(status);
        Ok(())
    }

    /// Persists the staged status and locks the key.
    ///
    /// A key already recorded in the store is locked with the stored status and
    /// refused, even if this board never loaded its week. The lock is applied
    /// only after the store accepted the write, so a failed write leaves the
    /// staged status in place for a retry. Holding `&mut self` across the write
    /// keeps the entry from being restaged while it is pending.
    pub async fn confirm(
        &mut self,
        store: &dyn LedgerStore,
        user: &UserId,
        key: &OccurrenceKey,
    ) -> Result<OccurrenceRecord> {
        let entry = self.entry(key);
        if entry.locked {
            return Err(LedgerError::confirmation(key, ConfirmationError::AlreadyLocked));
        }
        let status = entry
            .status
            .ok_or_else(|| LedgerError::confirmation(key, ConfirmationError::NoStatus))?;

        if let Some(stored) = store.get_occurrence(user, key.subject(), key).await? {
            self.mark_confirmed(key, stored.status);
            warn!(key = %key, status = %stored.status, "occurrence already confirmed in store");
            return Err(LedgerError::confirmation(key, ConfirmationError::AlreadyLocked));
        }

        let record = OccurrenceRecord::for_key(key, status);
        if let Err(err) = store
            .write_occurrence(user, key.subject(), key, &record)
            .await
        {
            warn!(key = %key, error = %err, "attendance write failed");
            return Err(err);
        }

        self.mark_confirmed(key, status);
        info!(key = %key, status = %status, "attendance confirmed");
        Ok(record)
    }

    /// Records that `key` already has a persisted status.
    pub fn mark_confirmed(&mut self, key: &OccurrenceKey, status: AttendanceStatus) {
        self.entries.insert(
            key.clone(),
            BoardEntry {
                status: Some(status),
                locked: true,
            },
        );
    }

    /// Replaces the board with the confirmed records of the week containing
    /// `reference`. On a store failure the board is left as it was.
    pub async fn load_week(
        &mut self,
        store: &dyn LedgerStore,
        user: &UserId,
        subjects: &[Subject],
        reference: NaiveDate,
    ) -> Result<usize> {
        let mut loaded = AttendanceBoard::new();
        for subject in subjects {
            for day in &subject.days {
                let key = OccurrenceKey::for_week(subject.name.as_str(), *day, reference);
                if let Some(record) = store.get_occurrence(user, &subject.name, &key).await? {
                    loaded.mark_confirmed(&key, record.status);
                }
            }
        }
        let count = loaded.len();
        debug!(reference = %reference, locked = count, "loaded week");
        *self = loaded;
        Ok(count)
    }
}
