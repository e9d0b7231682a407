use thiserror::Error;

use crate::models::OccurrenceKey;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Date input that is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),

    #[error("malformed occurrence key {0:?}, expected subject_Weekday_YYYY-MM-DD")]
    InvalidKey(String),

    #[error("unknown attendance status {0:?}")]
    UnknownStatus(String),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    #[error("{0} is not on the timetable")]
    NotScheduled(OccurrenceKey),

    #[error("cannot confirm {key}: {reason}")]
    Confirmation {
        key: OccurrenceKey,
        reason: ConfirmationError,
    },

    /// Status changes are refused once an occurrence has been confirmed.
    #[error("{0} is already confirmed and locked")]
    Locked(OccurrenceKey),

    #[error("no authenticated user")]
    NotAuthenticated,

    #[error("attendance store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("attendance store write failed: {0}")]
    StoreWrite(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("no status has been chosen")]
    NoStatus,
    #[error("already confirmed")]
    AlreadyLocked,
}

impl LedgerError {
    pub(crate) fn confirmation(key: &OccurrenceKey, reason: ConfirmationError) -> Self {
        LedgerError::Confirmation {
            key: key.clone(),
            reason,
        }
    }

    /// Store failures leave local state untouched and may be retried by the caller.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreUnavailable(_) | LedgerError::StoreWrite(_)
        )
    }

    /// Maps a sqlx failure onto the adapter taxonomy. Connection-level failures are
    /// always `StoreUnavailable`; anything else depends on whether we were writing.
    pub(crate) fn from_sqlx(err: sqlx::Error, writing: bool) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => LedgerError::StoreUnavailable(err.to_string()),
            other if writing => LedgerError::StoreWrite(other.to_string()),
            other => LedgerError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_are_unavailable_even_when_writing() {
        let err = LedgerError::from_sqlx(sqlx::Error::PoolTimedOut, true);
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }

    #[test]
    fn other_write_failures_are_write_errors() {
        let err = LedgerError::from_sqlx(sqlx::Error::RowNotFound, true);
        assert!(matches!(err, LedgerError::StoreWrite(_)));
        assert!(err.is_store_failure());

        let err = LedgerError::from_sqlx(sqlx::Error::RowNotFound, false);
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }

    #[test]
    fn not_authenticated_is_not_a_store_failure() {
        assert!(!LedgerError::NotAuthenticated.is_store_failure());
    }
}
