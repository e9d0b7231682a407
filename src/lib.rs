//! Weekly attendance ledger: resolves a timetable onto calendar weeks, stages
//! and locks per-lecture attendance, and aggregates the confirmed history into
//! attendance percentages and a safe-to-skip advisory.

pub mod aggregate;
pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod session;
pub mod store;
pub mod week;

pub use error::{ConfirmationError, LedgerError, Result};
pub use models::{
    AggregateSummary, AttendanceStatus, NextClass, OccurrenceKey, OccurrenceRecord, Subject,
    UserId,
};
pub use session::AttendanceSession;
pub use store::{LedgerStore, MemoryLedgerStore};
