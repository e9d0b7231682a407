use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::models::{AttendanceStatus, OccurrenceKey, OccurrenceRecord, Subject, UserId};
use crate::store::LedgerStore;
use crate::week;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        PgLedgerStore { pool }
    }
}

fn read_err(err: sqlx::Error) -> LedgerError {
    LedgerError::from_sqlx(err, false)
}

fn write_err(err: sqlx::Error) -> LedgerError {
    LedgerError::from_sqlx(err, true)
}

/// Stored rows are skipped rather than failing the whole read when a label is
/// no longer understood.
fn record_from_row(row: &PgRow) -> Result<Option<OccurrenceRecord>> {
    let date: NaiveDate = row.try_get("date").map_err(read_err)?;
    let day: String = row.try_get("day").map_err(read_err)?;
    let status: String = row.try_get("status").map_err(read_err)?;

    let day = match week::parse_weekday(&day) {
        Ok(day) => day,
        Err(err) => {
            warn!(%date, error = %err, "skipping attendance record");
            return Ok(None);
        }
    };
    let status = match status.parse::<AttendanceStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(%date, error = %err, "skipping attendance record");
            return Ok(None);
        }
    };
    Ok(Some(OccurrenceRecord { date, day, status }))
}

fn subject_from_row(row: &PgRow) -> Result<Subject> {
    let name: String = row.try_get("name").map_err(read_err)?;
    let labels: Vec<String> = row.try_get("days").map_err(read_err)?;
    let mut days = Vec::with_capacity(labels.len());
    for label in labels {
        match week::parse_weekday(&label) {
            Ok(day) => days.push(day),
            Err(err) => warn!(subject = %name, error = %err, "ignoring stored weekday"),
        }
    }
    Ok(Subject::new(name, days))
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn list_subjects(&self, user: &UserId) -> Result<Vec<Subject>> {
        let rows = sqlx::query(
            "SELECT name, days FROM attendance_ledger.subjects \
             WHERE user_id = $1 ORDER BY name",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        rows.iter().map(subject_from_row).collect()
    }

    async fn list_occurrences(
        &self,
        user: &UserId,
        subject: &str,
    ) -> Result<Vec<OccurrenceRecord>> {
        let rows = sqlx::query(
            "SELECT date, day, status FROM attendance_ledger.records \
             WHERE user_id = $1 AND subject = $2 ORDER BY date, occurrence_key",
        )
        .bind(user.as_str())
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(record) = record_from_row(row)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn get_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
    ) -> Result<Option<OccurrenceRecord>> {
        let row = sqlx::query(
            "SELECT date, day, status FROM attendance_ledger.records \
             WHERE user_id = $1 AND subject = $2 AND occurrence_key = $3",
        )
        .bind(user.as_str())
        .bind(subject)
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;

        match row {
            Some(row) => record_from_row(&row),
            None => Ok(None),
        }
    }

    async fn write_subject(&self, user: &UserId, subject: &Subject) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_ledger.subjects (user_id, name, days)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, name) DO UPDATE
            SET days = ARRAY(
                SELECT DISTINCT unnest(attendance_ledger.subjects.days || EXCLUDED.days)
            )
            "#,
        )
        .bind(user.as_str())
        .bind(&subject.name)
        .bind(subject.day_labels())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn write_occurrence(
        &self,
        user: &UserId,
        subject: &str,
        key: &OccurrenceKey,
        record: &OccurrenceRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_ledger.records
            (id, user_id, subject, occurrence_key, date, day, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, subject, occurrence_key) DO UPDATE
            SET date = EXCLUDED.date,
                day = EXCLUDED.day,
                status = EXCLUDED.status,
                recorded_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.as_str())
        .bind(subject)
        .bind(key.to_string())
        .bind(record.date)
        .bind(week::weekday_label(record.day))
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }
}

/// Writes `record` unless the key is already confirmed. Confirmed records are
/// immutable, so bulk loads skip them rather than overwrite.
async fn write_unconfirmed(
    store: &dyn LedgerStore,
    user: &UserId,
    key: &OccurrenceKey,
    status: AttendanceStatus,
) -> Result<bool> {
    if let Some(existing) = store.get_occurrence(user, key.subject(), key).await? {
        if existing.status != status {
            warn!(key = %key, stored = %existing.status, incoming = %status, "skipping confirmed occurrence");
        }
        return Ok(false);
    }
    store
        .write_occurrence(user, key.subject(), key, &OccurrenceRecord::for_key(key, status))
        .await?;
    Ok(true)
}

/// Loads a realistic timetable and a few weeks of confirmed history.
pub async fn seed(store: &dyn LedgerStore, user: &UserId) -> anyhow::Result<usize> {
    let subjects = vec![
        Subject::new("Physics", [Weekday::Mon, Weekday::Thu]),
        Subject::new("Maths", [Weekday::Tue, Weekday::Wed, Weekday::Fri]),
        Subject::new("Chemistry Lab", [Weekday::Sat]),
    ];
    for subject in &subjects {
        store.write_subject(user, subject).await?;
    }

    let history = vec![
        ("Physics", "2026-09-28", AttendanceStatus::Attending),
        ("Physics", "2026-10-01", AttendanceStatus::Attending),
        ("Physics", "2026-10-05", AttendanceStatus::Proxy),
        ("Physics", "2026-10-08", AttendanceStatus::Missed),
        ("Maths", "2026-09-29", AttendanceStatus::Attending),
        ("Maths", "2026-09-30", AttendanceStatus::Missed),
        ("Maths", "2026-10-02", AttendanceStatus::Missed),
        ("Maths", "2026-10-06", AttendanceStatus::Cancelled),
        ("Chemistry Lab", "2026-10-03", AttendanceStatus::Attending),
        ("Chemistry Lab", "2026-10-10", AttendanceStatus::Attending),
    ];

    let mut written = 0usize;
    for (subject, date, status) in history {
        let date = week::parse_date(date).context("invalid seed date")?;
        let key = OccurrenceKey::new(subject, date.weekday(), date);
        if write_unconfirmed(store, user, &key, status).await? {
            written += 1;
        }
    }

    info!(user = %user, records = written, "seed data loaded");
    Ok(written)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    subject: String,
    date: String,
    status: String,
    day: Option<String>,
}

/// Imports confirmed attendance from a `subject,date,status[,day]` CSV.
///
/// Each row also registers its weekday on the subject. Rows for occurrences
/// that are already confirmed are skipped. Returns rows written.
pub async fn import_csv(
    store: &dyn LedgerStore,
    user: &UserId,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed row {}", line + 1))?;
        let subject =
            Subject::validate_name(&row.subject).with_context(|| format!("row {}", line + 1))?;
        let date = week::parse_date(&row.date).with_context(|| format!("row {}", line + 1))?;
        let status: AttendanceStatus = row
            .status
            .parse()
            .with_context(|| format!("row {}", line + 1))?;
        let day = match row.day.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => {
                week::parse_weekday(label).with_context(|| format!("row {}", line + 1))?
            }
            _ => date.weekday(),
        };

        store
            .write_subject(user, &Subject::new(subject, [day]))
            .await?;
        let key = OccurrenceKey::new(subject, day, week::resolve_date(date, day));
        if write_unconfirmed(store, user, &key, status).await? {
            imported += 1;
        }
    }

    info!(user = %user, records = imported, path = %csv_path.display(), "attendance imported");
    Ok(imported)
}
