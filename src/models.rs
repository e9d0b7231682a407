use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::week;

/// Identity of the signed-in student whose ledger is being read or written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Blank ids are treated as "nobody signed in".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(UserId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A course and the weekdays it recurs on, kept in Sunday-first order
/// without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub days: Vec<Weekday>,
}

impl Subject {
    pub fn new(name: impl Into<String>, days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut subject = Subject {
            name: name.into(),
            days: Vec::new(),
        };
        subject.add_days(days);
        subject
    }

    /// Trimmed subject name, rejecting blanks and names that would split a
    /// store path.
    pub fn validate_name(name: &str) -> Result<&str, LedgerError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidSubject("name is empty".to_string()));
        }
        if trimmed.contains('/') {
            return Err(LedgerError::InvalidSubject(format!(
                "{trimmed:?} contains '/'"
            )));
        }
        Ok(trimmed)
    }

    pub fn add_days(&mut self, days: impl IntoIterator<Item = Weekday>) {
        for day in days {
            if !self.days.contains(&day) {
                self.days.push(day);
            }
        }
        self.days.sort_by_key(|day| week::day_index(*day));
    }

    pub fn meets_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn day_labels(&self) -> Vec<String> {
        self.days
            .iter()
            .map(|day| week::weekday_label(*day).to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Attending,
    Missed,
    Cancelled,
    Proxy,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Attending,
        AttendanceStatus::Missed,
        AttendanceStatus::Cancelled,
        AttendanceStatus::Proxy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "attending",
            AttendanceStatus::Missed => "missed",
            AttendanceStatus::Cancelled => "cancelled",
            AttendanceStatus::Proxy => "proxy",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        AttendanceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LedgerError::UnknownStatus(value.to_string()))
    }
}

/// Identity of one dated lecture: `"{subject}_{Weekday}_{YYYY-MM-DD}"`.
///
/// Weekday labels and ISO dates never contain `_`, so the last two segments
/// are always recoverable from the right and subject names may contain `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    subject: String,
    day: Weekday,
    date: NaiveDate,
}

impl OccurrenceKey {
    pub fn new(subject: impl Into<String>, day: Weekday, date: NaiveDate) -> Self {
        OccurrenceKey {
            subject: subject.into(),
            day,
            date,
        }
    }

    /// Key for `day` in the week containing `reference`.
    pub fn for_week(subject: impl Into<String>, day: Weekday, reference: NaiveDate) -> Self {
        OccurrenceKey::new(subject, day, week::resolve_date(reference, day))
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.subject,
            week::weekday_label(self.day),
            week::format_iso(self.date)
        )
    }
}

impl FromStr for OccurrenceKey {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.rsplitn(3, '_');
        let date = parts.next().unwrap_or_default();
        let (day, subject) = match (parts.next(), parts.next()) {
            (Some(day), Some(subject)) if !subject.is_empty() => (day, subject),
            _ => return Err(LedgerError::InvalidKey(value.to_string())),
        };
        Ok(OccurrenceKey::new(
            subject,
            week::parse_weekday(day)?,
            week::parse_date(date)?,
        ))
    }
}

/// A confirmed occurrence as persisted in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceRecord {
    pub date: NaiveDate,
    pub day: Weekday,
    pub status: AttendanceStatus,
}

impl OccurrenceRecord {
    pub fn for_key(key: &OccurrenceKey, status: AttendanceStatus) -> Self {
        OccurrenceRecord {
            date: key.date(),
            day: key.day(),
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub attending: u32,
    pub missed: u32,
    pub cancelled: u32,
    pub proxy: u32,
}

impl StatusCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Attending => self.attending += 1,
            AttendanceStatus::Missed => self.missed += 1,
            AttendanceStatus::Cancelled => self.cancelled += 1,
            AttendanceStatus::Proxy => self.proxy += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Attending => self.attending,
            AttendanceStatus::Missed => self.missed,
            AttendanceStatus::Cancelled => self.cancelled,
            AttendanceStatus::Proxy => self.proxy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceBand {
    Good,
    Warning,
    AtRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateSummary {
    pub counts: StatusCounts,
    pub total_classes: u32,
    pub attended_classes: u32,
    pub attendance_percent: u32,
    pub can_bunk: bool,
    /// Upcoming classes that can be missed in a row while staying above the threshold.
    pub skippable_classes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextClass {
    pub day: Weekday,
    pub date: NaiveDate,
}

impl fmt::Display for NextClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            week::weekday_label(self.day),
            week::format_display(self.date)
        )
    }
}

#[derive(Debug, Clone)]
pub struct SubjectOverview {
    pub subject: Subject,
    pub summary: AggregateSummary,
    pub next_class: Option<NextClass>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn key_uses_subject_weekday_and_iso_date() {
        let key = OccurrenceKey::new("Physics", Weekday::Mon, date(2026, 10, 12));
        assert_eq!(key.to_string(), "Physics_Monday_2026-10-12");
    }

    #[test]
    fn key_is_the_same_from_any_day_of_the_week() {
        let from_wednesday = OccurrenceKey::for_week("Physics", Weekday::Thu, date(2026, 10, 14));
        let from_saturday = OccurrenceKey::for_week("Physics", Weekday::Thu, date(2026, 10, 17));
        assert_eq!(from_wednesday, from_saturday);
        assert_eq!(from_wednesday.to_string(), "Physics_Thursday_2026-10-15");
    }

    #[test]
    fn subjects_containing_underscores_stay_distinct() {
        let a = OccurrenceKey::new("Lab_Monday", Weekday::Tue, date(2026, 10, 13));
        let b = OccurrenceKey::new("Lab", Weekday::Mon, date(2026, 10, 12));
        assert_ne!(a.to_string(), b.to_string());

        let parsed: OccurrenceKey = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
        assert_eq!(parsed.subject(), "Lab_Monday");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(
            "Physics".parse::<OccurrenceKey>(),
            Err(LedgerError::InvalidKey(_))
        ));
        assert!(matches!(
            "Monday_2026-10-12".parse::<OccurrenceKey>(),
            Err(LedgerError::InvalidKey(_))
        ));
        assert!(matches!(
            "Physics_Funday_2026-10-12".parse::<OccurrenceKey>(),
            Err(LedgerError::UnknownWeekday(_))
        ));
        assert!(matches!(
            "Physics_Monday_12-10-2026".parse::<OccurrenceKey>(),
            Err(LedgerError::InvalidDate(_))
        ));
    }

    #[test]
    fn statuses_parse_from_stored_labels() {
        assert_eq!("proxy".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Proxy);
        assert_eq!(
            "Attending".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Attending
        );
        assert!(matches!(
            "present".parse::<AttendanceStatus>(),
            Err(LedgerError::UnknownStatus(_))
        ));
    }

    #[test]
    fn subject_days_are_deduplicated_and_ordered() {
        let mut subject = Subject::new("Maths", [Weekday::Fri, Weekday::Mon, Weekday::Fri]);
        assert_eq!(subject.days, vec![Weekday::Mon, Weekday::Fri]);
        subject.add_days([Weekday::Sun, Weekday::Mon]);
        assert_eq!(subject.days, vec![Weekday::Sun, Weekday::Mon, Weekday::Fri]);
        assert_eq!(subject.day_labels(), vec!["Sunday", "Monday", "Friday"]);
    }

    #[test]
    fn subject_names_are_trimmed_and_checked() {
        assert_eq!(Subject::validate_name("  Physics ").unwrap(), "Physics");
        assert!(matches!(
            Subject::validate_name("   "),
            Err(LedgerError::InvalidSubject(_))
        ));
        assert!(matches!(
            Subject::validate_name("Maths/II"),
            Err(LedgerError::InvalidSubject(_))
        ));
    }

    #[test]
    fn blank_user_ids_are_not_users() {
        assert!(UserId::new("   ").is_none());
        assert_eq!(UserId::new(" uid-42 ").unwrap().as_str(), "uid-42");
    }

    #[test]
    fn next_class_displays_weekday_and_day_first_date() {
        let next = NextClass {
            day: Weekday::Thu,
            date: date(2026, 10, 15),
        };
        assert_eq!(next.to_string(), "Thursday 15/10/2026");
    }
}
