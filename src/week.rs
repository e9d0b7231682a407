//! Calendar helpers: weekday names, ISO and display date formats, and the
//! resolution of a weekday to a concrete date within a reference week.
//!
//! Weeks run Sunday to Saturday internally. The display week used by the
//! timetable runs Monday to Saturday and folds Sunday onto Saturday; that
//! folding only happens through [`display_day`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{LedgerError, Result};

/// Weekdays shown as timetable columns, in order.
pub const DISPLAY_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

const ISO_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%Y";

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_FORMAT)
        .map_err(|_| LedgerError::InvalidDate(value.to_string()))
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Parses a full English weekday name, ignoring case and surrounding whitespace.
pub fn parse_weekday(value: &str) -> Result<Weekday> {
    let trimmed = value.trim();
    ALL_DAYS
        .iter()
        .copied()
        .find(|day| weekday_label(*day).eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| LedgerError::UnknownWeekday(value.to_string()))
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// 0 = Sunday .. 6 = Saturday.
pub fn day_index(day: Weekday) -> i64 {
    i64::from(day.num_days_from_sunday())
}

/// Date of `weekday` within the Sunday-to-Saturday week containing `reference`.
///
/// Every reference date of one week yields the same result for a given weekday.
pub fn resolve_date(reference: NaiveDate, weekday: Weekday) -> NaiveDate {
    let diff = day_index(weekday) - day_index(reference.weekday());
    reference + Duration::days(diff)
}

pub fn week_start(reference: NaiveDate) -> NaiveDate {
    resolve_date(reference, Weekday::Sun)
}

/// Timetable column for a date: Sunday is shown under Saturday.
pub fn display_day(date: NaiveDate) -> Weekday {
    match date.weekday() {
        Weekday::Sun => Weekday::Sat,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn every_day_of_a_week_resolves_to_the_same_date() {
        let sunday = date(2026, 10, 11);
        for offset in 0..7 {
            let reference = sunday + Duration::days(offset);
            assert_eq!(resolve_date(reference, Weekday::Thu), date(2026, 10, 15));
            assert_eq!(resolve_date(reference, Weekday::Sun), sunday);
            assert_eq!(resolve_date(reference, Weekday::Sat), date(2026, 10, 17));
        }
    }

    #[test]
    fn resolving_twice_is_stable() {
        let reference = date(2026, 10, 14);
        let once = resolve_date(reference, Weekday::Mon);
        assert_eq!(once, date(2026, 10, 12));
        assert_eq!(resolve_date(once, Weekday::Mon), once);
    }

    #[test]
    fn weeks_crossing_a_year_boundary_resolve_correctly() {
        let reference = date(2026, 12, 31);
        assert_eq!(resolve_date(reference, Weekday::Sun), date(2026, 12, 27));
        assert_eq!(resolve_date(reference, Weekday::Sat), date(2027, 1, 2));
        assert_eq!(week_start(date(2027, 1, 2)), date(2026, 12, 27));
    }

    #[test]
    fn sunday_belongs_to_the_following_saturday_week() {
        let sunday = date(2026, 10, 11);
        assert_eq!(resolve_date(sunday, Weekday::Mon), date(2026, 10, 12));
        assert_eq!(display_day(sunday), Weekday::Sat);
        assert_eq!(display_day(date(2026, 10, 14)), Weekday::Wed);
    }

    #[test]
    fn parses_weekday_names_case_insensitively() {
        assert_eq!(parse_weekday("monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday(" Saturday ").unwrap(), Weekday::Sat);
        assert!(matches!(
            parse_weekday("Mon"),
            Err(LedgerError::UnknownWeekday(_))
        ));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(
            parse_date("2026-02-30"),
            Err(LedgerError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_date("14/10/2026"),
            Err(LedgerError::InvalidDate(_))
        ));
        assert_eq!(parse_date("2026-10-14").unwrap(), date(2026, 10, 14));
    }

    #[test]
    fn formats_iso_and_display_dates() {
        let d = date(2026, 3, 5);
        assert_eq!(format_iso(d), "2026-03-05");
        assert_eq!(format_display(d), "05/03/2026");
    }
}
