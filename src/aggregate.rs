use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{
    AggregateSummary, AttendanceBand, NextClass, OccurrenceRecord, StatusCounts, Subject,
};
use crate::week;

/// Attendance must stay strictly above this percentage for skipping to be safe.
pub const BUNK_THRESHOLD: u32 = 75;

const GOOD_THRESHOLD: u32 = 80;

pub fn summarize(records: &[OccurrenceRecord]) -> AggregateSummary {
    let mut counts = StatusCounts::default();
    for record in records {
        counts.record(record.status);
    }

    let total_classes = counts.attending + counts.missed + counts.cancelled + counts.proxy;
    let attended_classes = counts.attending + counts.proxy;
    let attendance_percent = attendance_percent(attended_classes, total_classes);
    let can_bunk = attendance_percent > BUNK_THRESHOLD;

    AggregateSummary {
        counts,
        total_classes,
        attended_classes,
        attendance_percent,
        can_bunk,
        skippable_classes: skippable_classes(attended_classes, total_classes),
    }
}

/// `attended / total` as a whole percentage, halves rounded up; 0 when nothing was held.
pub fn attendance_percent(attended: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (attended, total) = (u64::from(attended), u64::from(total));
    ((attended * 200 + total) / (total * 2)) as u32
}

/// How many upcoming classes can be missed in a row with the percentage
/// staying above [`BUNK_THRESHOLD`].
pub fn skippable_classes(attended: u32, total: u32) -> u32 {
    let mut skipped = 0;
    while attendance_percent(attended, total + skipped + 1) > BUNK_THRESHOLD {
        skipped += 1;
    }
    skipped
}

pub fn band(summary: &AggregateSummary) -> AttendanceBand {
    match summary.attendance_percent {
        p if p >= GOOD_THRESHOLD => AttendanceBand::Good,
        p if p >= BUNK_THRESHOLD => AttendanceBand::Warning,
        _ => AttendanceBand::AtRisk,
    }
}

/// Nearest scheduled class on or after `today`.
///
/// Ties between equal offsets go to the lowest Sunday-based weekday index.
pub fn predict_next(subject: &Subject, today: NaiveDate) -> Option<NextClass> {
    let today_index = week::day_index(today.weekday());
    subject
        .days
        .iter()
        .map(|day| {
            let index = week::day_index(*day);
            ((index + 7 - today_index) % 7, index, *day)
        })
        .min_by_key(|(offset, index, _)| (*offset, *index))
        .map(|(offset, _, day)| NextClass {
            day,
            date: today + Duration::days(offset),
        })
}

/// Mean attendance over subjects that have any confirmed classes, rounded like
/// [`attendance_percent`].
pub fn average_attendance(summaries: &[AggregateSummary]) -> Option<u32> {
    let held: Vec<u32> = summaries
        .iter()
        .filter(|summary| summary.total_classes > 0)
        .map(|summary| summary.attendance_percent)
        .collect();
    if held.is_empty() {
        return None;
    }
    let sum: u32 = held.iter().sum();
    Some(attendance_percent(sum, held.len() as u32 * 100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records(spec: &[(AttendanceStatus, usize)]) -> Vec<OccurrenceRecord> {
        let start = date(2026, 8, 3);
        let mut out = Vec::new();
        for (status, count) in spec {
            for _ in 0..*count {
                let day = start + Duration::days(out.len() as i64 * 7);
                out.push(OccurrenceRecord {
                    date: day,
                    day: day.weekday(),
                    status: *status,
                });
            }
        }
        out
    }

    #[test]
    fn empty_history_is_zero_and_unsafe() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_classes, 0);
        assert_eq!(summary.attendance_percent, 0);
        assert!(!summary.can_bunk);
        assert_eq!(summary.skippable_classes, 0);
    }

    #[test]
    fn proxies_count_as_attended() {
        let summary = summarize(&records(&[
            (AttendanceStatus::Attending, 6),
            (AttendanceStatus::Missed, 2),
            (AttendanceStatus::Proxy, 2),
        ]));
        assert_eq!(summary.total_classes, 10);
        assert_eq!(summary.attended_classes, 8);
        assert_eq!(summary.counts.proxy, 2);
        assert_eq!(summary.attendance_percent, 80);
        assert!(summary.can_bunk);
        assert_eq!(band(&summary), AttendanceBand::Good);
    }

    #[test]
    fn exactly_three_quarters_is_not_safe() {
        let summary = summarize(&records(&[
            (AttendanceStatus::Attending, 3),
            (AttendanceStatus::Missed, 1),
        ]));
        assert_eq!(summary.attendance_percent, 75);
        assert!(!summary.can_bunk);
        assert_eq!(band(&summary), AttendanceBand::Warning);
    }

    #[test]
    fn cancelled_classes_count_toward_the_total() {
        let summary = summarize(&records(&[
            (AttendanceStatus::Attending, 1),
            (AttendanceStatus::Cancelled, 1),
        ]));
        assert_eq!(summary.total_classes, 2);
        assert_eq!(summary.attendance_percent, 50);
        assert_eq!(band(&summary), AttendanceBand::AtRisk);
    }

    #[test]
    fn percentages_round_half_up() {
        assert_eq!(attendance_percent(1, 8), 13);
        assert_eq!(attendance_percent(2, 3), 67);
        assert_eq!(attendance_percent(1, 3), 33);
        assert_eq!(attendance_percent(0, 0), 0);
    }

    #[test]
    fn skippable_classes_keep_attendance_above_threshold() {
        // 8/10 -> 8/11 = 73%, so none can be skipped despite being safe right now.
        assert_eq!(skippable_classes(8, 10), 0);
        // 19/20 -> 19/24 = 79%, 19/25 = 76%, 19/26 = 73%.
        assert_eq!(skippable_classes(19, 20), 5);
        assert_eq!(skippable_classes(3, 4), 0);
    }

    #[test]
    fn next_class_is_the_nearest_scheduled_day() {
        let physics = Subject::new("Physics", [Weekday::Mon, Weekday::Thu]);
        let wednesday = date(2026, 10, 14);
        let next = predict_next(&physics, wednesday).unwrap();
        assert_eq!(next.day, Weekday::Thu);
        assert_eq!(next.date, date(2026, 10, 15));
    }

    #[test]
    fn a_class_today_is_the_next_class() {
        let physics = Subject::new("Physics", [Weekday::Mon, Weekday::Thu]);
        let thursday = date(2026, 10, 15);
        assert_eq!(predict_next(&physics, thursday).unwrap().date, thursday);
    }

    #[test]
    fn next_class_wraps_into_the_following_week() {
        let physics = Subject::new("Physics", [Weekday::Mon, Weekday::Thu]);
        let friday = date(2026, 10, 16);
        let next = predict_next(&physics, friday).unwrap();
        assert_eq!(next.day, Weekday::Mon);
        assert_eq!(next.date, date(2026, 10, 19));
    }

    #[test]
    fn duplicated_weekdays_resolve_deterministically() {
        let subject = Subject {
            name: "Chem".to_string(),
            days: vec![Weekday::Thu, Weekday::Thu],
        };
        let next = predict_next(&subject, date(2026, 10, 15)).unwrap();
        assert_eq!(next.day, Weekday::Thu);
        assert_eq!(next.date, date(2026, 10, 15));
    }

    #[test]
    fn subjects_without_days_have_no_next_class() {
        let subject = Subject::new("Seminar", Vec::<Weekday>::new());
        assert!(predict_next(&subject, date(2026, 10, 15)).is_none());
    }

    #[test]
    fn average_ignores_subjects_without_history() {
        let good = summarize(&records(&[(AttendanceStatus::Attending, 4)]));
        let half = summarize(&records(&[
            (AttendanceStatus::Attending, 1),
            (AttendanceStatus::Missed, 1),
        ]));
        let empty = summarize(&[]);
        assert_eq!(average_attendance(&[good, half, empty]), Some(75));
        assert_eq!(average_attendance(&[empty]), None);
    }
}
