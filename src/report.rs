use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate;
use crate::models::{AttendanceBand, AttendanceStatus, StatusCounts, SubjectOverview};
use crate::session::Dashboard;
use crate::week;

pub fn status_mix(subjects: &[SubjectOverview]) -> StatusCounts {
    let mut mix = StatusCounts::default();
    for overview in subjects {
        let counts = overview.summary.counts;
        mix.attending += counts.attending;
        mix.missed += counts.missed;
        mix.cancelled += counts.cancelled;
        mix.proxy += counts.proxy;
    }
    mix
}

fn band_label(band: AttendanceBand) -> &'static str {
    match band {
        AttendanceBand::Good => "good",
        AttendanceBand::Warning => "warning",
        AttendanceBand::AtRisk => "at risk",
    }
}

pub fn build_report(user: &str, today: NaiveDate, dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        user,
        week::format_display(today)
    );
    let _ = writeln!(output);

    match dashboard.average_attendance {
        Some(average) => {
            let _ = writeln!(output, "Average attendance: {}%", average);
        }
        None => {
            let _ = writeln!(output, "Average attendance: no confirmed classes yet");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if dashboard.subjects.is_empty() {
        let _ = writeln!(output, "No subjects registered.");
    } else {
        let _ = writeln!(
            output,
            "| Subject | Attended | Total | Attendance | Status | Safe to skip |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for overview in &dashboard.subjects {
            let summary = &overview.summary;
            let skip = if summary.can_bunk {
                format!("yes ({})", summary.skippable_classes)
            } else {
                "no".to_string()
            };
            let _ = writeln!(
                output,
                "| {} | {} | {} | {}% | {} | {} |",
                overview.subject.name,
                summary.attended_classes,
                summary.total_classes,
                summary.attendance_percent,
                band_label(aggregate::band(summary)),
                skip
            );
        }
    }

    let mix = status_mix(&dashboard.subjects);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    for status in AttendanceStatus::ALL {
        let _ = writeln!(output, "- {}: {}", status, mix.get(status));
    }

    let at_risk: Vec<&SubjectOverview> = dashboard
        .subjects
        .iter()
        .filter(|o| o.summary.total_classes > 0 && !o.summary.can_bunk)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if at_risk.is_empty() {
        let _ = writeln!(output, "Every subject with history is above 75%.");
    } else {
        for overview in at_risk {
            let _ = writeln!(
                output,
                "- {} at {}% ({} of {} classes)",
                overview.subject.name,
                overview.summary.attendance_percent,
                overview.summary.attended_classes,
                overview.summary.total_classes
            );
        }
    }

    let mut upcoming: Vec<&SubjectOverview> = dashboard
        .subjects
        .iter()
        .filter(|o| o.next_class.is_some())
        .collect();
    upcoming.sort_by_key(|o| o.next_class.map(|next| next.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Classes");

    if upcoming.is_empty() {
        let _ = writeln!(output, "No classes scheduled.");
    } else {
        for overview in upcoming {
            if let Some(next) = overview.next_class {
                let _ = writeln!(output, "- {}: {}", overview.subject.name, next);
            }
        }
    }

    output
}
