use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use attendance_ledger::config::{Config, DEFAULT_LOG_FILTER, DEFAULT_MAX_CONNECTIONS};
use attendance_ledger::db::{self, PgLedgerStore};
use attendance_ledger::{report, week, AttendanceSession, AttendanceStatus, LedgerStore};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "attendance-ledger")]
#[command(about = "Weekly class attendance ledger with safe-to-skip advice", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    /// Signed-in user id
    #[arg(long, env = "ATTENDANCE_USER", global = true)]
    user: Option<String>,
    #[arg(long, env = "ATTENDANCE_MAX_CONNECTIONS", global = true, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic timetable and history for the user
    Seed,
    /// Import confirmed attendance from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Register a subject or add weekdays to it
    AddSubject {
        #[arg(long)]
        name: String,
        /// Comma separated weekday names, e.g. Monday,Thursday
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
    },
    /// Show the timetable for the week containing a date
    Week {
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Choose and confirm a status for one lecture
    Mark {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        day: String,
        #[arg(long)]
        status: String,
        /// Any date in the lecture's week, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Attendance per subject
    Summary {
        #[arg(long)]
        today: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        today: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn date_or_today(value: Option<&str>) -> anyhow::Result<NaiveDate> {
    match value {
        Some(value) => Ok(week::parse_date(value)?),
        None => Ok(Utc::now().date_naive()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.database_url, cli.user, cli.max_connections)?;
    let pool = config.connect().await?;

    if let Commands::InitDb = cli.command {
        db::init_db(&pool).await?;
        println!("Schema ready.");
        return Ok(());
    }

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let mut session = AttendanceSession::new(store.clone(), config.user.clone());

    match cli.command {
        Commands::InitDb => {}
        Commands::Seed => {
            let user = session.user()?;
            let written = db::seed(store.as_ref(), user).await?;
            println!("Seeded {written} attendance records for {user}.");
        }
        Commands::Import { csv } => {
            let user = session.user()?;
            let imported = db::import_csv(store.as_ref(), user, &csv).await?;
            println!("Imported {imported} records from {}.", csv.display());
        }
        Commands::AddSubject { name, days } => {
            let days = days
                .iter()
                .map(|day| week::parse_weekday(day))
                .collect::<Result<Vec<_>, _>>()?;
            session.refresh_subjects().await?;
            let subject = session.add_subject(&name, &days).await?;
            println!(
                "{} meets on {}.",
                subject.name,
                subject.day_labels().join(", ")
            );
        }
        Commands::Week { date } => {
            let reference = date_or_today(date.as_deref())?;
            let plan = session.load_week(reference).await?;
            println!(
                "Week of {} (selected {})",
                week::format_display(week::week_start(reference)),
                week::format_display(reference)
            );
            for day in &plan.days {
                let marker = if day.highlighted { " <" } else { "" };
                println!(
                    "{} {}{}",
                    week::weekday_label(day.day),
                    week::format_display(day.date),
                    marker
                );
                if day.lectures.is_empty() {
                    println!("  no classes scheduled");
                }
                for lecture in &day.lectures {
                    let status = lecture
                        .entry
                        .status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unset".to_string());
                    let lock = if lecture.entry.locked { " (confirmed)" } else { "" };
                    println!("  - {}: {}{}", lecture.subject, status, lock);
                }
            }
        }
        Commands::Mark {
            subject,
            day,
            status,
            date,
        } => {
            let reference = date_or_today(date.as_deref())?;
            let day = week::parse_weekday(&day)?;
            let status: AttendanceStatus = status.parse()?;

            session.load_week(reference).await?;
            let key = session.scheduled_key(&subject, day, reference)?;
            session.set_status(&key, status)?;
            let record = match session.confirm(&key).await {
                Ok(record) => record,
                Err(err) if err.is_store_failure() => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("{key} was not locked, retry once the store is reachable")));
                }
                Err(err) => return Err(err).with_context(|| format!("could not confirm {key}")),
            };
            println!(
                "Confirmed {} for {} on {}.",
                record.status,
                subject,
                week::format_display(record.date)
            );
        }
        Commands::Summary { today, json } => {
            let today = date_or_today(today.as_deref())?;
            let dashboard = session.dashboard(today).await?;

            if json {
                let subjects: Vec<serde_json::Value> = dashboard
                    .subjects
                    .iter()
                    .map(|o| {
                        serde_json::json!({
                            "name": o.subject.name,
                            "days": o.subject.day_labels(),
                            "summary": o.summary,
                            "band": attendance_ledger::aggregate::band(&o.summary),
                            "next_class": o.next_class.map(|next| next.to_string()),
                        })
                    })
                    .collect();
                let body = serde_json::json!({
                    "today": week::format_iso(today),
                    "average_attendance": dashboard.average_attendance,
                    "subjects": subjects,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            if dashboard.subjects.is_empty() {
                println!("No subjects registered.");
                return Ok(());
            }
            for overview in &dashboard.subjects {
                let summary = &overview.summary;
                let next = overview
                    .next_class
                    .map(|next| next.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "- {}: {}% ({}/{} classes), next {}{}",
                    overview.subject.name,
                    summary.attendance_percent,
                    summary.attended_classes,
                    summary.total_classes,
                    next,
                    if summary.can_bunk {
                        format!(", safe to skip {}", summary.skippable_classes)
                    } else {
                        String::new()
                    }
                );
            }
            if let Some(average) = dashboard.average_attendance {
                println!("Average attendance: {average}%");
            }
        }
        Commands::Report { today, out } => {
            let today = date_or_today(today.as_deref())?;
            let user = session.user()?.clone();
            let dashboard = session.dashboard(today).await?;
            let report = report::build_report(user.as_str(), today, &dashboard);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
