//! One signed-in student's view of their ledger.
//!
//! The session owns the staged board and the cached timetable. Every call
//! that reaches the store first checks that a user is signed in.

use std::sync::Arc;

use chrono::{NaiveDate, Weekday};
use tracing::info;

use crate::aggregate;
use crate::board::{AttendanceBoard, BoardEntry};
use crate::error::{LedgerError, Result};
use crate::models::{
    AggregateSummary, AttendanceStatus, OccurrenceKey, OccurrenceRecord, Subject,
    SubjectOverview, UserId,
};
use crate::store::LedgerStore;
use crate::week;

#[derive(Debug, Clone)]
pub struct PlannedLecture {
    pub subject: String,
    pub key: OccurrenceKey,
    pub entry: BoardEntry,
}

#[derive(Debug, Clone)]
pub struct PlannedDay {
    pub day: Weekday,
    pub date: NaiveDate,
    pub highlighted: bool,
    pub lectures: Vec<PlannedLecture>,
}

/// Timetable for one Sunday-to-Saturday week. Sunday only appears when a
/// subject actually meets on it, and then leads the list; Monday to Saturday
/// follow in order.
#[derive(Debug, Clone)]
pub struct WeekPlan {
    pub reference: NaiveDate,
    pub days: Vec<PlannedDay>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub subjects: Vec<SubjectOverview>,
    pub average_attendance: Option<u32>,
}

pub struct AttendanceSession {
    store: Arc<dyn LedgerStore>,
    user: Option<UserId>,
    subjects: Vec<Subject>,
    board: AttendanceBoard,
}

impl AttendanceSession {
    pub fn new(store: Arc<dyn LedgerStore>, user: Option<UserId>) -> Self {
        AttendanceSession {
            store,
            user,
            subjects: Vec::new(),
            board: AttendanceBoard::new(),
        }
    }

    pub fn user(&self) -> Result<&UserId> {
        self.user.as_ref().ok_or(LedgerError::NotAuthenticated)
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub async fn refresh_subjects(&mut self) -> Result<&[Subject]> {
        let user = self.user()?.clone();
        self.subjects = self.store.list_subjects(&user).await?;
        Ok(&self.subjects)
    }

    /// Registers a subject, or adds weekdays to an existing one.
    pub async fn add_subject(&mut self, name: &str, days: &[Weekday]) -> Result<Subject> {
        let user = self.user()?.clone();
        let name = Subject::validate_name(name)?;
        if days.is_empty() {
            return Err(LedgerError::InvalidSubject(format!(
                "{name:?} has no weekdays"
            )));
        }

        let subject = Subject::new(name, days.iter().copied());
        self.store.write_subject(&user, &subject).await?;
        info!(user = %user, subject = %subject.name, days = ?subject.day_labels(), "subject registered");

        match self.subjects.iter_mut().find(|s| s.name == subject.name) {
            Some(existing) => {
                existing.add_days(subject.days.iter().copied());
                Ok(existing.clone())
            }
            None => {
                self.subjects.push(subject.clone());
                self.subjects.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(subject)
            }
        }
    }

    /// Reloads the timetable and the confirmed entries for the week of `reference`.
    pub async fn load_week(&mut self, reference: NaiveDate) -> Result<WeekPlan> {
        let user = self.user()?.clone();
        self.refresh_subjects().await?;
        self.board
            .load_week(self.store.as_ref(), &user, &self.subjects, reference)
            .await?;
        Ok(self.week_plan(reference))
    }

    pub fn week_plan(&self, reference: NaiveDate) -> WeekPlan {
        let highlighted = week::display_day(reference);
        let mut days: Vec<Weekday> = Vec::with_capacity(7);
        if self.subjects.iter().any(|s| s.meets_on(Weekday::Sun)) {
            days.push(Weekday::Sun);
        }
        days.extend(week::DISPLAY_DAYS);

        let days = days
            .into_iter()
            .map(|day| {
                let lectures = self
                    .subjects
                    .iter()
                    .filter(|subject| subject.meets_on(day))
                    .map(|subject| {
                        let key = OccurrenceKey::for_week(subject.name.as_str(), day, reference);
                        PlannedLecture {
                            subject: subject.name.clone(),
                            entry: self.board.entry(&key),
                            key,
                        }
                    })
                    .collect();
                PlannedDay {
                    day,
                    date: week::resolve_date(reference, day),
                    highlighted: day == highlighted,
                    lectures,
                }
            })
            .collect();

        WeekPlan { reference, days }
    }

    /// Key for `subject` on `day` in the week of `reference`, if it is on the timetable.
    pub fn scheduled_key(
        &self,
        subject: &str,
        day: Weekday,
        reference: NaiveDate,
    ) -> Result<OccurrenceKey> {
        let key = OccurrenceKey::for_week(subject, day, reference);
        let scheduled = self
            .subjects
            .iter()
            .any(|s| s.name == subject && s.meets_on(day));
        if scheduled {
            Ok(key)
        } else {
            Err(LedgerError::NotScheduled(key))
        }
    }

    pub fn set_status(&mut self, key: &OccurrenceKey, status: AttendanceStatus) -> Result<()> {
        self.board.set_status(key, status)
    }

    pub async fn confirm(&mut self, key: &OccurrenceKey) -> Result<OccurrenceRecord> {
        let user = self.user()?.clone();
        self.board.confirm(self.store.as_ref(), &user, key).await
    }

    pub fn is_locked(&self, key: &OccurrenceKey) -> bool {
        self.board.is_locked(key)
    }

    pub async fn summarize_subject(&self, subject: &str) -> Result<AggregateSummary> {
        let user = self.user()?;
        let records = self.store.list_occurrences(user, subject).await?;
        Ok(aggregate::summarize(&records))
    }

    /// Summary and next class for every registered subject.
    pub async fn dashboard(&mut self, today: NaiveDate) -> Result<Dashboard> {
        self.refresh_subjects().await?;
        let mut subjects = Vec::with_capacity(self.subjects.len());
        for subject in &self.subjects {
            let summary = self.summarize_subject(&subject.name).await?;
            subjects.push(SubjectOverview {
                next_class: aggregate::predict_next(subject, today),
                subject: subject.clone(),
                summary,
            });
        }
        let summaries: Vec<AggregateSummary> = subjects.iter().map(|s| s.summary).collect();
        Ok(Dashboard {
            average_attendance: aggregate::average_attendance(&summaries),
            subjects,
        })
    }
}
