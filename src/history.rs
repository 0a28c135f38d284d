//! Bounded log of completed sessions and per-day aggregates.

use crate::models::{duration_secs, whole_minutes, SessionKind};
use chrono::{DateTime, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Maximum number of completed sessions kept in the log.
pub const MAX_SESSIONS: usize = 1000;
/// Maximum number of per-day aggregates kept.
pub const MAX_DAYS: usize = 365;

/// One finished session as recorded in the history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedSession {
    pub id: Uuid,
    pub kind: SessionKind,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub completed_at: DateTime<Local>,
    pub task_id: Option<Uuid>,
    pub task_title: Option<String>,
}

impl CompletedSession {
    pub fn new(kind: SessionKind, duration: Duration, completed_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            duration,
            completed_at,
            task_id: None,
            task_title: None,
        }
    }

    /// Attaches the credited task to the record.
    pub fn with_task(self, task_id: Uuid, task_title: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id),
            task_title: Some(task_title.into()),
            ..self
        }
    }
}

/// Aggregate of completed sessions for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub work_sessions: u32,
    pub work_minutes: u32,
    pub break_minutes: u32,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            work_sessions: 0,
            work_minutes: 0,
            break_minutes: 0,
        }
    }

    fn add_session(&mut self, kind: SessionKind, duration: Duration) {
        let minutes = whole_minutes(duration);
        match kind {
            SessionKind::Work => {
                self.work_sessions = self.work_sessions.saturating_add(1);
                self.work_minutes = self.work_minutes.saturating_add(minutes);
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => {
                self.break_minutes = self.break_minutes.saturating_add(minutes);
            }
        }
    }
}

/// Completed sessions and day aggregates, both ordered newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionHistory {
    pub sessions: Vec<CompletedSession>,
    pub daily_stats: Vec<DailyStats>,
}

impl SessionHistory {
    /// Records a completed session and folds it into its day's aggregate.
    pub fn add_completed_session(&mut self, session: CompletedSession) {
        let day = session.completed_at.date_naive();
        let (kind, duration) = (session.kind, session.duration);

        self.sessions.insert(0, session);
        self.sessions.truncate(MAX_SESSIONS);

        if let Some(stats) = self.daily_stats.iter_mut().find(|s| s.date == day) {
            stats.add_session(kind, duration);
        } else {
            let mut stats = DailyStats::new(day);
            stats.add_session(kind, duration);
            self.daily_stats.insert(0, stats);
            self.daily_stats.truncate(MAX_DAYS);
        }
    }

    /// Returns the aggregate for the given day, or an empty one.
    pub fn stats_for(&self, date: NaiveDate) -> DailyStats {
        self.daily_stats
            .iter()
            .find(|s| s.date == date)
            .cloned()
            .unwrap_or_else(|| DailyStats::new(date))
    }

    /// Returns today's aggregate.
    pub fn today(&self) -> DailyStats {
        self.stats_for(Local::now().date_naive())
    }

    /// Returns seven aggregates ending on `today`, oldest first, zero-filled.
    pub fn week_ending(&self, today: NaiveDate) -> Vec<DailyStats> {
        (0..7u64)
            .rev()
            .map(|offset| {
                let date = today.checked_sub_days(Days::new(offset)).unwrap_or(today);
                self.stats_for(date)
            })
            .collect()
    }

    /// Returns the last seven days including today.
    pub fn this_week(&self) -> Vec<DailyStats> {
        self.week_ending(Local::now().date_naive())
    }
}
