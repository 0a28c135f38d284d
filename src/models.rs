//! Data models for the Pomoflow session core.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The kind of interval a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn is_break(self) -> bool {
        !matches!(self, Self::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Colour theme preference. Only stored here; rendering happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
    Pomodoro,
    Forest,
    Ocean,
}

/// User-configurable settings. Replaced wholesale on every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Duration of a work session.
    #[serde(with = "duration_secs")]
    pub work_duration: Duration,
    #[serde(with = "duration_secs")]
    pub short_break_duration: Duration,
    #[serde(with = "duration_secs")]
    pub long_break_duration: Duration,
    /// Number of completed work sessions before a long break.
    pub sessions_until_long_break: u32,
    /// Start a break automatically when a work session completes.
    pub auto_start_breaks: bool,
    /// Start a work session automatically when a break completes.
    pub auto_start_pomodoros: bool,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub theme: Theme,
    pub focus_mode_enabled: bool,
    pub ticking_sound_enabled: bool,
    pub show_time_in_title: bool,
    /// Work sessions per day the user is aiming for.
    pub daily_goal: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: Duration::from_secs(25 * 60),
            short_break_duration: Duration::from_secs(5 * 60),
            long_break_duration: Duration::from_secs(15 * 60),
            sessions_until_long_break: 4,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            sound_enabled: true,
            notifications_enabled: true,
            theme: Theme::System,
            focus_mode_enabled: false,
            ticking_sound_enabled: false,
            show_time_in_title: true,
            daily_goal: 8,
        }
    }
}

impl Settings {
    /// Returns the configured duration for a session kind.
    pub fn duration_for(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Work => self.work_duration,
            SessionKind::ShortBreak => self.short_break_duration,
            SessionKind::LongBreak => self.long_break_duration,
        }
    }
}

/// Durations are persisted as whole seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// One timed interval. Values are never mutated in place; every change
/// produces a new `Session` through the `with_*` constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub kind: SessionKind,
    pub duration: Duration,
    pub remaining: Duration,
    pub state: SessionState,
    pub started_at: Option<DateTime<Local>>,
}

impl Session {
    /// Creates a fresh idle session with the full duration remaining.
    pub fn new(kind: SessionKind, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            duration,
            remaining: duration,
            state: SessionState::Idle,
            started_at: None,
        }
    }

    /// Returns a copy with the given remaining time, clamped to `[0, duration]`.
    pub fn with_remaining(&self, remaining: Duration) -> Self {
        Self {
            remaining: remaining.min(self.duration),
            ..self.clone()
        }
    }

    /// Returns a copy in the given state. Entering `Running` stamps `started_at`.
    pub fn with_state(&self, state: SessionState) -> Self {
        let started_at = if state == SessionState::Running {
            Some(Local::now())
        } else {
            self.started_at
        };
        Self {
            state,
            started_at,
            ..self.clone()
        }
    }

    /// Returns the progress (0.0 to 1.0) through the session.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        1.0 - self.remaining.as_secs_f64() / self.duration.as_secs_f64()
    }

    /// Returns true if the session is running or paused.
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }
}

/// Cumulative counters. Monotonic except on explicit reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Statistics {
    pub total_work_sessions: u32,
    pub total_work_minutes: u32,
    pub total_break_minutes: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_at: Option<DateTime<Local>>,
}

impl Statistics {
    /// Returns the statistics after crediting one completed session.
    pub fn with_completed_session(
        &self,
        kind: SessionKind,
        duration: Duration,
        at: DateTime<Local>,
    ) -> Self {
        let minutes = whole_minutes(duration);
        let mut updated = self.clone();
        match kind {
            SessionKind::Work => {
                updated.total_work_sessions = updated.total_work_sessions.saturating_add(1);
                updated.total_work_minutes = updated.total_work_minutes.saturating_add(minutes);
                updated.current_streak = updated.current_streak.saturating_add(1);
                updated.longest_streak = updated.longest_streak.max(updated.current_streak);
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => {
                updated.total_break_minutes = updated.total_break_minutes.saturating_add(minutes);
            }
        }
        updated.last_session_at = Some(at);
        updated
    }
}

/// Truncating conversion used for every minute counter.
pub fn whole_minutes(duration: Duration) -> u32 {
    u32::try_from(duration.as_secs() / 60).unwrap_or(u32::MAX)
}
