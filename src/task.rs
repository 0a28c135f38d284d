//! Task records tracked alongside pomodoro sessions.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn title(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// A unit of work that pomodoros can be credited to.
///
/// Every change goes through a `with_*` method returning a new value, so a
/// snapshot held by the timer or a view is never altered behind its back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub notes: String,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub is_completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
}

impl Task {
    /// Creates a new open task. The estimate is clamped to at least one.
    pub fn new(title: impl Into<String>, estimated_pomodoros: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: String::new(),
            estimated_pomodoros: estimated_pomodoros.max(1),
            completed_pomodoros: 0,
            is_completed: false,
            priority: Priority::default(),
            created_at: Local::now(),
            completed_at: None,
        }
    }

    pub fn with_notes(self, notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            ..self
        }
    }

    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    /// Returns a copy with any of the editable fields replaced.
    pub fn with_updates(
        &self,
        title: Option<String>,
        notes: Option<String>,
        estimated_pomodoros: Option<u32>,
        priority: Option<Priority>,
    ) -> Self {
        Self {
            title: title.unwrap_or_else(|| self.title.clone()),
            notes: notes.unwrap_or_else(|| self.notes.clone()),
            estimated_pomodoros: estimated_pomodoros
                .unwrap_or(self.estimated_pomodoros)
                .max(1),
            priority: priority.unwrap_or(self.priority),
            ..self.clone()
        }
    }

    pub fn with_incremented_pomodoro(&self) -> Self {
        Self {
            completed_pomodoros: self.completed_pomodoros + 1,
            ..self.clone()
        }
    }

    /// Returns a copy with the completion flag set; `completed_at` follows it.
    pub fn with_completion(&self, completed: bool) -> Self {
        Self {
            is_completed: completed,
            completed_at: completed.then(Local::now),
            ..self.clone()
        }
    }

    /// Completed pomodoros as a fraction of the estimate (may exceed 1.0).
    pub fn progress(&self) -> f64 {
        if self.estimated_pomodoros == 0 {
            return 0.0;
        }
        f64::from(self.completed_pomodoros) / f64::from(self.estimated_pomodoros)
    }
}
