//! JSON backups and CSV exports of tasks, statistics and settings.

use crate::models::{Settings, Statistics};
use crate::task::Task;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to restore a user's data on another machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    pub export_date: DateTime<Local>,
    pub app_version: String,
    pub statistics: Statistics,
    pub tasks: Vec<Task>,
    pub settings: Settings,
}

impl Backup {
    pub fn new(statistics: Statistics, tasks: Vec<Task>, settings: Settings) -> Self {
        Self {
            export_date: Local::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            statistics,
            tasks,
            settings,
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), tasks = self.tasks.len(), "backup written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, ExportError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Suggested file name for an export made today, e.g. `pomoflow-backup-2024-03-01.json`.
pub fn default_file_name(kind: &str, extension: &str) -> String {
    format!(
        "pomoflow-{kind}-{}.{extension}",
        Local::now().format("%Y-%m-%d")
    )
}

fn csv_field(s: &str) -> String {
    s.replace(',', ";").replace('\n', " ")
}

/// Renders tasks followed by a statistics summary as CSV.
pub fn to_csv(statistics: &Statistics, tasks: &[Task]) -> String {
    let mut csv = String::from("Type,Title,Estimated,Completed,Priority,Status,Created,Notes\n");

    for task in tasks {
        let status = if task.is_completed { "Completed" } else { "Pending" };
        let _ = writeln!(
            csv,
            "Task,{},{},{},{},{},{},{}",
            csv_field(&task.title),
            task.estimated_pomodoros,
            task.completed_pomodoros,
            task.priority.title(),
            status,
            task.created_at.format("%Y-%m-%d"),
            csv_field(&task.notes),
        );
    }

    csv.push_str("\nStatistics\n");
    let _ = writeln!(csv, "Total Work Sessions,{}", statistics.total_work_sessions);
    let _ = writeln!(csv, "Total Work Minutes,{}", statistics.total_work_minutes);
    let _ = writeln!(csv, "Total Break Minutes,{}", statistics.total_break_minutes);
    let _ = writeln!(csv, "Current Streak,{}", statistics.current_streak);
    let _ = writeln!(csv, "Longest Streak,{}", statistics.longest_streak);
    csv
}

pub fn write_csv(path: &Path, statistics: &Statistics, tasks: &[Task]) -> Result<(), ExportError> {
    fs::write(path, to_csv(statistics, tasks))?;
    info!(path = %path.display(), "csv export written");
    Ok(())
}
