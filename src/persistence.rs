//! SQLite persistence for settings, statistics, history and tasks.

use crate::history::{CompletedSession, DailyStats, SessionHistory};
use crate::models::{SessionKind, Settings, Statistics};
use crate::observe::{Observable, Subscription};
use crate::ports::{HistoryStore, SettingsStore, StatisticsStore, TaskStore};
use crate::task::{Priority, Task};
use chrono::{DateTime, Local, NaiveDate};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Invalid identifier: {0}")]
    Uuid(#[from] uuid::Error),
    #[error("Unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },
    #[error("Failed to create database directory")]
    DirectoryCreation,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database in the per-user data directory.
    pub fn open_default() -> Result<Self, DatabaseError> {
        Self::open(&Self::db_path())
    }

    /// Opens (or creates) a database at `path`, initializing tables if needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
        }

        let conn = Connection::open(path)?;
        Self::initialize_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS statistics (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_work_sessions INTEGER NOT NULL DEFAULT 0,
                total_work_minutes INTEGER NOT NULL DEFAULT 0,
                total_break_minutes INTEGER NOT NULL DEFAULT 0,
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_session_at TEXT
            );

            CREATE TABLE IF NOT EXISTS completed_sessions (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                task_id TEXT,
                task_title TEXT
            );

            CREATE TABLE IF NOT EXISTS daily_stats (
                date TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                work_sessions INTEGER NOT NULL DEFAULT 0,
                work_minutes INTEGER NOT NULL DEFAULT 0,
                break_minutes INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                estimated_pomodoros INTEGER NOT NULL DEFAULT 1,
                completed_pomodoros INTEGER NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                priority TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL,
                completed_at TEXT
            );
        "#,
        )?;
        Ok(())
    }

    fn db_path() -> PathBuf {
        ProjectDirs::from("com", "pomoflow", "Pomoflow")
            .map(|dirs| dirs.data_dir().join("pomoflow.db"))
            .unwrap_or_else(|| PathBuf::from("pomoflow.db"))
    }

    /// Loads settings from the database, returning defaults if not found.
    pub fn load_settings(&self) -> Result<Settings, DatabaseError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'config'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(j) => Ok(serde_json::from_str(&j)?),
            None => Ok(Settings::default()),
        }
    }

    /// Saves settings to the database.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES ('config', ?)",
            [&json],
        )?;
        Ok(())
    }

    /// Loads the cumulative statistics, or empty ones if none were saved.
    pub fn load_statistics(&self) -> Result<Statistics, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT total_work_sessions, total_work_minutes, total_break_minutes,
                        current_streak, longest_streak, last_session_at
                 FROM statistics WHERE id = 1",
                [],
                |row| {
                    Ok((
                        Statistics {
                            total_work_sessions: row.get(0)?,
                            total_work_minutes: row.get(1)?,
                            total_break_minutes: row.get(2)?,
                            current_streak: row.get(3)?,
                            longest_streak: row.get(4)?,
                            last_session_at: None,
                        },
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((stats, last)) => Ok(Statistics {
                last_session_at: last.as_deref().map(parse_timestamp).transpose()?,
                ..stats
            }),
            None => Ok(Statistics::default()),
        }
    }

    pub fn save_statistics(&self, stats: &Statistics) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO statistics
                (id, total_work_sessions, total_work_minutes, total_break_minutes,
                 current_streak, longest_streak, last_session_at)
             VALUES (1, ?, ?, ?, ?, ?, ?)",
            params![
                stats.total_work_sessions,
                stats.total_work_minutes,
                stats.total_break_minutes,
                stats.current_streak,
                stats.longest_streak,
                stats.last_session_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Loads the session log and day aggregates, newest first.
    pub fn load_history(&self) -> Result<SessionHistory, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, duration_secs, completed_at, task_id, task_title
             FROM completed_sessions ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sessions = Vec::with_capacity(rows.len());
        for (id, kind, secs, completed_at, task_id, task_title) in rows {
            sessions.push(CompletedSession {
                id: Uuid::parse_str(&id)?,
                kind: kind_from_str(&kind)?,
                duration: Duration::from_secs(u64::try_from(secs).unwrap_or(0)),
                completed_at: parse_timestamp(&completed_at)?,
                task_id: task_id.as_deref().map(Uuid::parse_str).transpose()?,
                task_title,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT date, work_sessions, work_minutes, break_minutes
             FROM daily_stats ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut daily_stats = Vec::with_capacity(rows.len());
        for (date, work_sessions, work_minutes, break_minutes) in rows {
            daily_stats.push(DailyStats {
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")?,
                work_sessions,
                work_minutes,
                break_minutes,
            });
        }

        Ok(SessionHistory {
            sessions,
            daily_stats,
        })
    }

    /// Replaces the stored history with `history`.
    pub fn save_history(&self, history: &SessionHistory) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM completed_sessions", [])?;
        tx.execute("DELETE FROM daily_stats", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO completed_sessions
                    (id, position, kind, duration_secs, completed_at, task_id, task_title)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (position, s) in history.sessions.iter().enumerate() {
                insert.execute(params![
                    s.id.to_string(),
                    position as i64,
                    kind_as_str(s.kind),
                    s.duration.as_secs() as i64,
                    s.completed_at.to_rfc3339(),
                    s.task_id.map(|id| id.to_string()),
                    s.task_title,
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO daily_stats (date, position, work_sessions, work_minutes, break_minutes)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for (position, d) in history.daily_stats.iter().enumerate() {
                insert.execute(params![
                    d.date.to_string(),
                    position as i64,
                    d.work_sessions,
                    d.work_minutes,
                    d.break_minutes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads all tasks in list order.
    pub fn load_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, notes, estimated_pomodoros, completed_pomodoros,
                    is_completed, priority, created_at, completed_at
             FROM tasks ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    notes: row.get(2)?,
                    estimated_pomodoros: row.get(3)?,
                    completed_pomodoros: row.get(4)?,
                    is_completed: row.get(5)?,
                    priority: row.get(6)?,
                    created_at: row.get(7)?,
                    completed_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Replaces the stored task list with `tasks`, preserving order.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tasks", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO tasks
                    (id, position, title, notes, estimated_pomodoros, completed_pomodoros,
                     is_completed, priority, created_at, completed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (position, t) in tasks.iter().enumerate() {
                insert.execute(params![
                    t.id.to_string(),
                    position as i64,
                    t.title,
                    t.notes,
                    t.estimated_pomodoros,
                    t.completed_pomodoros,
                    t.is_completed,
                    priority_as_str(t.priority),
                    t.created_at.to_rfc3339(),
                    t.completed_at.map(|c| c.to_rfc3339()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

struct TaskRow {
    id: String,
    title: String,
    notes: String,
    estimated_pomodoros: u32,
    completed_pomodoros: u32,
    is_completed: bool,
    priority: String,
    created_at: String,
    completed_at: Option<String>,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, DatabaseError> {
        Ok(Task {
            id: Uuid::parse_str(&self.id)?,
            title: self.title,
            notes: self.notes,
            estimated_pomodoros: self.estimated_pomodoros,
            completed_pomodoros: self.completed_pomodoros,
            is_completed: self.is_completed,
            priority: priority_from_str(&self.priority)?,
            created_at: parse_timestamp(&self.created_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Local>, DatabaseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Local))
}

fn kind_as_str(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Work => "work",
        SessionKind::ShortBreak => "short_break",
        SessionKind::LongBreak => "long_break",
    }
}

fn kind_from_str(s: &str) -> Result<SessionKind, DatabaseError> {
    match s {
        "work" => Ok(SessionKind::Work),
        "short_break" => Ok(SessionKind::ShortBreak),
        "long_break" => Ok(SessionKind::LongBreak),
        other => Err(DatabaseError::UnknownValue {
            field: "kind",
            value: other.to_string(),
        }),
    }
}

fn priority_as_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn priority_from_str(s: &str) -> Result<Priority, DatabaseError> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(DatabaseError::UnknownValue {
            field: "priority",
            value: other.to_string(),
        }),
    }
}

/// Store ports backed by one SQLite database.
///
/// Values are cached in memory; reads never touch the disk after startup.
/// Write failures are logged and otherwise ignored, the cached value stays
/// authoritative for the rest of the process lifetime.
pub struct SqliteStore {
    db: Database,
    settings: Observable<Settings>,
    statistics: RefCell<Statistics>,
    history: Observable<SessionHistory>,
    tasks: Observable<Vec<Task>>,
}

impl SqliteStore {
    /// Wraps an open database, loading every value once. Unreadable rows fall
    /// back to defaults so a damaged file never blocks startup.
    pub fn new(db: Database) -> Self {
        let settings = db.load_settings().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        });
        let statistics = db.load_statistics().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load statistics, starting empty");
            Statistics::default()
        });
        let history = db.load_history().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load history, starting empty");
            SessionHistory::default()
        });
        let tasks = db.load_tasks().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load tasks, starting empty");
            Vec::new()
        });

        Self {
            db,
            settings: Observable::new(settings),
            statistics: RefCell::new(statistics),
            history: Observable::new(history),
            tasks: Observable::new(tasks),
        }
    }

    pub fn open_default() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open_default()?))
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::new_in_memory()?))
    }

    #[cfg(test)]
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl SettingsStore for SqliteStore {
    fn load(&self) -> Settings {
        self.settings.get()
    }

    fn save(&self, settings: &Settings) {
        if let Err(e) = self.db.save_settings(settings) {
            warn!(error = %e, "failed to save settings");
        }
        self.settings.set(settings.clone());
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Settings)>) -> Subscription {
        self.settings.subscribe(callback)
    }
}

impl StatisticsStore for SqliteStore {
    fn load(&self) -> Statistics {
        self.statistics.borrow().clone()
    }

    fn save(&self, statistics: &Statistics) {
        if let Err(e) = self.db.save_statistics(statistics) {
            warn!(error = %e, "failed to save statistics");
        }
        *self.statistics.borrow_mut() = statistics.clone();
    }
}

impl HistoryStore for SqliteStore {
    fn load(&self) -> SessionHistory {
        self.history.get()
    }

    fn save(&self, history: &SessionHistory) {
        if let Err(e) = self.db.save_history(history) {
            warn!(error = %e, "failed to save history");
        }
        self.history.set(history.clone());
    }

    fn subscribe(&self, callback: Box<dyn Fn(&SessionHistory)>) -> Subscription {
        self.history.subscribe(callback)
    }
}

impl TaskStore for SqliteStore {
    fn load(&self) -> Vec<Task> {
        self.tasks.get()
    }

    fn save(&self, tasks: &[Task]) {
        if let Err(e) = self.db.save_tasks(tasks) {
            warn!(error = %e, "failed to save tasks");
        }
        self.tasks.set(tasks.to_vec());
    }

    fn subscribe(&self, callback: Box<dyn Fn(&[Task])>) -> Subscription {
        self.tasks.subscribe(move |tasks: &Vec<Task>| callback(tasks))
    }
}
