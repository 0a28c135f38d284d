//! Main application state and logic.
//!
//! `App` wires the timer engine to the two coordinators and keeps the pieces
//! that cross between them in sync: the credited task follows the task
//! selection and finished work sessions are counted on that task.

use crate::engine::{CompletionEvent, CreditedTask, TimerEngine};
use crate::export::{self, Backup, ExportError};
use crate::models::{Session, SessionKind, Settings};
use crate::persistence::{DatabaseError, SqliteStore};
use crate::ports::{
    HistoryStore, NotificationPort, SettingsStore, SoundPort, StatisticsStore, TaskStore,
    TickSource,
};
use crate::quick_add;
use crate::settings::SettingsCoordinator;
use crate::task::Task;
use crate::tasks::TaskCoordinator;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub struct App {
    engine: TimerEngine,
    tasks: TaskCoordinator,
    settings: SettingsCoordinator,
    notifier: Rc<dyn NotificationPort>,
}

impl App {
    /// Builds the application over one store that serves every persisted value.
    pub fn new<S>(
        store: Rc<S>,
        ticks: Rc<dyn TickSource>,
        notifier: Rc<dyn NotificationPort>,
        sound: Rc<dyn SoundPort>,
    ) -> Self
    where
        S: SettingsStore + StatisticsStore + HistoryStore + TaskStore + 'static,
    {
        let settings = SettingsCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
        );
        let tasks = TaskCoordinator::new(store);
        let engine = TimerEngine::new(settings.clone(), ticks, notifier.clone(), sound);

        Self {
            engine,
            tasks,
            settings,
            notifier,
        }
    }

    /// Opens the on-disk store in the platform data directory.
    pub fn open_default(
        ticks: Rc<dyn TickSource>,
        notifier: Rc<dyn NotificationPort>,
        sound: Rc<dyn SoundPort>,
    ) -> Result<Self, AppError> {
        let store = Rc::new(SqliteStore::open_default()?);
        Ok(Self::new(store, ticks, notifier, sound))
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn tasks(&self) -> &TaskCoordinator {
        &self.tasks
    }

    pub fn settings(&self) -> &SettingsCoordinator {
        &self.settings
    }

    pub fn session(&self) -> Session {
        self.engine.session()
    }

    // Timer

    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
    }

    /// Abandons the session and withdraws any completion notices still on screen.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.notifier.clear_pending();
    }

    pub fn skip(&mut self) {
        self.engine.skip();
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Advances the timer by one second.
    pub fn tick(&mut self) -> Option<CompletionEvent> {
        let event = self.engine.on_tick()?;

        if event.kind == SessionKind::Work {
            if let Some(task) = event
                .credited
                .as_ref()
                .and_then(|credited| self.tasks.find(credited.id))
            {
                debug!(id = %task.id, "crediting pomodoro to task");
                self.tasks.increment_pomodoro(&task);
            }
        }
        self.sync_credited_task();
        Some(event)
    }

    // Settings

    pub fn update_settings(&mut self, settings: Settings) {
        self.settings.update_settings(settings);
    }

    /// Edits the current settings in place and saves the result.
    pub fn update_setting<F>(&mut self, updater: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.settings();
        updater(&mut settings);
        self.update_settings(settings);
    }

    pub fn reset_settings(&mut self) {
        self.settings.reset_settings();
    }

    pub fn reset_statistics(&mut self) {
        self.settings.reset_statistics();
    }

    pub fn reset_history(&mut self) {
        self.settings.reset_history();
    }

    pub async fn request_notification_permission(&self) -> bool {
        self.settings.request_notification_permission().await
    }

    // Tasks

    pub fn add_task(&mut self, title: &str, estimated_pomodoros: u32) -> Option<Task> {
        self.tasks.add(title, estimated_pomodoros)
    }

    /// Adds a task from a free-form line such as `"Write report 3 pomodoros urgent"`.
    pub fn quick_add(&mut self, line: &str) -> Option<Task> {
        let task = quick_add::parse(line).into_task()?;
        self.tasks.add_direct(task.clone());
        Some(task)
    }

    /// Selects the task with `id`, or clears the selection for `None`.
    /// Returns false if the id is not in the list.
    pub fn select_task(&mut self, id: Option<Uuid>) -> bool {
        let task = match id {
            Some(id) => match self.tasks.find(id) {
                Some(task) => Some(task),
                None => return false,
            },
            None => None,
        };
        self.tasks.select(task);
        self.sync_credited_task();
        true
    }

    pub fn toggle_task(&mut self, id: Uuid) -> bool {
        let Some(task) = self.tasks.find(id) else {
            return false;
        };
        self.tasks.toggle_completion(&task);
        self.sync_credited_task();
        true
    }

    pub fn delete_task(&mut self, id: Uuid) -> bool {
        let Some(task) = self.tasks.find(id) else {
            return false;
        };
        self.tasks.delete(&task);
        self.sync_credited_task();
        true
    }

    pub fn reorder_tasks(&mut self, from: &[usize], to: usize) {
        self.tasks.reorder(from, to);
    }

    pub fn clear_completed_tasks(&mut self) {
        self.tasks.clear_completed();
        self.sync_credited_task();
    }

    fn sync_credited_task(&mut self) {
        let credited = self.tasks.selected().map(|task| CreditedTask {
            id: task.id,
            title: task.title,
        });
        self.engine.set_credited_task(credited);
    }

    // Export

    pub fn backup(&self) -> Backup {
        Backup::new(
            self.settings.statistics(),
            self.tasks.tasks(),
            self.settings.settings(),
        )
    }

    pub fn export_backup(&self, path: &Path) -> Result<(), AppError> {
        self.backup().write_to(path)?;
        Ok(())
    }

    pub fn export_csv(&self, path: &Path) -> Result<(), AppError> {
        export::write_csv(path, &self.settings.statistics(), &self.tasks.tasks())?;
        Ok(())
    }

    /// Replaces settings, statistics and tasks with the contents of a backup.
    /// History is left untouched.
    pub fn import_backup(&mut self, path: &Path) -> Result<(), AppError> {
        let backup = Backup::read_from(path)?;
        info!(
            path = %path.display(),
            version = %backup.app_version,
            tasks = backup.tasks.len(),
            "importing backup"
        );
        self.settings.restore_statistics(backup.statistics);
        self.tasks.replace_all(backup.tasks);
        self.update_settings(backup.settings);
        self.sync_credited_task();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionState;
    use crate::testing::{ManualTicks, RecordingNotifier, RecordingSound};
    use std::time::Duration;

    struct Harness {
        app: App,
        ticks: Rc<ManualTicks>,
        notifier: Rc<RecordingNotifier>,
    }

    fn create_test_app() -> Harness {
        let store = Rc::new(SqliteStore::in_memory().unwrap());
        let ticks = Rc::new(ManualTicks::default());
        let notifier = Rc::new(RecordingNotifier::default());
        let mut app = App::new(
            store,
            ticks.clone(),
            notifier.clone(),
            Rc::new(RecordingSound::default()),
        );
        app.update_setting(|s| {
            s.work_duration = Duration::from_secs(2);
            s.short_break_duration = Duration::from_secs(1);
        });
        Harness {
            app,
            ticks,
            notifier,
        }
    }

    fn finish_session(app: &mut App) -> CompletionEvent {
        app.start();
        loop {
            if let Some(event) = app.tick() {
                return event;
            }
        }
    }

    #[test]
    fn test_app_initial_state() {
        let h = create_test_app();
        let session = h.app.session();
        assert_eq!(session.kind, SessionKind::Work);
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(session.duration, Duration::from_secs(2));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut h = create_test_app();
        h.app.start();
        assert!(h.ticks.running.get());

        h.app.pause();
        assert_eq!(h.app.session().state, SessionState::Paused);
        assert!(h.app.tick().is_none());
        assert_eq!(h.app.session().remaining, Duration::from_secs(2));

        h.app.resume();
        assert_eq!(h.app.session().state, SessionState::Running);
    }

    #[test]
    fn test_stop_clears_pending_notifications() {
        let mut h = create_test_app();
        h.app.start();
        h.app.stop();

        assert_eq!(h.app.session().state, SessionState::Idle);
        assert_eq!(h.notifier.cleared.get(), 1);
        assert!(!h.ticks.running.get());
    }

    #[test]
    fn test_work_completion_credits_selected_task() {
        let mut h = create_test_app();
        let task = h.app.add_task("Write report", 3).unwrap();
        assert!(h.app.select_task(Some(task.id)));

        let event = finish_session(&mut h.app);
        assert_eq!(event.credited.as_ref().map(|c| c.id), Some(task.id));
        assert_eq!(h.app.tasks().find(task.id).unwrap().completed_pomodoros, 1);
        assert_eq!(h.app.tasks().selected().unwrap().completed_pomodoros, 1);

        let record = &h.app.settings().history().sessions[0];
        assert_eq!(record.task_id, Some(task.id));
        assert_eq!(record.task_title.as_deref(), Some("Write report"));
    }

    #[test]
    fn test_break_completion_does_not_credit_task() {
        let mut h = create_test_app();
        let task = h.app.add_task("Write report", 3).unwrap();
        h.app.select_task(Some(task.id));

        finish_session(&mut h.app);
        let event = finish_session(&mut h.app);
        assert_eq!(event.kind, SessionKind::ShortBreak);
        assert_eq!(h.app.tasks().find(task.id).unwrap().completed_pomodoros, 1);
    }

    #[test]
    fn test_select_unknown_task_is_rejected() {
        let mut h = create_test_app();
        let task = h.app.add_task("A", 1).unwrap();
        h.app.select_task(Some(task.id));

        assert!(!h.app.select_task(Some(Uuid::new_v4())));
        assert_eq!(h.app.tasks().selected().map(|t| t.id), Some(task.id));

        assert!(h.app.select_task(None));
        assert!(h.app.engine().credited_task().is_none());
    }

    #[test]
    fn test_deleting_selected_task_stops_crediting() {
        let mut h = create_test_app();
        let task = h.app.add_task("A", 1).unwrap();
        h.app.select_task(Some(task.id));
        assert!(h.app.delete_task(task.id));

        let event = finish_session(&mut h.app);
        assert!(event.credited.is_none());
        assert!(h.app.settings().history().sessions[0].task_id.is_none());
    }

    #[test]
    fn test_quick_add() {
        let mut h = create_test_app();
        let task = h.app.quick_add("Review PR 2 pomodoros urgent").unwrap();
        assert_eq!(task.title, "Review PR");
        assert_eq!(task.estimated_pomodoros, 2);
        assert_eq!(task.priority, crate::task::Priority::High);
        assert_eq!(h.app.tasks().tasks(), vec![task]);
        assert!(h.app.quick_add("   ").is_none());
    }

    #[test]
    fn test_update_setting_resizes_idle_session() {
        let mut h = create_test_app();
        h.app.update_setting(|s| s.work_duration = Duration::from_secs(30 * 60));

        assert_eq!(h.app.settings().settings().work_duration, Duration::from_secs(1800));
        assert_eq!(h.app.session().remaining, Duration::from_secs(1800));
    }

    #[test]
    fn test_saving_through_settings_owner_resizes_idle_session() {
        let h = create_test_app();
        h.app.settings().update_settings(Settings {
            work_duration: Duration::from_secs(60),
            ..Settings::default()
        });
        assert_eq!(h.app.session().remaining, Duration::from_secs(60));
    }

    #[test]
    fn test_update_setting_leaves_running_session() {
        let mut h = create_test_app();
        h.app.start();
        h.app.update_setting(|s| s.work_duration = Duration::from_secs(30 * 60));
        assert_eq!(h.app.session().duration, Duration::from_secs(2));
    }

    #[test]
    fn test_reset_settings_restores_defaults() {
        let mut h = create_test_app();
        h.app.reset_settings();
        assert_eq!(h.app.settings().settings(), Settings::default());
        assert_eq!(h.app.session().remaining, Duration::from_secs(25 * 60));
    }

    #[test]
    fn test_reset_statistics_and_history() {
        let mut h = create_test_app();
        finish_session(&mut h.app);
        assert_eq!(h.app.settings().statistics().total_work_sessions, 1);

        h.app.reset_statistics();
        h.app.reset_history();
        assert_eq!(h.app.settings().statistics().total_work_sessions, 0);
        assert!(h.app.settings().history().sessions.is_empty());
    }

    #[test]
    fn test_export_and_import_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let mut source = create_test_app();
        source.app.add_task("Carry over", 4);
        finish_session(&mut source.app);
        source.app.export_backup(&path).unwrap();

        let mut target = create_test_app();
        target.app.add_task("Discarded", 1);
        target.app.update_setting(|s| s.daily_goal = 3);
        target.app.import_backup(&path).unwrap();

        let titles: Vec<String> = target.app.tasks().tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Carry over"]);
        assert_eq!(target.app.settings().statistics().total_work_sessions, 1);
        assert_eq!(target.app.settings().settings().daily_goal, 8);
        assert!(target.app.settings().history().sessions.is_empty());
    }

    #[test]
    fn test_import_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = create_test_app();
        let result = h.app.import_backup(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(AppError::Export(ExportError::Io(_)))));
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut h = create_test_app();
        h.app.add_task("Plan", 2);
        h.app.export_csv(&path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.contains("Task,Plan,2,0,Medium,Pending,"));
    }

    #[test]
    fn test_permission_request_delegates() {
        let h = create_test_app();
        assert!(futures::executor::block_on(
            h.app.request_notification_permission()
        ));
        assert_eq!(h.notifier.authorization_requests.get(), 1);
    }
}
