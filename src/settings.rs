//! Ownership of settings, statistics and history.
//!
//! `SettingsCoordinator` is the only writer of these three values. Everyone
//! else (the timer engine, the app shell, views) reads snapshots or
//! subscribes to changes.

use crate::history::{CompletedSession, SessionHistory};
use crate::models::{SessionKind, Settings, Statistics};
use crate::observe::{Observable, Subscription};
use crate::ports::{HistoryStore, NotificationPort, SettingsStore, StatisticsStore};
use chrono::{DateTime, Local};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SettingsCoordinator {
    settings_store: Rc<dyn SettingsStore>,
    statistics_store: Rc<dyn StatisticsStore>,
    history_store: Rc<dyn HistoryStore>,
    notifier: Rc<dyn NotificationPort>,
    statistics: Observable<Statistics>,
}

impl SettingsCoordinator {
    pub fn new(
        settings_store: Rc<dyn SettingsStore>,
        statistics_store: Rc<dyn StatisticsStore>,
        history_store: Rc<dyn HistoryStore>,
        notifier: Rc<dyn NotificationPort>,
    ) -> Self {
        let statistics = Observable::new(statistics_store.load());
        Self {
            settings_store,
            statistics_store,
            history_store,
            notifier,
            statistics,
        }
    }

    // Settings

    pub fn settings(&self) -> Settings {
        self.settings_store.load()
    }

    pub fn subscribe_settings(&self, callback: impl Fn(&Settings) + 'static) -> Subscription {
        self.settings_store.subscribe(Box::new(callback))
    }

    pub fn update_settings(&self, settings: Settings) {
        debug!(?settings, "updating settings");
        self.settings_store.save(&settings);
    }

    pub fn reset_settings(&self) {
        info!("restoring default settings");
        self.settings_store.save(&Settings::default());
    }

    // Statistics

    pub fn statistics(&self) -> Statistics {
        self.statistics.get()
    }

    pub fn subscribe_statistics(&self, callback: impl Fn(&Statistics) + 'static) -> Subscription {
        self.statistics.subscribe(callback)
    }

    /// Credits a completed session to the cumulative statistics and persists them.
    pub fn record_completion(
        &self,
        kind: SessionKind,
        duration: Duration,
        at: DateTime<Local>,
    ) -> Statistics {
        let updated = self
            .statistics
            .get()
            .with_completed_session(kind, duration, at);
        self.statistics_store.save(&updated);
        self.statistics.set(updated.clone());
        updated
    }

    /// Replaces the statistics wholesale, e.g. when restoring a backup.
    pub fn restore_statistics(&self, statistics: Statistics) {
        info!("restoring statistics");
        self.statistics_store.save(&statistics);
        self.statistics.set(statistics);
    }

    pub fn reset_statistics(&self) {
        info!("resetting statistics");
        let empty = Statistics::default();
        self.statistics_store.save(&empty);
        self.statistics.set(empty);
    }

    // History

    pub fn history(&self) -> SessionHistory {
        self.history_store.load()
    }

    pub fn subscribe_history(
        &self,
        callback: impl Fn(&SessionHistory) + 'static,
    ) -> Subscription {
        self.history_store.subscribe(Box::new(callback))
    }

    pub fn append_history(&self, record: CompletedSession) {
        let mut history = self.history_store.load();
        history.add_completed_session(record);
        self.history_store.save(&history);
    }

    pub fn reset_history(&self) {
        info!("clearing session history");
        self.history_store.save(&SessionHistory::default());
    }

    /// Asks for notification permission. A denial is final for this call.
    pub async fn request_notification_permission(&self) -> bool {
        let granted = self.notifier.request_authorization().await;
        info!(granted, "notification permission resolved");
        granted
    }
}
