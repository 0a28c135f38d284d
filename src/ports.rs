//! Boundaries between the session core and the outside world.
//!
//! Implementations swallow their own failures: a store that cannot write or a
//! notifier that cannot deliver logs the problem and returns normally, so the
//! timer never stalls on I/O.

use crate::history::SessionHistory;
use crate::models::{Settings, Statistics};
use crate::observe::Subscription;
use crate::task::Task;
use futures::future::LocalBoxFuture;

/// Push-based one-second clock driving `TimerEngine::on_tick`.
pub trait TickSource {
    /// Begins (or restarts) emitting ticks.
    fn start(&self);
    /// Stops emitting ticks. No tick may be delivered afterwards.
    fn stop(&self);
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings);
    /// Emits the current value immediately, then after every save.
    fn subscribe(&self, callback: Box<dyn Fn(&Settings)>) -> Subscription;
}

pub trait StatisticsStore {
    fn load(&self) -> Statistics;
    fn save(&self, statistics: &Statistics);
}

pub trait HistoryStore {
    fn load(&self) -> SessionHistory;
    fn save(&self, history: &SessionHistory);
    fn subscribe(&self, callback: Box<dyn Fn(&SessionHistory)>) -> Subscription;
}

pub trait TaskStore {
    fn load(&self) -> Vec<Task>;
    fn save(&self, tasks: &[Task]);
    fn subscribe(&self, callback: Box<dyn Fn(&[Task])>) -> Subscription;
}

pub trait NotificationPort {
    /// Asks the platform for permission to post notifications.
    fn request_authorization(&self) -> LocalBoxFuture<'_, bool>;
    fn send(&self, title: &str, body: &str);
    fn clear_pending(&self);
}

pub trait SoundPort {
    fn play_work_complete(&self);
    fn play_break_complete(&self);
}
