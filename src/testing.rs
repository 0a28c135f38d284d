//! Recording fakes for the tick, sound and notification ports.

use crate::app::App;
use crate::persistence::SqliteStore;
use crate::ports::{NotificationPort, SoundPort, TickSource};
use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
pub struct ManualTicks {
    pub running: Cell<bool>,
    pub starts: Cell<u32>,
    pub stops: Cell<u32>,
}

impl TickSource for ManualTicks {
    fn start(&self) {
        self.running.set(true);
        self.starts.set(self.starts.get() + 1);
    }

    fn stop(&self) {
        self.running.set(false);
        self.stops.set(self.stops.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingSound {
    pub work_chimes: Cell<u32>,
    pub break_chimes: Cell<u32>,
}

impl SoundPort for RecordingSound {
    fn play_work_complete(&self) {
        self.work_chimes.set(self.work_chimes.get() + 1);
    }

    fn play_break_complete(&self) {
        self.break_chimes.set(self.break_chimes.get() + 1);
    }
}

pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String)>>,
    pub cleared: Cell<u32>,
    pub grant: Cell<bool>,
    pub authorization_requests: Cell<u32>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            cleared: Cell::new(0),
            grant: Cell::new(true),
            authorization_requests: Cell::new(0),
        }
    }
}

impl NotificationPort for RecordingNotifier {
    fn request_authorization(&self) -> LocalBoxFuture<'_, bool> {
        self.authorization_requests
            .set(self.authorization_requests.get() + 1);
        let granted = self.grant.get();
        Box::pin(async move { granted })
    }

    fn send(&self, title: &str, body: &str) {
        self.sent
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
    }

    fn clear_pending(&self) {
        self.cleared.set(self.cleared.get() + 1);
    }
}

/// An app over in-memory storage and inert ports, with default settings.
pub fn test_app() -> App {
    App::new(
        Rc::new(SqliteStore::in_memory().unwrap()),
        Rc::new(ManualTicks::default()),
        Rc::new(RecordingNotifier::default()),
        Rc::new(RecordingSound::default()),
    )
}
