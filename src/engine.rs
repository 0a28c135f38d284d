//! The session lifecycle state machine.
//!
//! `TimerEngine` owns the current [`Session`] and advances it one second per
//! tick from an external [`TickSource`]. When a session runs out it credits
//! statistics and history through the [`SettingsCoordinator`], fires sound and
//! notification side effects, and moves on to the next session kind.
//!
//! ```text
//! Work --(n < threshold)--> ShortBreak --> Work
//! Work --(n >= threshold)-> LongBreak  --> Work   (n reset to 0)
//! ```

use crate::history::CompletedSession;
use crate::models::{Session, SessionKind, SessionState, Settings};
use crate::observe::{Observable, Subscription};
use crate::ports::{NotificationPort, SoundPort, TickSource};
use crate::settings::SettingsCoordinator;
use chrono::Local;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Time removed from the session on every tick.
pub const TICK: Duration = Duration::from_secs(1);

/// The task that completed sessions are attributed to.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditedTask {
    pub id: Uuid,
    pub title: String,
}

/// Emitted when a session runs out (never for skipped sessions).
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub kind: SessionKind,
    pub duration: Duration,
    pub credited: Option<CreditedTask>,
    /// Kind of the session that replaced the completed one.
    pub next: SessionKind,
    pub auto_started: bool,
}

pub struct TimerEngine {
    session: Observable<Session>,
    /// Work sessions completed since the last long break.
    completed_work_sessions: u32,
    credited: Option<CreditedTask>,
    coordinator: SettingsCoordinator,
    ticks: Rc<dyn TickSource>,
    notifier: Rc<dyn NotificationPort>,
    sound: Rc<dyn SoundPort>,
    _settings_subscription: Subscription,
}

impl TimerEngine {
    /// Creates an engine holding an idle work session.
    pub fn new(
        coordinator: SettingsCoordinator,
        ticks: Rc<dyn TickSource>,
        notifier: Rc<dyn NotificationPort>,
        sound: Rc<dyn SoundPort>,
    ) -> Self {
        let settings = coordinator.settings();
        let session = Observable::new(Session::new(SessionKind::Work, settings.work_duration));

        let cell = session.clone();
        let settings_subscription =
            coordinator.subscribe_settings(move |settings| resize_idle(&cell, settings));

        Self {
            session,
            completed_work_sessions: 0,
            credited: None,
            coordinator,
            ticks,
            notifier,
            sound,
            _settings_subscription: settings_subscription,
        }
    }

    pub fn session(&self) -> Session {
        self.session.get()
    }

    pub fn subscribe_session(&self, callback: impl Fn(&Session) + 'static) -> Subscription {
        self.session.subscribe(callback)
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn credited_task(&self) -> Option<&CreditedTask> {
        self.credited.as_ref()
    }

    /// Sets the task that future completions are credited to.
    pub fn set_credited_task(&mut self, task: Option<CreditedTask>) {
        self.credited = task;
    }

    fn publish(&self, session: Session) {
        self.session.set(session);
    }

    /// Starts or resumes the session. Calling it while running only re-arms
    /// the tick source.
    pub fn start(&mut self) {
        let session = self.session.get();
        match session.state {
            SessionState::Idle | SessionState::Paused => {
                debug!(kind = ?session.kind, remaining = session.remaining.as_secs(), "session running");
                self.publish(session.with_state(SessionState::Running));
                self.ticks.start();
            }
            SessionState::Running => self.ticks.start(),
            SessionState::Completed => {}
        }
    }

    pub fn pause(&mut self) {
        let session = self.session.get();
        if session.state == SessionState::Running {
            debug!(remaining = session.remaining.as_secs(), "session paused");
            self.publish(session.with_state(SessionState::Paused));
            self.ticks.stop();
        }
    }

    pub fn resume(&mut self) {
        self.start();
    }

    /// Abandons the current session and returns to an idle work session.
    pub fn stop(&mut self) {
        self.ticks.stop();
        let settings = self.coordinator.settings();
        self.publish(Session::new(SessionKind::Work, settings.work_duration));
        self.completed_work_sessions = 0;
        debug!("session stopped");
    }

    /// Moves to the next session kind without crediting anything.
    pub fn skip(&mut self) {
        self.ticks.stop();
        let next = self.advance();
        debug!(?next, "session skipped");
    }

    /// Restarts the current kind from its full configured duration.
    pub fn reset(&mut self) {
        self.ticks.stop();
        let kind = self.session.get().kind;
        let settings = self.coordinator.settings();
        self.publish(Session::new(kind, settings.duration_for(kind)));
        debug!(?kind, "session reset");
    }

    /// Advances a running session by one tick. Returns the completion event
    /// when this tick finished the session.
    pub fn on_tick(&mut self) -> Option<CompletionEvent> {
        let session = self.session.get();
        if session.state != SessionState::Running {
            return None;
        }

        let remaining = session.remaining.saturating_sub(TICK);
        if remaining.is_zero() {
            self.publish(
                session
                    .with_remaining(Duration::ZERO)
                    .with_state(SessionState::Completed),
            );
            Some(self.complete(session.kind, session.duration))
        } else {
            self.publish(session.with_remaining(remaining));
            None
        }
    }

    /// Applies new settings to an idle session. Running and paused sessions
    /// keep the duration they started with. Saves through the settings owner
    /// reach this automatically.
    pub fn on_settings_changed(&mut self, settings: &Settings) {
        resize_idle(&self.session, settings);
    }

    fn complete(&mut self, kind: SessionKind, duration: Duration) -> CompletionEvent {
        self.ticks.stop();
        let now = Local::now();

        let stats = self.coordinator.record_completion(kind, duration, now);

        let mut record = CompletedSession::new(kind, duration, now);
        if let Some(task) = &self.credited {
            record = record.with_task(task.id, task.title.clone());
        }
        self.coordinator.append_history(record);

        let settings = self.coordinator.settings();
        if settings.sound_enabled {
            match kind {
                SessionKind::Work => self.sound.play_work_complete(),
                SessionKind::ShortBreak | SessionKind::LongBreak => self.sound.play_break_complete(),
            }
        }
        if settings.notifications_enabled {
            let (title, body) = notification_content(kind);
            self.notifier.send(title, body);
        }

        if kind == SessionKind::Work {
            self.completed_work_sessions = self.completed_work_sessions.saturating_add(1);
        }
        info!(
            ?kind,
            minutes = duration.as_secs() / 60,
            streak = stats.current_streak,
            "session completed"
        );

        let next = self.advance();
        let auto_start = match kind {
            SessionKind::Work => settings.auto_start_breaks,
            SessionKind::ShortBreak | SessionKind::LongBreak => settings.auto_start_pomodoros,
        };
        if auto_start {
            self.start();
        }

        CompletionEvent {
            kind,
            duration,
            credited: self.credited.clone(),
            next,
            auto_started: auto_start,
        }
    }

    /// Replaces the session with an idle one of the next kind.
    fn advance(&mut self) -> SessionKind {
        let current = self.session.get().kind;
        let settings = self.coordinator.settings();
        let next = self.next_kind(current, settings.sessions_until_long_break);
        self.publish(Session::new(next, settings.duration_for(next)));
        next
    }

    fn next_kind(&mut self, current: SessionKind, threshold: u32) -> SessionKind {
        match current {
            SessionKind::Work if self.completed_work_sessions >= threshold => {
                self.completed_work_sessions = 0;
                SessionKind::LongBreak
            }
            SessionKind::Work => SessionKind::ShortBreak,
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        }
    }
}

fn resize_idle(session: &Observable<Session>, settings: &Settings) {
    let current = session.get();
    if current.state != SessionState::Idle {
        return;
    }
    let duration = settings.duration_for(current.kind);
    if duration == current.duration {
        return;
    }
    debug!(kind = ?current.kind, secs = duration.as_secs(), "idle session resized");
    session.set(Session::new(current.kind, duration));
}

/// Notification title and body for a finished session.
pub fn notification_content(kind: SessionKind) -> (&'static str, &'static str) {
    match kind {
        SessionKind::Work => (
            "Work Session Complete!",
            "Time for a break. Great job staying focused!",
        ),
        SessionKind::ShortBreak => ("Break Over", "Ready to get back to work?"),
        SessionKind::LongBreak => ("Long Break Over", "Feeling refreshed? Let's continue!"),
    }
}
