//! One-second tick thread and countdown formatting.

use crate::models::{Session, SessionKind, SessionState};
use crate::ports::TickSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Messages delivered to the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// One second elapsed on the ticker armed as `generation`.
    Tick { generation: u64 },
    /// A line typed by the user.
    Input(String),
    /// Standard input was closed.
    InputClosed,
}

/// Tick source backed by a sleeping thread per `start`.
///
/// Every `start` or `stop` bumps the generation; threads from an older
/// generation exit on their next wake-up, and ticks they already queued are
/// recognised as stale with [`ThreadTicker::is_current`].
#[derive(Clone)]
pub struct ThreadTicker {
    tx: Sender<LoopEvent>,
    generation: Arc<AtomicU64>,
    interval: Duration,
}

impl ThreadTicker {
    pub fn new(tx: Sender<LoopEvent>) -> Self {
        Self::with_interval(tx, Duration::from_secs(1))
    }

    pub fn with_interval(tx: Sender<LoopEvent>, interval: Duration) -> Self {
        Self {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
            interval,
        }
    }

    /// Returns true if a tick from `generation` should still be acted on.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl TickSource for ThreadTicker {
    fn start(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let interval = self.interval;

        thread::spawn(move || loop {
            thread::sleep(interval);
            if current.load(Ordering::SeqCst) != generation {
                break;
            }
            if tx.send(LoopEvent::Tick { generation }).is_err() {
                break;
            }
        });
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Formats the status title for the current session.
pub fn format_title(session: &Session) -> String {
    let time = format_time(session.remaining.as_secs());
    match (session.state, session.kind) {
        (SessionState::Idle | SessionState::Completed, _) => "🍅".to_string(),
        (SessionState::Paused, _) => format!("⏸ {time}"),
        (SessionState::Running, SessionKind::Work) => format!("🍅 {time}"),
        (SessionState::Running, SessionKind::ShortBreak | SessionKind::LongBreak) => {
            format!("☕ {time}")
        }
    }
}

/// Formats time in MM:SS format.
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
