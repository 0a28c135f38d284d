//! Pomoflow - a terminal Pomodoro timer with tasks and statistics.
//!
//! Commands are read line by line from stdin; the status line is redrawn on
//! every tick. Set `RUST_LOG=debug` to see state transitions on stderr.

use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use futures::executor::block_on;
use pomoflow::app::App;
use pomoflow::audio::TerminalBell;
use pomoflow::engine::CompletionEvent;
use pomoflow::event::{self, EventResult};
use pomoflow::notifications::DesktopNotifier;
use pomoflow::ports::{SoundPort, TickSource};
use pomoflow::timer::{self, LoopEvent, ThreadTicker};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn spawn_input_reader(tx: Sender<LoopEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(LoopEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(LoopEvent::InputClosed);
    });
}

/// Prefers synthesized chimes and falls back to the terminal bell.
#[cfg(feature = "audio")]
fn sound_port() -> Rc<dyn SoundPort> {
    match pomoflow::audio::RodioSound::new() {
        Ok(sound) => Rc::new(sound),
        Err(e) => {
            warn!(error = %e, "audio output unavailable, using terminal bell");
            Rc::new(TerminalBell::stderr())
        }
    }
}

#[cfg(not(feature = "audio"))]
fn sound_port() -> Rc<dyn SoundPort> {
    Rc::new(TerminalBell::stderr())
}

fn draw_status(app: &App) {
    let mut out = io::stdout().lock();
    let _ = write!(out, "\r\x1b[2K{}", timer::format_title(&app.session()));
    let _ = out.flush();
}

fn announce(event: &CompletionEvent) {
    let started = if event.auto_started { " (started)" } else { "" };
    println!(
        "\n{} complete. Next: {}{started}",
        event.kind.label(),
        event.next.label()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let (tx, rx) = mpsc::channel();
    let ticker = ThreadTicker::new(tx.clone());
    let mut app = App::open_default(
        Rc::new(ticker.clone()),
        Rc::new(DesktopNotifier),
        sound_port(),
    )?;

    if app.settings().settings().notifications_enabled
        && !block_on(app.request_notification_permission())
    {
        warn!("notification permission denied");
    }

    spawn_input_reader(tx);
    info!("pomoflow started");
    println!("Type 'help' for commands.");
    draw_status(&app);

    for message in rx {
        match message {
            LoopEvent::Tick { generation } => {
                if !ticker.is_current(generation) {
                    continue;
                }
                let completion = app.tick();
                if let Some(completion) = completion {
                    announce(&completion);
                }
                draw_status(&app);
            }
            LoopEvent::Input(line) => match event::handle_command(&mut app, &line) {
                EventResult::Quit => break,
                EventResult::StateChanged | EventResult::SettingsChanged => draw_status(&app),
                EventResult::Message(text) => {
                    println!("{text}");
                    draw_status(&app);
                }
                EventResult::Continue => {}
            },
            LoopEvent::InputClosed => break,
        }
    }

    ticker.stop();
    println!();
    Ok(())
}
