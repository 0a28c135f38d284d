//! Terminal command handling.

use crate::app::App;
use crate::export;
use crate::models::{whole_minutes, Settings};
use crate::task::Task;
use crate::timer;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// Result of handling a command line.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Nothing to report, continue running.
    Continue,
    /// User requested quit.
    Quit,
    /// Timer state changed, the status line needs redrawing.
    StateChanged,
    /// Settings changed.
    SettingsChanged,
    /// Text to show the user.
    Message(String),
}

pub const HELP: &str = "\
Timer:    start | pause | resume | stop | skip | reset | status
Tasks:    add <text> | tasks | select <n>|none | done <n> | rm <n>
          move <n>[,<n>...] <before> | clear
Stats:    stats | week
Settings: settings | set work|short|long <minutes> | set cycle|goal <n>
          set sound|notifications|auto-breaks|auto-work on|off
Reset:    reset-settings | reset-stats | reset-history
Data:     export json|csv [path] | import <path>
Other:    help | quit";

/// Handles one line typed by the user and updates the app accordingly.
pub fn handle_command(app: &mut App, line: &str) -> EventResult {
    let line = line.trim();
    let (command, args) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(c, a)| (c, a.trim()));

    match command {
        "" => EventResult::Continue,
        "start" | "s" => {
            app.start();
            EventResult::StateChanged
        }
        "pause" | "p" => {
            app.pause();
            EventResult::StateChanged
        }
        "resume" | "r" => {
            app.resume();
            EventResult::StateChanged
        }
        "stop" => {
            app.stop();
            EventResult::StateChanged
        }
        "skip" => {
            app.skip();
            EventResult::StateChanged
        }
        "reset" => {
            app.reset();
            EventResult::StateChanged
        }
        "status" => EventResult::Message(status(app)),
        "add" => match app.quick_add(args) {
            Some(task) => EventResult::Message(format!("Added: {}", describe(&task))),
            None => EventResult::Message("Task title cannot be empty".to_string()),
        },
        "tasks" | "ls" => EventResult::Message(task_list(app)),
        "select" => handle_select(app, args),
        "done" => with_task(app, args, |app, task| {
            app.toggle_task(task.id);
            let state = if task.is_completed { "Reopened" } else { "Completed" };
            format!("{state}: {}", task.title)
        }),
        "rm" | "delete" => with_task(app, args, |app, task| {
            app.delete_task(task.id);
            format!("Deleted: {}", task.title)
        }),
        "move" => handle_move(app, args),
        "clear" => {
            app.clear_completed_tasks();
            EventResult::Message("Cleared completed tasks".to_string())
        }
        "stats" => EventResult::Message(statistics(app)),
        "week" => EventResult::Message(week(app)),
        "settings" => EventResult::Message(settings_summary(&app.settings().settings())),
        "set" => handle_set(app, args),
        "reset-settings" => {
            app.reset_settings();
            EventResult::SettingsChanged
        }
        "reset-stats" => {
            app.reset_statistics();
            EventResult::Message("Statistics reset".to_string())
        }
        "reset-history" => {
            app.reset_history();
            EventResult::Message("History cleared".to_string())
        }
        "export" => handle_export(app, args),
        "import" => handle_import(app, args),
        "help" | "?" => EventResult::Message(HELP.to_string()),
        "quit" | "q" | "exit" => EventResult::Quit,
        other => EventResult::Message(format!("Unknown command '{other}', try 'help'")),
    }
}

/// Resolves a 1-based task number.
fn task_at(app: &App, arg: &str) -> Option<Task> {
    let n: usize = arg.trim().parse().ok()?;
    app.tasks().tasks().into_iter().nth(n.checked_sub(1)?)
}

fn with_task(app: &mut App, arg: &str, action: impl FnOnce(&mut App, Task) -> String) -> EventResult {
    match task_at(app, arg) {
        Some(task) => EventResult::Message(action(app, task)),
        None => EventResult::Message(format!("No task number '{arg}'")),
    }
}

fn handle_select(app: &mut App, args: &str) -> EventResult {
    if args == "none" {
        app.select_task(None);
        return EventResult::Message("Selection cleared".to_string());
    }
    with_task(app, args, |app, task| {
        app.select_task(Some(task.id));
        format!("Working on: {}", task.title)
    })
}

fn handle_move(app: &mut App, args: &str) -> EventResult {
    let usage = || EventResult::Message("Usage: move <n>[,<n>...] <before>".to_string());
    let Some((from, to)) = args.split_once(char::is_whitespace) else {
        return usage();
    };
    let from: Option<Vec<usize>> = from
        .split(',')
        .map(|n| n.trim().parse::<usize>().ok()?.checked_sub(1))
        .collect();
    let to = to.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1));
    match (from, to) {
        (Some(from), Some(to)) => {
            app.reorder_tasks(&from, to);
            EventResult::Message(task_list(app))
        }
        _ => usage(),
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|&n| n > 0)
}

fn handle_set(app: &mut App, args: &str) -> EventResult {
    let mut parts = args.split_whitespace();
    let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return EventResult::Message("Usage: set <key> <value>".to_string());
    };

    let minutes = |v: &str| parse_positive(v).map(|m| Duration::from_secs(u64::from(m) * 60));
    let applied = match key {
        "work" => minutes(value).map(|d| app.update_setting(|s| s.work_duration = d)),
        "short" => minutes(value).map(|d| app.update_setting(|s| s.short_break_duration = d)),
        "long" => minutes(value).map(|d| app.update_setting(|s| s.long_break_duration = d)),
        "cycle" => parse_positive(value).map(|n| app.update_setting(|s| s.sessions_until_long_break = n)),
        "goal" => parse_positive(value).map(|n| app.update_setting(|s| s.daily_goal = n)),
        "sound" => parse_switch(value).map(|on| app.update_setting(|s| s.sound_enabled = on)),
        "notifications" => {
            parse_switch(value).map(|on| app.update_setting(|s| s.notifications_enabled = on))
        }
        "auto-breaks" => {
            parse_switch(value).map(|on| app.update_setting(|s| s.auto_start_breaks = on))
        }
        "auto-work" => {
            parse_switch(value).map(|on| app.update_setting(|s| s.auto_start_pomodoros = on))
        }
        _ => return EventResult::Message(format!("Unknown setting '{key}'")),
    };

    match applied {
        Some(()) => EventResult::SettingsChanged,
        None => EventResult::Message(format!("Invalid value '{value}' for {key}")),
    }
}

fn handle_export(app: &App, args: &str) -> EventResult {
    let mut parts = args.split_whitespace();
    let format = parts.next().unwrap_or("json");
    let (kind, extension) = match format {
        "json" => ("backup", "json"),
        "csv" => ("export", "csv"),
        other => return EventResult::Message(format!("Unknown export format '{other}'")),
    };
    let path = parts
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(export::default_file_name(kind, extension)));

    let result = match format {
        "csv" => app.export_csv(&path),
        _ => app.export_backup(&path),
    };
    match result {
        Ok(()) => EventResult::Message(format!("Exported to {}", path.display())),
        Err(e) => EventResult::Message(format!("Export failed: {e}")),
    }
}

fn handle_import(app: &mut App, args: &str) -> EventResult {
    if args.is_empty() {
        return EventResult::Message("Usage: import <path>".to_string());
    }
    match app.import_backup(&PathBuf::from(args)) {
        Ok(()) => EventResult::SettingsChanged,
        Err(e) => EventResult::Message(format!("Import failed: {e}")),
    }
}

fn describe(task: &Task) -> String {
    format!(
        "{} ({}/{} pomodoros, {})",
        task.title,
        task.completed_pomodoros,
        task.estimated_pomodoros,
        task.priority.title()
    )
}

fn status(app: &App) -> String {
    let session = app.session();
    let today = app.settings().history().today();
    let goal = app.settings().settings().daily_goal;
    let mut out = format!(
        "{} {} {:?} ({}/{} today)",
        timer::format_title(&session),
        session.kind.label(),
        session.state,
        today.work_sessions,
        goal
    );
    if let Some(task) = app.engine().credited_task() {
        let _ = write!(out, " on {}", task.title);
    }
    out
}

fn task_list(app: &App) -> String {
    let tasks = app.tasks().tasks();
    if tasks.is_empty() {
        return "No tasks".to_string();
    }
    let selected = app.tasks().selected().map(|t| t.id);
    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        let check = if task.is_completed { "x" } else { " " };
        let marker = if Some(task.id) == selected { " *" } else { "" };
        let _ = writeln!(out, "{:>2}. [{check}] {}{marker}", i + 1, describe(task));
    }
    let _ = write!(
        out,
        "{} pending, {} estimated, {} done",
        app.tasks().pending().len(),
        app.tasks().total_estimated(),
        app.tasks().total_completed()
    );
    out
}

fn statistics(app: &App) -> String {
    let stats = app.settings().statistics();
    let last = stats
        .last_session_at
        .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    format!(
        "Work sessions: {}\nWork minutes: {}\nBreak minutes: {}\nStreak: {} (longest {})\nLast session: {last}",
        stats.total_work_sessions,
        stats.total_work_minutes,
        stats.total_break_minutes,
        stats.current_streak,
        stats.longest_streak,
    )
}

fn week(app: &App) -> String {
    app.settings()
        .history()
        .this_week()
        .iter()
        .map(|day| {
            format!(
                "{} {:>2} sessions {:>4} min",
                day.date.format("%a %d"),
                day.work_sessions,
                day.work_minutes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn settings_summary(settings: &Settings) -> String {
    let on = |b: bool| if b { "on" } else { "off" };
    format!(
        "work {}m, short {}m, long {}m, long break every {}, goal {}\n\
         sound {}, notifications {}, auto-breaks {}, auto-work {}",
        whole_minutes(settings.work_duration),
        whole_minutes(settings.short_break_duration),
        whole_minutes(settings.long_break_duration),
        settings.sessions_until_long_break,
        settings.daily_goal,
        on(settings.sound_enabled),
        on(settings.notifications_enabled),
        on(settings.auto_start_breaks),
        on(settings.auto_start_pomodoros),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionKind, SessionState};
    use crate::testing::test_app;

    fn message(result: EventResult) -> String {
        match result {
            EventResult::Message(text) => text,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn test_timer_commands() {
        let mut app = test_app();
        assert_eq!(handle_command(&mut app, "start"), EventResult::StateChanged);
        assert_eq!(app.session().state, SessionState::Running);

        assert_eq!(handle_command(&mut app, "  p "), EventResult::StateChanged);
        assert_eq!(app.session().state, SessionState::Paused);

        handle_command(&mut app, "skip");
        assert_eq!(app.session().kind, SessionKind::ShortBreak);

        handle_command(&mut app, "stop");
        assert_eq!(app.session().kind, SessionKind::Work);
        assert_eq!(app.session().state, SessionState::Idle);
    }

    #[test]
    fn test_empty_and_unknown_commands() {
        let mut app = test_app();
        assert_eq!(handle_command(&mut app, "   "), EventResult::Continue);
        assert!(message(handle_command(&mut app, "dance")).contains("Unknown command"));
        assert_eq!(handle_command(&mut app, "quit"), EventResult::Quit);
    }

    #[test]
    fn test_add_select_and_complete_tasks() {
        let mut app = test_app();
        let added = message(handle_command(&mut app, "add Write report 3 pomodoros"));
        assert_eq!(added, "Added: Write report (0/3 pomodoros, Medium)");
        handle_command(&mut app, "add Review");

        assert_eq!(message(handle_command(&mut app, "select 2")), "Working on: Review");
        assert_eq!(
            app.engine().credited_task().map(|t| t.title.as_str()),
            Some("Review")
        );

        assert_eq!(message(handle_command(&mut app, "done 1")), "Completed: Write report");
        let list = message(handle_command(&mut app, "tasks"));
        assert!(list.contains(" 1. [x] Write report"));
        assert!(list.contains(" 2. [ ] Review (0/1 pomodoros, Medium) *"));

        handle_command(&mut app, "clear");
        assert_eq!(app.tasks().tasks().len(), 1);
        assert!(message(handle_command(&mut app, "select 5")).contains("No task number"));
        handle_command(&mut app, "select none");
        assert!(app.engine().credited_task().is_none());
    }

    #[test]
    fn test_add_blank_task_is_rejected() {
        let mut app = test_app();
        assert!(message(handle_command(&mut app, "add")).contains("cannot be empty"));
        assert!(app.tasks().tasks().is_empty());
    }

    #[test]
    fn test_move_tasks() {
        let mut app = test_app();
        for title in ["A", "B", "C"] {
            app.add_task(title, 1);
        }
        handle_command(&mut app, "move 3 1");
        let titles: Vec<String> = app.tasks().tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);

        assert!(message(handle_command(&mut app, "move x 1")).starts_with("Usage"));
    }

    #[test]
    fn test_set_durations_and_switches() {
        let mut app = test_app();
        assert_eq!(handle_command(&mut app, "set work 50"), EventResult::SettingsChanged);
        assert_eq!(app.session().remaining, Duration::from_secs(50 * 60));

        handle_command(&mut app, "set sound off");
        handle_command(&mut app, "set cycle 2");
        let settings = app.settings().settings();
        assert!(!settings.sound_enabled);
        assert_eq!(settings.sessions_until_long_break, 2);

        assert!(message(handle_command(&mut app, "set work 0")).contains("Invalid value"));
        assert!(message(handle_command(&mut app, "set colour red")).contains("Unknown setting"));
        assert!(message(handle_command(&mut app, "set work")).starts_with("Usage"));
    }

    #[test]
    fn test_status_and_summaries() {
        let mut app = test_app();
        let status = message(handle_command(&mut app, "status"));
        assert!(status.starts_with("🍅 Work Idle (0/8 today)"), "{status}");

        let stats = message(handle_command(&mut app, "stats"));
        assert!(stats.contains("Last session: never"));

        let week = message(handle_command(&mut app, "week"));
        assert_eq!(week.lines().count(), 7);

        let settings = message(handle_command(&mut app, "settings"));
        assert!(settings.starts_with("work 25m, short 5m, long 15m"));
    }

    #[test]
    fn test_export_and_import_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let mut app = test_app();
        app.add_task("Keep me", 2);

        let result = message(handle_command(&mut app, &format!("export json {}", path.display())));
        assert!(result.starts_with("Exported to"));

        handle_command(&mut app, "rm 1");
        assert!(app.tasks().tasks().is_empty());

        assert_eq!(
            handle_command(&mut app, &format!("import {}", path.display())),
            EventResult::SettingsChanged
        );
        assert_eq!(app.tasks().tasks().len(), 1);

        assert!(message(handle_command(&mut app, "export xml")).contains("Unknown export format"));
        assert!(message(handle_command(&mut app, "import /nonexistent/x.json")).starts_with("Import failed"));
    }
}
