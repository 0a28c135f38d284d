//! Free-text task entry, e.g. `"Write report 3 pomodoros high priority note: ask Sam"`.

use crate::task::{Priority, Task};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Priority phrases, checked in order; the first hit wins.
const PRIORITY_PHRASES: &[(&str, Priority)] = &[
    ("high priority", Priority::High),
    ("high", Priority::High),
    ("!!", Priority::High),
    ("urgent", Priority::High),
    ("medium priority", Priority::Medium),
    ("medium", Priority::Medium),
    ("!", Priority::Medium),
    ("low priority", Priority::Low),
    ("low", Priority::Low),
];

/// Largest estimate accepted from free text.
const MAX_ESTIMATE: u32 = 20;

static ESTIMATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)\s*pomodoros?",
        r"(\d+)\s*poms?",
        r"(\d+)\s*🍅",
        r"est:?\s*(\d+)",
    ]
    .iter()
    .map(|p| case_insensitive(p))
    .collect()
});

static PRIORITY_PATTERNS: LazyLock<Vec<(Regex, Priority)>> = LazyLock::new(|| {
    PRIORITY_PHRASES
        .iter()
        .map(|(phrase, p)| (case_insensitive(&regex::escape(phrase)), *p))
        .collect()
});

static NOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| case_insensitive(r"notes?:"));

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("quick-add patterns are valid")
}

/// The fields recovered from a quick-add line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub estimated_pomodoros: u32,
    pub priority: Priority,
    pub notes: String,
}

impl ParsedTask {
    /// Builds a task from the parsed fields, or `None` if no title remains.
    pub fn into_task(self) -> Option<Task> {
        if self.title.is_empty() {
            return None;
        }
        Some(
            Task::new(self.title, self.estimated_pomodoros)
                .with_priority(self.priority)
                .with_notes(self.notes),
        )
    }
}

/// Parses a quick-add line into title, estimate, priority and notes.
pub fn parse(input: &str) -> ParsedTask {
    let mut title = input.trim().to_string();
    let mut notes = String::new();
    let mut priority = Priority::Medium;
    let mut estimated_pomodoros = 1;

    if let Some(marker) = NOTE_MARKER.find(&title) {
        notes = title[marker.end()..].trim().to_string();
        title = title[..marker.start()].trim().to_string();
    }

    if let Some((range, p)) = PRIORITY_PATTERNS
        .iter()
        .find_map(|(re, p)| re.find(&title).map(|m| (m.range(), *p)))
    {
        priority = p;
        title.replace_range(range, "");
        title = title.trim().to_string();
    }

    for re in ESTIMATE_PATTERNS.iter() {
        if let Some(caps) = re.captures(&title) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                if (1..=MAX_ESTIMATE).contains(&n) {
                    estimated_pomodoros = n;
                }
            }
            if let Some(whole) = caps.get(0) {
                let range = whole.range();
                title.replace_range(range, "");
            }
            break;
        }
    }

    ParsedTask {
        title: title.split_whitespace().collect::<Vec<_>>().join(" "),
        estimated_pomodoros,
        priority,
        notes,
    }
}
