//! Pomoflow - a Pomodoro session core with task tracking and history.
//!
//! The timer engine, task list and settings/statistics owners are plain
//! single-threaded state machines. Everything that touches the outside world
//! (ticks, storage, notifications, sound) sits behind the traits in [`ports`].

pub mod app;
pub mod audio;
pub mod engine;
pub mod event;
pub mod export;
pub mod history;
pub mod models;
pub mod notifications;
pub mod observe;
pub mod persistence;
pub mod ports;
pub mod quick_add;
pub mod settings;
pub mod task;
pub mod tasks;
pub mod timer;

#[cfg(test)]
mod testing;
