//! Desktop notifications for session completions.

use crate::ports::NotificationPort;
use futures::future::LocalBoxFuture;
use notify_rust::Notification;
use std::thread;
use tracing::warn;

const APP_NAME: &str = "Pomoflow";

/// Posts notifications through the platform notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl NotificationPort for DesktopNotifier {
    /// Desktop notification daemons do not gate posting behind a permission
    /// prompt, so the request resolves to granted.
    fn request_authorization(&self) -> LocalBoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    /// Runs in a background thread to avoid blocking.
    fn send(&self, title: &str, body: &str) {
        let title = title.to_string();
        let body = body.to_string();
        thread::spawn(move || {
            if let Err(e) = Notification::new()
                .appname(APP_NAME)
                .summary(&title)
                .body(&body)
                .sound_name("default")
                .show()
            {
                warn!(error = %e, "failed to show notification");
            }
        });
    }

    /// Posted notifications are not tracked, so there is nothing to withdraw.
    fn clear_pending(&self) {}
}
