use notify_rust::{Notification, Timeout, Urgency};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};
use xtrike_monitor_core::Notifier;

const NOTIFICATION_TIMEOUT_MS: u32 = 5000;
const NOTIFICATION_ICON: &str = "battery-caution";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification system error: {0}")]
    SystemError(String),
    #[error("notifications disabled")]
    Disabled,
}

/// Delivers alerts through the desktop notification service. Delivery is
/// best-effort: a failure is logged and swallowed so it can never reach
/// the polling loop.
pub struct DesktopNotifier {
    enabled: AtomicBool,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        info!(
            "Notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    fn send(&self, title: &str, message: &str, urgent: bool) -> Result<(), NotificationError> {
        if !self.is_enabled() {
            return Err(NotificationError::Disabled);
        }

        let urgency = if urgent {
            Urgency::Critical
        } else {
            Urgency::Normal
        };

        Notification::new()
            .summary(title)
            .body(message)
            .icon(NOTIFICATION_ICON)
            .urgency(urgency)
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
            .show()
            .map(|_| ())
            .map_err(|e| {
                NotificationError::SystemError(format!("failed to show notification: {}", e))
            })
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str, urgent: bool) {
        match self.send(title, message, urgent) {
            Ok(()) => info!("Notification sent: {}", title),
            Err(e) => debug!("Notification dropped: {}", e),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_creation() {
        let notifier = DesktopNotifier::new();
        assert!(notifier.is_enabled());
    }

    #[test]
    fn test_enable_disable() {
        let notifier = DesktopNotifier::new();

        notifier.set_enabled(false);
        assert!(!notifier.is_enabled());

        notifier.set_enabled(true);
        assert!(notifier.is_enabled());
    }

    #[test]
    fn test_disabled_notifier_reports_disabled() {
        let notifier = DesktopNotifier::new();
        notifier.set_enabled(false);

        let result = notifier.send("Title", "Body", false);
        assert!(matches!(result, Err(NotificationError::Disabled)));
    }

    #[test]
    fn test_notify_swallows_failures() {
        // Whatever the desktop environment looks like, the trait call
        // must not panic or propagate.
        let notifier = DesktopNotifier::new();
        notifier.set_enabled(false);
        notifier.notify("Title", "Body", true);
    }
}
