use std::sync::Mutex;
use tracing::warn;
use xtrike_monitor_core::{StatusSink, StatusUpdate};

/// Marshals status updates from the polling task onto the GTK main
/// context. The glib channel preserves emission order and buffers updates
/// until the receiver is attached, so nothing is dropped while the window
/// is still being built.
pub struct GlibStatusSink {
    sender: Mutex<glib::Sender<StatusUpdate>>,
}

impl GlibStatusSink {
    /// Creates the sink and the receiver half to attach on the main
    /// context.
    pub fn channel() -> (Self, glib::Receiver<StatusUpdate>) {
        let (sender, receiver) = glib::MainContext::channel(glib::Priority::DEFAULT);
        let sink = Self {
            sender: Mutex::new(sender),
        };
        (sink, receiver)
    }
}

impl StatusSink for GlibStatusSink {
    fn render(&self, update: StatusUpdate) {
        let sender = self.sender.lock().unwrap();
        if let Err(e) = sender.send(update) {
            // The receiver only disappears during teardown.
            warn!("Dropped status update: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_is_send_and_sync() {
        fn assert_sink<T: StatusSink + Send + Sync>() {}
        assert_sink::<GlibStatusSink>();
    }
}
