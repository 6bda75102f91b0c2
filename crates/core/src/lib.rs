use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod monitor;
pub mod query;
pub mod tracker;

pub use monitor::BatteryPoller;
pub use query::{parse_readings, DeviceQuery, PnpDeviceQuery};
pub use tracker::BatteryTracker;

/// Case-sensitive substring used to pick the target device out of the
/// OS enumeration.
pub const DEVICE_NAME_FILTER: &str = "GK-994W";

/// Levels at or below this are "low"; above it the alert re-arms.
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// Fixed polling cadence. No backoff, no jitter.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// One record from the device query. Produced fresh on every poll and
/// discarded after being folded into `BatteryState`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceReading {
    pub name: String,
    pub level: Option<u8>,
}

impl DeviceReading {
    pub fn new(name: impl Into<String>, level: Option<u8>) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

/// The only cross-poll memory in the system. `level` is meaningful only
/// while `connected` is true; `alert_armed` tracks whether the next low
/// observation may fire a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryState {
    pub connected: bool,
    pub level: u8,
    pub alert_armed: bool,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            connected: false,
            level: 0,
            alert_armed: true,
        }
    }
}

/// Value handed to the presentation sink. Copied at dispatch time so no
/// shared state crosses the task boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub connected: bool,
    pub level: u8,
}

impl From<BatteryState> for StatusUpdate {
    fn from(state: BatteryState) -> Self {
        Self {
            connected: state.connected,
            level: state.level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    /// The level crossed into the low range while the alert was armed.
    /// Fires once per low-battery episode, not once per poll.
    LowBattery(u8),
}

/// Receives status updates for display. Implementations must marshal the
/// call onto whatever execution context owns the presentation surface;
/// updates arrive in emission order and must not be dropped or reordered.
pub trait StatusSink: Send + Sync {
    fn render(&self, update: StatusUpdate);
}

/// Best-effort desktop notification delivery. Failures must not reach the
/// polling loop.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, urgent: bool);
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("device query failed: {0}")]
    QueryFailed(String),
    #[error("system API error: {0}")]
    SystemApiError(#[from] std::io::Error),
    #[error("poller already running")]
    PollerAlreadyRunning,
    #[error("poller not running")]
    PollerNotRunning,
}
