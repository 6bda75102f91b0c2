use crate::{
    BatteryState, DeviceReading, StatusUpdate, TrackerEvent, DEVICE_NAME_FILTER,
    LOW_BATTERY_THRESHOLD,
};
use tracing::debug;

/// Folds one poll's readings into the prior state and decides whether a
/// low-battery alert fires. The alert is edge-triggered per episode: it
/// fires once when the level drops to the threshold, stays silent while
/// the level remains low, and re-arms only after the level is observed
/// above the threshold again. Disconnection preserves the armed flag, so
/// a flaky poll cannot cause a repeat alert.
pub fn update(readings: &[DeviceReading], prior: BatteryState) -> (BatteryState, Vec<TrackerEvent>) {
    let matched = readings.iter().find_map(|reading| {
        if reading.name.contains(DEVICE_NAME_FILTER) {
            reading.level
        } else {
            None
        }
    });

    let level = match matched {
        Some(level) => level,
        None => {
            let state = BatteryState {
                connected: false,
                level: 0,
                alert_armed: prior.alert_armed,
            };
            return (state, Vec::new());
        }
    };

    let mut state = BatteryState {
        connected: true,
        level,
        alert_armed: prior.alert_armed,
    };
    let mut events = Vec::new();

    if level <= LOW_BATTERY_THRESHOLD {
        if prior.alert_armed {
            debug!("Battery dropped to {}%, firing low-battery alert", level);
            events.push(TrackerEvent::LowBattery(level));
            state.alert_armed = false;
        }
    } else {
        state.alert_armed = true;
    }

    (state, events)
}

/// Owns the current `BatteryState` for the polling task. The poller is the
/// only writer; everything leaving here is copied by value.
#[derive(Debug, Default)]
pub struct BatteryTracker {
    state: BatteryState,
}

impl BatteryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatteryState {
        self.state
    }

    pub fn observe(&mut self, readings: &[DeviceReading]) -> (StatusUpdate, Vec<TrackerEvent>) {
        let (state, events) = update(readings, self.state);
        self.state = state;
        (state.into(), events)
    }
}
