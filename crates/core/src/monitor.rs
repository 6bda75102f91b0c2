use crate::{BatteryTracker, CoreError, DeviceQuery, Notifier, StatusSink, TrackerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Upper bound on how long `stop` waits for the task to finish its
/// in-flight cycle before abandoning it. Sized to exceed one external
/// query by a wide margin.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

const NOTIFICATION_TITLE: &str = "Xtrike Me GK-994W";

/// Drives the poll cycle: sleep, query, fold into the tracker, dispatch
/// the resulting status and any alert events. The spawned task is the
/// sole owner of the tracker state; everything it hands out is copied by
/// value, so no locks cross the task boundary.
pub struct BatteryPoller {
    query: Arc<dyn DeviceQuery>,
    sink: Arc<dyn StatusSink>,
    notifier: Arc<dyn Notifier>,
    task: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl BatteryPoller {
    pub fn new(
        query: Arc<dyn DeviceQuery>,
        sink: Arc<dyn StatusSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            query,
            sink,
            notifier,
            task: None,
            shutdown: None,
        }
    }

    pub fn start(&mut self, interval_duration: Duration) -> Result<(), CoreError> {
        if self.task.is_some() {
            return Err(CoreError::PollerAlreadyRunning);
        }

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        self.shutdown = Some(shutdown_sender);

        let query = Arc::clone(&self.query);
        let sink = Arc::clone(&self.sink);
        let notifier = Arc::clone(&self.notifier);

        let task = tokio::spawn(async move {
            polling_loop(query, sink, notifier, interval_duration, shutdown_receiver).await;
        });

        self.task = Some(task);
        info!("Battery polling started with interval {:?}", interval_duration);
        Ok(())
    }

    /// Signals the loop to exit and waits for it to finish its current
    /// cycle. An in-flight external call is not interrupted, so shutdown
    /// may lag by up to one call's duration. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }

        if let Some(mut task) = self.task.take() {
            match timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(_) => info!("Battery polling stopped"),
                Err(_) => {
                    warn!("Polling task did not stop within {:?}, aborting", SHUTDOWN_GRACE);
                    task.abort();
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

async fn polling_loop(
    query: Arc<dyn DeviceQuery>,
    sink: Arc<dyn StatusSink>,
    notifier: Arc<dyn Notifier>,
    interval_duration: Duration,
    mut shutdown_receiver: oneshot::Receiver<()>,
) {
    let mut tracker = BatteryTracker::new();
    let mut interval_timer = interval(interval_duration);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // Shutdown is only observed between cycles; the tick arm runs a
        // full query/update/dispatch sequence to completion.
        tokio::select! {
            _ = interval_timer.tick() => {
                let readings = query.query().await;
                let (update, events) = tracker.observe(&readings);
                debug!(
                    "Poll cycle: {} readings, connected={}, level={}",
                    readings.len(),
                    update.connected,
                    update.level
                );

                sink.render(update);

                for event in events {
                    let TrackerEvent::LowBattery(level) = event;
                    notifier.notify(
                        NOTIFICATION_TITLE,
                        &format!("Battery at {}%, connect the cable", level),
                        true,
                    );
                }
            }
            _ = &mut shutdown_receiver => {
                info!("Shutdown requested, polling loop exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceReading, StatusUpdate};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct StubQuery {
        responses: Mutex<VecDeque<Vec<DeviceReading>>>,
        steady: Vec<DeviceReading>,
    }

    impl StubQuery {
        fn new(responses: Vec<Vec<DeviceReading>>, steady: Vec<DeviceReading>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                steady,
            }
        }
    }

    impl DeviceQuery for StubQuery {
        fn query(&self) -> Pin<Box<dyn Future<Output = Vec<DeviceReading>> + Send + '_>> {
            let readings = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.steady.clone());
            Box::pin(async move { readings })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<StatusUpdate>>,
    }

    impl StatusSink for RecordingSink {
        fn render(&self, update: StatusUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, bool)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, _title: &str, message: &str, urgent: bool) {
            self.messages.lock().unwrap().push((message.to_string(), urgent));
        }
    }

    fn low_reading() -> Vec<DeviceReading> {
        vec![DeviceReading::new("GK-994W Keyboard", Some(15))]
    }

    #[tokio::test]
    async fn test_poller_renders_and_alerts_once_per_episode() {
        let query = Arc::new(StubQuery::new(Vec::new(), low_reading()));
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut poller = BatteryPoller::new(
            query,
            Arc::clone(&sink) as Arc<dyn StatusSink>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        poller.start(Duration::from_millis(10)).unwrap();
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;
        assert!(!poller.is_running());

        let updates = sink.updates.lock().unwrap();
        assert!(updates.len() >= 2, "expected several poll cycles");
        assert!(updates.iter().all(|u| u.connected && u.level == 15));

        // Every cycle saw a low level, but the alert fired exactly once.
        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.contains("15%"));
        assert!(messages[0].1, "low-battery alert is urgent");
    }

    #[tokio::test]
    async fn test_poller_recovers_from_query_failure() {
        // One empty cycle (simulated query failure) between two low
        // readings: the display flips to disconnected but no second alert
        // fires.
        let query = Arc::new(StubQuery::new(
            vec![low_reading(), Vec::new()],
            low_reading(),
        ));
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut poller = BatteryPoller::new(
            query,
            Arc::clone(&sink) as Arc<dyn StatusSink>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        poller.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;

        let updates = sink.updates.lock().unwrap();
        assert!(updates[0].connected);
        assert!(!updates[1].connected, "failed query renders as disconnected");
        assert!(updates[2].connected);

        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let query = Arc::new(StubQuery::new(Vec::new(), Vec::new()));
        let mut poller = BatteryPoller::new(
            query,
            Arc::new(RecordingSink::default()),
            Arc::new(RecordingNotifier::default()),
        );

        poller.start(Duration::from_secs(60)).unwrap();
        assert!(matches!(
            poller.start(Duration::from_secs(60)),
            Err(CoreError::PollerAlreadyRunning)
        ));
        poller.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_no_op() {
        let query = Arc::new(StubQuery::new(Vec::new(), Vec::new()));
        let mut poller = BatteryPoller::new(
            query,
            Arc::new(RecordingSink::default()),
            Arc::new(RecordingNotifier::default()),
        );
        poller.stop().await;
        assert!(!poller.is_running());
    }
}
