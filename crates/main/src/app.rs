use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::sync::Arc;
use thiserror::Error;
use tokio_stream::StreamExt;
use tracing::info;
use xtrike_monitor_core::{BatteryPoller, CoreError, PnpDeviceQuery, POLL_INTERVAL};
use xtrike_monitor_gui::{GuiError, MonitorGui, UiCommand};
use xtrike_monitor_notifications::DesktopNotifier;

const APP_ID: &str = "com.xtrike.monitor";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("GUI error: {0}")]
    Gui(#[from] GuiError),
    #[error("system error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wires the polling core to the GTK surface and the notification
/// service. GTK owns the main thread, so the tokio runtime is built by
/// hand and the polling task runs beside the GTK main loop.
pub struct MonitorApp {
    runtime: tokio::runtime::Runtime,
}

impl MonitorApp {
    pub fn new() -> Result<Self, AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    pub fn run(self) -> Result<(), AppError> {
        let (sink, updates) = xtrike_monitor_gui::GlibStatusSink::channel();
        let (command_sender, commands) = MonitorGui::command_channel();

        let query = Arc::new(PnpDeviceQuery::new());
        let notifier = Arc::new(DesktopNotifier::new());
        let mut poller = BatteryPoller::new(query, Arc::new(sink), notifier);

        {
            let _guard = self.runtime.enter();
            poller.start(POLL_INTERVAL)?;
        }

        // SIGINT/SIGTERM map to the same quit command as the tray menu.
        let signals = Signals::new([SIGINT, SIGTERM])?;
        let signals_handle = signals.handle();
        let signal_commands = command_sender.clone();
        let signals_task = self.runtime.spawn(async move {
            let mut signals = signals.fuse();
            while let Some(signal) = signals.next().await {
                match signal {
                    SIGINT | SIGTERM => {
                        info!("Received shutdown signal");
                        let _ = signal_commands.send(UiCommand::Quit);
                        break;
                    }
                    _ => {}
                }
            }
        });

        let gui = MonitorGui::new(APP_ID);
        let gui_result = gui.run(updates, commands, command_sender);

        // The GTK main loop has exited; stop the polling task before the
        // process goes away.
        signals_handle.close();
        self.runtime.block_on(async {
            poller.stop().await;
            let _ = signals_task.await;
        });

        gui_result?;
        Ok(())
    }
}
