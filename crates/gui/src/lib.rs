use gio::prelude::*;
use gtk4::prelude::*;
use gtk4::Application;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};
use xtrike_monitor_core::{StatusUpdate, LOW_BATTERY_THRESHOLD};

pub mod dispatch;
pub mod tray;
pub mod window;

pub use dispatch::GlibStatusSink;
pub use tray::TrayMenu;
pub use window::StatusWindow;

#[derive(Error, Debug)]
pub enum GuiError {
    #[error("GTK initialization failed: {0}")]
    GtkInitError(String),
    #[error("application exited with code {0}")]
    ApplicationError(i32),
}

/// Commands posted onto the GTK main context from menu actions or from
/// other threads (signal handlers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Show,
    Hide,
    Quit,
}

/// Owns the GTK application and wires the status window, tray menu, and
/// the two main-context channels together. `run` blocks on the GTK main
/// loop until quit.
pub struct MonitorGui {
    application: Application,
}

impl MonitorGui {
    pub fn new(app_id: &str) -> Self {
        let application = Application::builder().application_id(app_id).build();
        Self { application }
    }

    /// Hands out a sender that can post `UiCommand`s from any thread.
    pub fn command_channel() -> (glib::Sender<UiCommand>, glib::Receiver<UiCommand>) {
        glib::MainContext::channel(glib::Priority::DEFAULT)
    }

    pub fn run(
        &self,
        updates: glib::Receiver<StatusUpdate>,
        commands: glib::Receiver<UiCommand>,
        command_sender: glib::Sender<UiCommand>,
    ) -> Result<(), GuiError> {
        let updates = Rc::new(RefCell::new(Some(updates)));
        let commands = Rc::new(RefCell::new(Some(commands)));

        self.application.connect_activate(move |app| {
            // Activate can fire again (e.g. a second launch); the window
            // and channels are only built once.
            if let Some(window) = app.active_window() {
                window.present();
                return;
            }

            info!("GTK application activated");

            // Hiding the only window must not end the main loop; the
            // process stays alive until an explicit quit.
            let hold_guard = app.hold();

            let window = StatusWindow::new(app);
            let tray = TrayMenu::new(command_sender.clone());
            window.set_menu(&tray);

            if let Some(updates) = updates.borrow_mut().take() {
                let window = window.clone();
                updates.attach(None, move |update| {
                    window.apply(update);
                    glib::ControlFlow::Continue
                });
            }

            if let Some(commands) = commands.borrow_mut().take() {
                let app = app.clone();
                let window = window.clone();
                let mut hold_guard = Some(hold_guard);
                commands.attach(None, move |command| {
                    debug!("UI command: {:?}", command);
                    match command {
                        UiCommand::Show => window.present(),
                        UiCommand::Hide => window.hide(),
                        UiCommand::Quit => {
                            hold_guard.take();
                            app.quit();
                        }
                    }
                    glib::ControlFlow::Continue
                });
            }

            window.present();
        });

        // No CLI surface: GTK never sees process arguments.
        let exit_code = self.application.run_with_args::<String>(&[]);
        if exit_code != glib::ExitCode::SUCCESS {
            return Err(GuiError::ApplicationError(exit_code.value()));
        }
        Ok(())
    }
}

pub fn format_percent_text(update: StatusUpdate) -> String {
    if update.connected {
        format!("{}%", update.level)
    } else {
        "--%".to_string()
    }
}

pub fn status_text(update: StatusUpdate) -> &'static str {
    if !update.connected {
        "2.4G / cable / disconnected"
    } else if update.level <= LOW_BATTERY_THRESHOLD {
        "Low battery, connect the cable"
    } else {
        "Connected via Bluetooth"
    }
}

pub fn battery_css_class(update: StatusUpdate) -> &'static str {
    if !update.connected {
        "battery-unknown"
    } else if update.level <= LOW_BATTERY_THRESHOLD {
        "battery-low"
    } else {
        "battery-normal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(level: u8) -> StatusUpdate {
        StatusUpdate {
            connected: true,
            level,
        }
    }

    const DISCONNECTED: StatusUpdate = StatusUpdate {
        connected: false,
        level: 0,
    };

    #[test]
    fn test_percent_text() {
        assert_eq!(format_percent_text(connected(85)), "85%");
        assert_eq!(format_percent_text(connected(0)), "0%");
        assert_eq!(format_percent_text(DISCONNECTED), "--%");
    }

    #[test]
    fn test_status_text_boundaries() {
        assert_eq!(status_text(DISCONNECTED), "2.4G / cable / disconnected");
        assert_eq!(status_text(connected(20)), "Low battery, connect the cable");
        assert_eq!(status_text(connected(21)), "Connected via Bluetooth");
    }

    #[test]
    fn test_css_class_tracks_threshold() {
        assert_eq!(battery_css_class(DISCONNECTED), "battery-unknown");
        assert_eq!(battery_css_class(connected(20)), "battery-low");
        assert_eq!(battery_css_class(connected(21)), "battery-normal");
    }
}
