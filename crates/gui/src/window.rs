use crate::{battery_css_class, format_percent_text, status_text, TrayMenu};
use gtk4::prelude::*;
use gtk4::{Application, ApplicationWindow, Box, HeaderBar, Label, MenuButton, Orientation, ProgressBar};
use tracing::debug;
use xtrike_monitor_core::StatusUpdate;

const WINDOW_WIDTH: i32 = 300;
const WINDOW_HEIGHT: i32 = 180;

const BATTERY_CLASSES: [&str; 3] = ["battery-unknown", "battery-low", "battery-normal"];

/// The small status window: device title, large percent readout, progress
/// bar, status line. Closing the window hides it; the process keeps
/// polling until an explicit quit.
#[derive(Clone)]
pub struct StatusWindow {
    window: ApplicationWindow,
    menu_button: MenuButton,
    percent_label: Label,
    progress_bar: ProgressBar,
    status_label: Label,
}

impl StatusWindow {
    pub fn new(app: &Application) -> Self {
        let window = ApplicationWindow::builder()
            .application(app)
            .title("Xtrike Monitor")
            .default_width(WINDOW_WIDTH)
            .default_height(WINDOW_HEIGHT)
            .resizable(false)
            .build();

        let header_bar = HeaderBar::new();
        let menu_button = MenuButton::builder()
            .icon_name("open-menu-symbolic")
            .build();
        header_bar.pack_end(&menu_button);
        window.set_titlebar(Some(&header_bar));

        let content_box = Box::new(Orientation::Vertical, 8);
        content_box.set_margin_start(20);
        content_box.set_margin_end(20);
        content_box.set_margin_top(16);
        content_box.set_margin_bottom(16);

        let title_label = Label::new(Some("Xtrike Me GK-994W"));
        title_label.set_css_classes(&["title-4"]);
        content_box.append(&title_label);

        let percent_label = Label::new(Some("--%"));
        percent_label.set_css_classes(&["title-1", "battery-unknown"]);
        content_box.append(&percent_label);

        let progress_bar = ProgressBar::new();
        progress_bar.set_fraction(0.0);
        progress_bar.set_margin_top(4);
        progress_bar.set_margin_bottom(4);
        content_box.append(&progress_bar);

        let status_label = Label::new(Some("Searching for device..."));
        status_label.set_css_classes(&["caption", "dim-label"]);
        content_box.append(&status_label);

        window.set_child(Some(&content_box));

        // The window-manager close maps to hide, not quit.
        window.connect_close_request(|window| {
            debug!("Close request intercepted, hiding window");
            window.set_visible(false);
            glib::Propagation::Stop
        });

        Self {
            window,
            menu_button,
            percent_label,
            progress_bar,
            status_label,
        }
    }

    pub fn set_menu(&self, tray: &TrayMenu) {
        self.menu_button.set_popover(Some(tray.popover()));
    }

    /// Applies one status update to the widgets. Runs on the GTK main
    /// context only.
    pub fn apply(&self, update: StatusUpdate) {
        self.percent_label.set_text(&format_percent_text(update));
        self.status_label.set_text(status_text(update));

        let fraction = if update.connected {
            f64::from(update.level) / 100.0
        } else {
            0.0
        };
        self.progress_bar.set_fraction(fraction);

        let class = battery_css_class(update);
        for stale in BATTERY_CLASSES.iter().filter(|c| **c != class) {
            self.percent_label.remove_css_class(stale);
        }
        self.percent_label.add_css_class(class);
    }

    pub fn present(&self) {
        self.window.present();
    }

    pub fn hide(&self) {
        self.window.set_visible(false);
    }
}
