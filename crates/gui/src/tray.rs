use crate::UiCommand;
use gtk4::prelude::*;
use gtk4::{Box, Button, Orientation, Popover, Separator};
use tracing::warn;

/// Menu exposing the three externally triggered commands: show, hide,
/// quit. Selections are posted as `UiCommand`s so the same channel serves
/// menu clicks and out-of-thread requests (signal handlers).
pub struct TrayMenu {
    popover: Popover,
}

impl TrayMenu {
    pub fn new(commands: glib::Sender<UiCommand>) -> Self {
        let popover = Popover::new();

        let menu_box = Box::new(Orientation::Vertical, 4);
        menu_box.set_margin_start(8);
        menu_box.set_margin_end(8);
        menu_box.set_margin_top(8);
        menu_box.set_margin_bottom(8);

        menu_box.append(&Self::command_button("Show", UiCommand::Show, &commands, &popover));
        menu_box.append(&Self::command_button("Hide", UiCommand::Hide, &commands, &popover));
        menu_box.append(&Separator::new(Orientation::Horizontal));
        menu_box.append(&Self::command_button("Quit", UiCommand::Quit, &commands, &popover));

        popover.set_child(Some(&menu_box));

        Self { popover }
    }

    fn command_button(
        label: &str,
        command: UiCommand,
        commands: &glib::Sender<UiCommand>,
        popover: &Popover,
    ) -> Button {
        let button = Button::with_label(label);
        button.set_has_frame(false);

        let commands = commands.clone();
        let popover = popover.clone();
        button.connect_clicked(move |_| {
            popover.popdown();
            if let Err(e) = commands.send(command) {
                warn!("Failed to post {:?} command: {}", command, e);
            }
        });

        button
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }
}
