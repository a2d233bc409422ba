//! Transport bar: start/stop/cancel, input device and status line

use egui::{Color32, ComboBox, RichText, Ui};
use livemon_core::{Controls, Status};
use livemon_services::{InputDevice, MonitorState};

/// Actions that can be triggered from transport
pub enum TransportAction {
    None,
    Start,
    Stop,
    CancelStart,
    SelectDevice(Option<String>),
    RefreshDevices,
}

pub struct TransportPanel;

impl TransportPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn ui(
        &mut self,
        ui: &mut Ui,
        state: MonitorState,
        controls: Controls,
        status: &Status,
        devices: &[InputDevice],
        selected_device: Option<&str>,
    ) -> TransportAction {
        let mut action = TransportAction::None;

        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;

            let start = ui.add_enabled(
                controls.start_enabled,
                egui::Button::new(RichText::new("\u{25B6} Start").size(16.0)),
            );
            if start.clicked() {
                action = TransportAction::Start;
            }
            start.on_hover_text("Start monitoring the microphone");

            let stop = ui.add_enabled(
                controls.stop_enabled,
                egui::Button::new(RichText::new("\u{23F9} Stop").size(16.0)),
            );
            if stop.clicked() {
                action = TransportAction::Stop;
            }

            if state == MonitorState::Starting && ui.button("Cancel").clicked() {
                action = TransportAction::CancelStart;
            }

            ui.separator();

            ui.add_enabled_ui(state == MonitorState::Idle, |ui| {
                let selected_text = selected_device.unwrap_or("Default input");
                ComboBox::from_id_salt("input_device")
                    .selected_text(selected_text)
                    .width(180.0)
                    .show_ui(ui, |ui| {
                        if ui.selectable_label(selected_device.is_none(), "Default input").clicked() {
                            action = TransportAction::SelectDevice(None);
                        }
                        for device in devices {
                            let is_selected = selected_device == Some(device.name.as_str());
                            let text = format!("{} ({} Hz, {} ch)", device.name, device.sample_rate, device.channels);
                            if ui.selectable_label(is_selected, text).clicked() {
                                action = TransportAction::SelectDevice(Some(device.name.clone()));
                            }
                        }
                    });
                if ui.button("\u{21BB}").on_hover_text("Rescan input devices").clicked() {
                    action = TransportAction::RefreshDevices;
                }
            });
        });

        ui.horizontal(|ui| {
            let color = match status {
                Status::Error(_) => Color32::from_rgb(220, 80, 80),
                Status::Active => Color32::from_rgb(100, 200, 100),
                _ => ui.visuals().text_color(),
            };
            ui.label("Status:");
            ui.label(RichText::new(status.to_string()).color(color));
            if state == MonitorState::Running {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new("Listen via headphones").weak());
                });
            }
        });

        action
    }
}
