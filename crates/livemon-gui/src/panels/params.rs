//! Slider panel for gain and compressor settings

use egui::{Grid, Slider, Ui};
use livemon_core::{ControlPanel, ParamKind};

pub struct ParamPanel;

impl ParamPanel {
    pub fn new() -> Self {
        Self
    }

    /// Draw the five sliders; returns every slider that moved this frame
    pub fn ui(&mut self, ui: &mut Ui, panel: &ControlPanel) -> Vec<(ParamKind, f32)> {
        let mut changes = Vec::new();

        ui.heading("Gain & Compressor");
        ui.separator();

        Grid::new("param_grid")
            .num_columns(3)
            .spacing([12.0, 10.0])
            .show(ui, |ui| {
                for kind in ParamKind::ALL {
                    let range = panel.ranges().get(kind);
                    let mut value = panel.value(kind);

                    ui.label(kind.title());
                    let slider = Slider::new(&mut value, range.min..=range.max)
                        .step_by(range.step as f64)
                        .show_value(false);
                    if ui.add_sized([220.0, 18.0], slider).changed() {
                        changes.push((kind, value));
                    }
                    ui.monospace(format!("{} {}", panel.label(kind), kind.unit()));
                    ui.end_row();
                }
            });

        changes
    }
}
