//! Output level and gain-reduction meters

use std::sync::Arc;

use egui::{Color32, Rect, Sense, Stroke, Ui, Vec2};
use livemon_services::MeterState;

const METER_WIDTH: f32 = 240.0;
const METER_HEIGHT: f32 = 12.0;
/// Bottom of both meter scales
const FLOOR_DB: f32 = -60.0;
const MAX_REDUCTION_DB: f32 = 30.0;

pub struct MeterPanel {
    display_peak: f32,
    display_reduction: f32,
}

impl MeterPanel {
    pub fn new() -> Self {
        Self {
            display_peak: 0.0,
            display_reduction: 0.0,
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, meter: Option<&Arc<MeterState>>) {
        let (peak, reduction) = meter.map_or((0.0, 0.0), |m| (m.peak(), m.gain_reduction_db()));

        let smoothing = 0.3;
        self.display_peak = self.display_peak * (1.0 - smoothing) + peak * smoothing;
        self.display_reduction = self.display_reduction * (1.0 - smoothing) + reduction * smoothing;

        ui.horizontal(|ui| {
            ui.label("Out");
            self.draw_level(ui, meter);
        });
        ui.horizontal(|ui| {
            ui.label("GR ");
            self.draw_reduction(ui);
        });
    }

    fn draw_level(&mut self, ui: &mut Ui, meter: Option<&Arc<MeterState>>) {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(METER_WIDTH + 8.0, METER_HEIGHT + 2.0),
            Sense::click(),
        );

        let meter_rect = Rect::from_min_size(
            response.rect.min + Vec2::new(1.0, 1.0),
            Vec2::new(METER_WIDTH, METER_HEIGHT),
        );

        painter.rect_filled(meter_rect, 2.0, Color32::from_gray(25));

        let peak_db = Self::linear_to_db(self.display_peak);
        let peak_width = Self::db_to_width(peak_db, meter_rect.width());

        if peak_width > 0.0 {
            let x_12db = Self::db_to_width(-12.0, meter_rect.width());
            let x_6db = Self::db_to_width(-6.0, meter_rect.width());

            let segments = [
                (0.0, x_12db, Color32::from_rgb(50, 160, 50)),
                (x_12db, x_6db, Color32::from_rgb(180, 160, 50)),
                (x_6db, meter_rect.width(), Color32::from_rgb(180, 50, 50)),
            ];
            for (start, end, color) in segments {
                let end = peak_width.min(end);
                if end <= start {
                    continue;
                }
                painter.rect_filled(
                    Rect::from_min_max(
                        egui::pos2(meter_rect.left() + start, meter_rect.top()),
                        egui::pos2(meter_rect.left() + end, meter_rect.bottom()),
                    ),
                    0.0,
                    color,
                );
            }
        }

        painter.rect_stroke(meter_rect, 2.0, Stroke::new(1.0, Color32::from_gray(50)), egui::StrokeKind::Outside);

        if let Some(meter) = meter.filter(|m| m.is_clipped()) {
            painter.rect_filled(
                Rect::from_min_size(
                    egui::pos2(meter_rect.right() + 2.0, meter_rect.top()),
                    Vec2::new(5.0, METER_HEIGHT),
                ),
                2.0,
                Color32::RED,
            );
            if response.clicked() {
                meter.clear_clip();
            }
        }

        ui.monospace(format!("{:+.0} dB", peak_db));
    }

    fn draw_reduction(&mut self, ui: &mut Ui) {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(METER_WIDTH + 8.0, METER_HEIGHT + 2.0),
            Sense::hover(),
        );

        let meter_rect = Rect::from_min_size(
            response.rect.min + Vec2::new(1.0, 1.0),
            Vec2::new(METER_WIDTH, METER_HEIGHT),
        );

        painter.rect_filled(meter_rect, 2.0, Color32::from_gray(25));

        // grows right-to-left from the meter's right edge
        let depth = (-self.display_reduction).clamp(0.0, MAX_REDUCTION_DB) / MAX_REDUCTION_DB;
        let width = depth * meter_rect.width();
        if width > 0.0 {
            painter.rect_filled(
                Rect::from_min_max(
                    egui::pos2(meter_rect.right() - width, meter_rect.top()),
                    meter_rect.right_bottom(),
                ),
                0.0,
                Color32::from_rgb(200, 130, 40),
            );
        }

        painter.rect_stroke(meter_rect, 2.0, Stroke::new(1.0, Color32::from_gray(50)), egui::StrokeKind::Outside);

        ui.monospace(format!("{:.1} dB", self.display_reduction));
    }

    fn linear_to_db(linear: f32) -> f32 {
        if linear < 0.00001 {
            return FLOOR_DB;
        }
        20.0 * linear.log10()
    }

    fn db_to_width(db: f32, max_width: f32) -> f32 {
        let normalized = (db - FLOOR_DB) / -FLOOR_DB;
        normalized.clamp(0.0, 1.0) * max_width
    }
}
