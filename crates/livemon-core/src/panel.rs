//! Control panel state: slider values, their labels, and button enablement

use crate::error::ParamError;
use crate::params::{ParamKind, ParamRanges, ParamSet};

/// Enablement of the two momentary controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl Controls {
    /// Start on, stop off
    pub const IDLE: Self = Self { start_enabled: true, stop_enabled: false };
    /// Both off while a start attempt is in flight
    pub const STARTING: Self = Self { start_enabled: false, stop_enabled: false };
    pub const RUNNING: Self = Self { start_enabled: false, stop_enabled: true };
    /// Idle, but an abandoned start has not let go of the device yet
    pub const RELEASING: Self = Self { start_enabled: false, stop_enabled: false };
}

impl Default for Controls {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Slider values and mirrored labels; lives independently of any audio session
#[derive(Debug, Clone)]
pub struct ControlPanel {
    ranges: ParamRanges,
    values: ParamSet,
    labels: [String; 5],
    controls: Controls,
}

impl ControlPanel {
    pub fn new(ranges: ParamRanges) -> Self {
        let values = ranges.defaults();
        let labels = ParamKind::ALL.map(|kind| ranges.get(kind).format(values.get(kind)));
        Self {
            ranges,
            values,
            labels,
            controls: Controls::IDLE,
        }
    }

    pub fn ranges(&self) -> &ParamRanges {
        &self.ranges
    }

    pub fn values(&self) -> ParamSet {
        self.values
    }

    pub fn value(&self, kind: ParamKind) -> f32 {
        self.values.get(kind)
    }

    pub fn label(&self, kind: ParamKind) -> &str {
        &self.labels[kind.index()]
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn set_controls(&mut self, controls: Controls) {
        self.controls = controls;
    }

    /// Store a slider move, snapped to the slider's step, and refresh its label.
    /// Returns the stored value.
    pub fn set(&mut self, kind: ParamKind, value: f32) -> Result<f32, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NotFinite(kind));
        }
        let range = self.ranges.get(kind);
        let value = range.snap(value);
        self.values.set(kind, value);
        self.labels[kind.index()] = range.format(value);
        Ok(value)
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new(ParamRanges::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_panel_mirrors_defaults() {
        let panel = ControlPanel::default();
        assert_eq!(panel.label(ParamKind::Gain), "1");
        assert_eq!(panel.label(ParamKind::Threshold), "-24");
        assert_eq!(panel.label(ParamKind::Ratio), "12");
        assert_eq!(panel.label(ParamKind::Attack), "0.003");
        assert_eq!(panel.label(ParamKind::Release), "0.25");
        assert_eq!(panel.controls(), Controls::IDLE);
    }

    #[test]
    fn test_set_clamps_and_relabels() {
        let mut panel = ControlPanel::default();
        assert_eq!(panel.set(ParamKind::Gain, 1.5), Ok(1.5));
        assert_eq!(panel.label(ParamKind::Gain), "1.5");

        assert_eq!(panel.set(ParamKind::Ratio, 0.2), Ok(1.0));
        assert_eq!(panel.label(ParamKind::Ratio), "1");
        assert_eq!(panel.value(ParamKind::Ratio), 1.0);
    }

    #[test]
    fn test_set_snaps_so_label_matches_value() {
        let mut panel = ControlPanel::default();
        assert_eq!(panel.set(ParamKind::Threshold, -0.4), Ok(0.0));
        assert_eq!(panel.value(ParamKind::Threshold), 0.0);
        assert_eq!(panel.label(ParamKind::Threshold), "0");

        assert_eq!(panel.set(ParamKind::Gain, 1.237), Ok(1.24));
        assert_eq!(panel.label(ParamKind::Gain), "1.24");
    }

    #[test]
    fn test_set_rejects_nan() {
        let mut panel = ControlPanel::default();
        assert_eq!(
            panel.set(ParamKind::Attack, f32::NAN),
            Err(ParamError::NotFinite(ParamKind::Attack))
        );
        assert_eq!(panel.value(ParamKind::Attack), 0.003);
        assert_eq!(panel.label(ParamKind::Attack), "0.003");
    }
}
