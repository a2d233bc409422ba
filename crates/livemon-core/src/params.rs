//! Monitor parameters: the five slider-driven values and their ranges

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the five user-adjustable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Gain,
    Threshold,
    Ratio,
    Attack,
    Release,
}

impl ParamKind {
    /// All parameters in panel order
    pub const ALL: [ParamKind; 5] = [
        ParamKind::Gain,
        ParamKind::Threshold,
        ParamKind::Ratio,
        ParamKind::Attack,
        ParamKind::Release,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Threshold => "threshold",
            Self::Ratio => "ratio",
            Self::Attack => "attack",
            Self::Release => "release",
        }
    }

    /// Display title for the control panel
    pub fn title(self) -> &'static str {
        match self {
            Self::Gain => "Gain",
            Self::Threshold => "Threshold",
            Self::Ratio => "Ratio",
            Self::Attack => "Attack",
            Self::Release => "Release",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Gain => "x",
            Self::Threshold => "dB",
            Self::Ratio => ":1",
            Self::Attack | Self::Release => "s",
        }
    }

    /// Index into panel-ordered arrays
    pub fn index(self) -> usize {
        match self {
            Self::Gain => 0,
            Self::Threshold => 1,
            Self::Ratio => 2,
            Self::Attack => 3,
            Self::Release => 4,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Slider bounds for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, step: f32, default: f32) -> Self {
        Self { min, max, step, default }
    }

    /// Pin a value into `[min, max]`. Never panics, even on a malformed range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Clamp, then move to the nearest step above `min`, rounded to the step's decimals
    pub fn snap(&self, value: f32) -> f32 {
        let clamped = self.clamp(value);
        if !(self.step.is_finite() && self.step > 0.0) {
            return clamped;
        }
        let (min, step) = (self.min as f64, self.step as f64);
        let steps = ((clamped as f64 - min) / step).round();
        let scale = 10f64.powi(self.decimals() as i32);
        let snapped = ((min + steps * step) * scale).round() / scale;
        self.clamp(snapped as f32)
    }

    /// Number of decimals needed to show a value at this step size
    pub fn decimals(&self) -> usize {
        if !(self.step.is_finite() && self.step > 0.0) {
            return 3;
        }
        let step = self.step as f64;
        (0..=6)
            .find(|&d| {
                let scaled = step * 10f64.powi(d as i32);
                (scaled - scaled.round()).abs() < 1e-6
            })
            .unwrap_or(6)
    }

    /// Format a value for its display label: step precision, trailing zeros trimmed
    pub fn format(&self, value: f32) -> String {
        let mut text = format!("{:.*}", self.decimals(), value);
        if text.contains('.') {
            let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
            text.truncate(trimmed);
        }
        if text == "-0" {
            text = "0".to_string();
        }
        text
    }

    /// Repair inverted bounds, a bad step and an out-of-range default
    pub fn validated(self, fallback: ParamRange) -> Self {
        let finite = [self.min, self.max, self.step, self.default]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return fallback;
        }

        let (min, max) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        let step = if self.step > 0.0 { self.step } else { fallback.step };
        let repaired = Self { min, max, step, default: self.default };
        Self { default: repaired.clamp(self.default), ..repaired }
    }
}

/// One `[ranges.<kind>]` table as written in the config; omitted keys keep the default
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RangeTable {
    min: Option<f32>,
    max: Option<f32>,
    step: Option<f32>,
    default: Option<f32>,
}

impl RangeTable {
    fn over(self, base: ParamRange) -> ParamRange {
        ParamRange {
            min: self.min.unwrap_or(base.min),
            max: self.max.unwrap_or(base.max),
            step: self.step.unwrap_or(base.step),
            default: self.default.unwrap_or(base.default),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RangeTables {
    gain: RangeTable,
    threshold: RangeTable,
    ratio: RangeTable,
    attack: RangeTable,
    release: RangeTable,
}

impl From<RangeTables> for ParamRanges {
    fn from(tables: RangeTables) -> Self {
        let base = ParamRanges::default();
        Self {
            gain: tables.gain.over(base.gain),
            threshold: tables.threshold.over(base.threshold),
            ratio: tables.ratio.over(base.ratio),
            attack: tables.attack.over(base.attack),
            release: tables.release.over(base.release),
        }
    }
}

/// Ranges for all five parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RangeTables")]
pub struct ParamRanges {
    pub gain: ParamRange,
    pub threshold: ParamRange,
    pub ratio: ParamRange,
    pub attack: ParamRange,
    pub release: ParamRange,
}

impl Default for ParamRanges {
    fn default() -> Self {
        Self {
            gain: ParamRange::new(0.0, 2.0, 0.01, 1.0),
            threshold: ParamRange::new(-100.0, 0.0, 1.0, -24.0),
            ratio: ParamRange::new(1.0, 20.0, 0.5, 12.0),
            attack: ParamRange::new(0.0, 1.0, 0.001, 0.003),
            release: ParamRange::new(0.0, 1.0, 0.01, 0.25),
        }
    }
}

impl ParamRanges {
    pub fn get(&self, kind: ParamKind) -> &ParamRange {
        match kind {
            ParamKind::Gain => &self.gain,
            ParamKind::Threshold => &self.threshold,
            ParamKind::Ratio => &self.ratio,
            ParamKind::Attack => &self.attack,
            ParamKind::Release => &self.release,
        }
    }

    /// Initial slider positions
    pub fn defaults(&self) -> ParamSet {
        ParamSet {
            gain: self.gain.default,
            threshold: self.threshold.default,
            ratio: self.ratio.default,
            attack: self.attack.default,
            release: self.release.default,
        }
    }

    pub fn validated(self) -> Self {
        let fallback = Self::default();
        Self {
            gain: self.gain.validated(fallback.gain),
            threshold: self.threshold.validated(fallback.threshold),
            ratio: self.ratio.validated(fallback.ratio),
            attack: self.attack.validated(fallback.attack),
            release: self.release.validated(fallback.release),
        }
    }
}

/// Current values of the five parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    /// Linear gain multiplier
    pub gain: f32,
    /// Compressor threshold in dB
    pub threshold: f32,
    /// Compression ratio (input:output above threshold)
    pub ratio: f32,
    /// Attack time in seconds
    pub attack: f32,
    /// Release time in seconds
    pub release: f32,
}

impl Default for ParamSet {
    fn default() -> Self {
        ParamRanges::default().defaults()
    }
}

impl ParamSet {
    pub fn get(&self, kind: ParamKind) -> f32 {
        match kind {
            ParamKind::Gain => self.gain,
            ParamKind::Threshold => self.threshold,
            ParamKind::Ratio => self.ratio,
            ParamKind::Attack => self.attack,
            ParamKind::Release => self.release,
        }
    }

    pub fn set(&mut self, kind: ParamKind, value: f32) {
        match kind {
            ParamKind::Gain => self.gain = value,
            ParamKind::Threshold => self.threshold = value,
            ParamKind::Ratio => self.ratio = value,
            ParamKind::Attack => self.attack = value,
            ParamKind::Release => self.release = value,
        }
    }
}
