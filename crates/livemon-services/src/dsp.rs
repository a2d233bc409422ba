//! Gain and dynamics-compression stages applied to mono blocks

use fundsp::hacker::{amp_db, db_amp};

/// Linear gain multiply
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// Compressor settings read from the live parameters once per block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_s: f32,
    pub release_s: f32,
}

/// Feed-forward hard-knee compressor with a peak envelope follower
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    envelope: f32,
    reduction_db: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            envelope: 0.0,
            reduction_db: 0.0,
        }
    }

    /// Gain reduction applied to the last processed sample, in dB
    pub fn gain_reduction_db(&self) -> f32 {
        self.reduction_db
    }

    pub fn process(&mut self, samples: &mut [f32], settings: &CompressorSettings) {
        let attack = smoothing_coefficient(settings.attack_s, self.sample_rate);
        let release = smoothing_coefficient(settings.release_s, self.sample_rate);
        let slope = 1.0 - 1.0 / settings.ratio.max(1.0);

        for sample in samples.iter_mut() {
            let level = sample.abs();
            let coef = if level > self.envelope { attack } else { release };
            self.envelope = coef * self.envelope + (1.0 - coef) * level;

            let level_db = amp_db(self.envelope);
            self.reduction_db = if level_db > settings.threshold_db {
                (settings.threshold_db - level_db) * slope
            } else {
                0.0
            };

            *sample *= db_amp(self.reduction_db);
        }
    }
}

/// One-pole smoothing coefficient; zero time means the envelope jumps immediately
fn smoothing_coefficient(time_s: f32, sample_rate: f32) -> f32 {
    if !(time_s > 0.0) {
        return 0.0;
    }
    (-1.0 / (time_s * sample_rate)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold_db: f32, ratio: f32) -> CompressorSettings {
        CompressorSettings { threshold_db, ratio, attack_s: 0.0, release_s: 0.0 }
    }

    #[test]
    fn test_gain_multiplies() {
        let mut block = vec![0.5, -0.25, 0.0];
        apply_gain(&mut block, 2.0);
        assert_eq!(block, vec![1.0, -0.5, 0.0]);
    }

    #[test]
    fn test_below_threshold_untouched() {
        let mut comp = Compressor::new(48_000.0);
        let mut block = vec![0.01; 64];
        comp.process(&mut block, &settings(-20.0, 4.0));
        assert!(block.iter().all(|s| (s - 0.01).abs() < 1e-6));
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_above_threshold_reduced_by_ratio() {
        // 0 dBFS in, -20 dB threshold, 4:1 → 15 dB of reduction
        let mut comp = Compressor::new(48_000.0);
        let mut block = vec![1.0; 64];
        comp.process(&mut block, &settings(-20.0, 4.0));
        assert!((comp.gain_reduction_db() + 15.0).abs() < 1e-3);
        let expected = 10f32.powf(-15.0 / 20.0);
        assert!((block[63] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_unity_ratio_is_transparent() {
        let mut comp = Compressor::new(48_000.0);
        let mut block = vec![0.9; 16];
        comp.process(&mut block, &settings(-40.0, 0.5));
        assert!(block.iter().all(|s| (s - 0.9).abs() < 1e-5));
    }

    #[test]
    fn test_attack_smooths_onset() {
        let mut comp = Compressor::new(48_000.0);
        let slow = CompressorSettings { threshold_db: -20.0, ratio: 4.0, attack_s: 0.05, release_s: 0.1 };
        let mut block = vec![1.0; 8];
        comp.process(&mut block, &slow);
        // envelope has barely risen after 8 samples of a 50 ms attack
        assert!(comp.gain_reduction_db() > -15.0);
        assert!(block[0] > 0.99);
    }
}
