use anyhow::{anyhow, ensure, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use crate::config::VibrationConfig;

/// Synthesizes 16-bit PCM from the shaft's rotation frequency.
///
/// Phase is carried across calls so consecutive intervals join without a
/// discontinuity.
#[derive(Debug, Clone)]
pub struct VibrationSensor {
    config: VibrationConfig,
    noise: Normal<f64>,
    phase: f64,
}

impl VibrationSensor {
    pub fn new(config: VibrationConfig) -> Result<Self> {
        ensure!(
            config.harmonics.len() == config.amplitudes.len(),
            "vibration harmonics ({}) and amplitudes ({}) differ in length",
            config.harmonics.len(),
            config.amplitudes.len()
        );
        ensure!(config.cutoff > 0.0, "vibration cutoff must be positive");

        let noise = Normal::new(0.0, config.noise_std_dev)
            .map_err(|e| anyhow!("invalid vibration noise: {}", e))?;

        Ok(Self {
            config,
            noise,
            phase: 0.0,
        })
    }

    pub fn samples_per_interval(&self) -> usize {
        self.config.pcm_rate * self.config.interval_secs
    }

    /// One interval of PCM while the frequency ramps linearly from
    /// `freq_from` to `freq_to` (Hz).
    pub fn sample<R: Rng + ?Sized>(&mut self, freq_from: f64, freq_to: f64, rng: &mut R) -> Vec<i16> {
        let n = self.samples_per_interval();
        let rate = self.config.pcm_rate as f64;
        let cutoff = self.config.cutoff;
        let mut pcm = Vec::with_capacity(n);

        for i in 0..n {
            let fraction = i as f64 / n as f64;
            let freq = (freq_from + (freq_to - freq_from) * fraction).max(0.0);
            self.phase += freq / rate;

            let base = 2.0 * PI * self.phase;
            let mut amplitude: f64 = self
                .config
                .harmonics
                .iter()
                .zip(&self.config.amplitudes)
                .map(|(w, a)| (base * w).sin() * a)
                .sum();
            amplitude += self.noise.sample(rng);

            let clipped = amplitude.clamp(-cutoff, cutoff);
            pcm.push((clipped / cutoff * f64::from(i16::MAX)) as i16);
        }

        pcm
    }
}
