use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Parameters of one operating cycle, drawn fresh each time a cycle starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclePlan {
    pub length_minutes: f64,
    /// Drawn for parity with the cycle schedule; does not affect timing.
    pub start_offset_secs: f64,
    /// Ticks in the cycle, at least one.
    pub duration: u64,
    /// Tick index at which the setpoint drops to zero.
    pub cooldown_point: u64,
}

impl CyclePlan {
    pub fn draw<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Self {
        let (min, max) = (
            config.cycle_length_min_minutes,
            config.cycle_length_max_minutes,
        );
        let length_minutes = if max > min {
            rng.gen_range(min..=max)
        } else {
            min
        };
        let start_offset_secs = if config.start_offset_max_secs > 0.0 {
            rng.gen_range(0.0..config.start_offset_max_secs)
        } else {
            0.0
        };

        let duration = (length_minutes * config.ticks_per_minute as f64).ceil() as u64;
        Self::build(length_minutes, start_offset_secs, duration, config.cooldown_ticks)
    }

    /// A plan with an exact tick count and no offset.
    pub fn with_duration(config: &SimulationConfig, duration: u64) -> Self {
        let length_minutes = duration as f64 / config.ticks_per_minute.max(1) as f64;
        Self::build(length_minutes, 0.0, duration, config.cooldown_ticks)
    }

    fn build(length_minutes: f64, start_offset_secs: f64, duration: u64, cooldown_ticks: u64) -> Self {
        let duration = duration.max(1);
        Self {
            length_minutes,
            start_offset_secs,
            duration,
            cooldown_point: duration.saturating_sub(cooldown_ticks),
        }
    }

    pub fn is_cooling(&self, index: u64) -> bool {
        index >= self.cooldown_point
    }
}
