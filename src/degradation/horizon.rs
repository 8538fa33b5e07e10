use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Inclusive range a remaining-life horizon is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonRange {
    pub min: u64,
    pub max: u64,
}

impl HorizonRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, ttf: u64) -> bool {
        (self.min..=self.max).contains(&ttf)
    }
}

/// Independent horizons for the thermal and speed channels.
pub fn draw_horizons<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> (u64, u64) {
    let thermal = config.thermal_horizon.draw(rng);
    let speed = config.speed_horizon.draw(rng);
    (thermal, speed)
}
