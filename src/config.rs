use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::degradation::{DecayShape, HorizonRange};

/// Every constant of the physical model, collected in one place.
///
/// Nothing here changes at runtime; a controller and its machine share one
/// copy for their whole lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub decay: DecayShape,
    /// Threshold for the machine's own health channels. Machines run their
    /// channels down to this level rather than `decay.threshold`.
    pub channel_threshold: f64,
    pub thermal_horizon: HorizonRange,
    pub speed_horizon: HorizonRange,

    pub ambient_temperature: f64,
    pub max_temperature: f64,
    pub ambient_pressure: f64,
    pub pressure_factor: f64,

    pub noise: NoiseMagnitudes,

    pub nominal_speed: f64,
    pub cooldown_ticks: u64,
    pub cycle_length_min_minutes: f64,
    pub cycle_length_max_minutes: f64,
    pub ticks_per_minute: u64,
    pub start_offset_max_secs: f64,
    /// Ticks per wall-clock second when the host paces output in real time.
    pub sample_rate_hz: f64,

    pub vibration: VibrationConfig,
}

/// Half-widths of the uniform noise added to each emitted reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseMagnitudes {
    pub ambient_pressure: f64,
    pub ambient_temperature: f64,
    pub speed: f64,
    pub temperature: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationConfig {
    pub harmonics: Vec<f64>,
    pub amplitudes: Vec<f64>,
    pub pcm_rate: usize,
    pub interval_secs: usize,
    pub cutoff: f64,
    pub noise_std_dev: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            decay: DecayShape::default(),
            channel_threshold: 0.0,
            thermal_horizon: HorizonRange::new(5_000, 50_000),
            speed_horizon: HorizonRange::new(5_000, 90_000),
            ambient_temperature: 20.0,
            max_temperature: 120.0,
            ambient_pressure: 101.0,
            pressure_factor: 2.0,
            noise: NoiseMagnitudes::default(),
            nominal_speed: 1000.0,
            cooldown_ticks: 20,
            cycle_length_min_minutes: 1.0,
            cycle_length_max_minutes: 5.0,
            ticks_per_minute: 60,
            start_offset_max_secs: 60.0,
            sample_rate_hz: 2.0,
            vibration: VibrationConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Decay curve used for the health channels installed in a machine.
    pub fn channel_shape(&self) -> DecayShape {
        DecayShape {
            threshold: self.channel_threshold,
            ..self.decay
        }
    }
}

impl Default for NoiseMagnitudes {
    fn default() -> Self {
        Self {
            ambient_pressure: 0.1,
            ambient_temperature: 0.1,
            speed: 5.0,
            temperature: 0.1,
            pressure: 20.0,
        }
    }
}

impl Default for VibrationConfig {
    fn default() -> Self {
        Self {
            harmonics: vec![0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 12.0, 18.0],
            amplitudes: vec![1.0, 5.0, 80.0, 2.0 / 3.0, 8.0, 2.0, 14.0, 50.0],
            pcm_rate: 1024,
            interval_secs: 1,
            cutoff: 150.0,
            noise_std_dev: 0.1,
        }
    }
}

/// Harness knobs that sit outside the physical model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub seed: Option<u64>,
    pub realtime: bool,
    pub vibration: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let seed = match std::env::var("SIM_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("SIM_SEED is not a valid u64: {raw:?}"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            seed,
            realtime: env_flag("SIM_REALTIME"),
            vibration: env_flag("SIM_VIBRATION"),
        })
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.ambient_temperature, 20.0);
        assert_eq!(config.max_temperature, 120.0);
        assert_eq!(config.ambient_pressure, 101.0);
        assert_eq!(config.pressure_factor, 2.0);
        assert_eq!(config.thermal_horizon, HorizonRange::new(5_000, 50_000));
        assert_eq!(config.speed_horizon, HorizonRange::new(5_000, 90_000));
        assert_eq!(config.cooldown_ticks, 20);
    }

    #[test]
    fn test_channel_shape_uses_channel_threshold() {
        let config = SimulationConfig::default();
        let shape = config.channel_shape();
        assert_eq!(config.decay.threshold, 0.45);
        assert_eq!(shape.threshold, 0.0);
        assert_eq!(shape.offset, config.decay.offset);
        assert_eq!(shape.rate, config.decay.rate);
        assert_eq!(shape.exponent, config.decay.exponent);
    }

    #[test]
    fn test_vibration_tables_line_up() {
        let vibration = VibrationConfig::default();
        assert_eq!(vibration.harmonics.len(), vibration.amplitudes.len());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn test_simulation_config_json_shape() {
        let json = serde_json::to_value(SimulationConfig::default()).unwrap();
        assert_eq!(json["decay"]["threshold"], 0.45);
        assert_eq!(json["speed_horizon"]["max"], 90_000);
    }
}
