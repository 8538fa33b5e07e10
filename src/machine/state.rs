use anyhow::Result;
use rand::Rng;

use super::convergence::{converge, round2};
use super::vibration::VibrationSensor;
use crate::config::SimulationConfig;
use crate::degradation::HealthSample;
use crate::error::MachineFault;
use crate::types::{MachineId, MachineReading};

/// Source of health values for one subcomponent. Normally a
/// [`HealthSequence`](crate::degradation::HealthSequence); any iterator will do.
pub type HealthChannel = Box<dyn Iterator<Item = HealthSample> + Send>;

/// Kinematic and thermal state of one rotating machine.
///
/// `h1` drives the thermal side (temperature, pressure); `h2` drives speed
/// response. Running out of either one breaks the machine.
pub struct MachineState {
    id: MachineId,
    config: SimulationConfig,
    speed: f64,
    speed_desired: f64,
    temperature: f64,
    pressure: f64,
    t: u64,
    fault: Option<MachineFault>,
    h1: HealthChannel,
    h2: HealthChannel,
    vibration: Option<VibrationSensor>,
}

impl MachineState {
    pub fn new<H1, H2>(id: MachineId, config: SimulationConfig, h1: H1, h2: H2) -> Self
    where
        H1: Iterator<Item = HealthSample> + Send + 'static,
        H2: Iterator<Item = HealthSample> + Send + 'static,
    {
        Self {
            id,
            speed: 0.0,
            speed_desired: 0.0,
            temperature: config.ambient_temperature,
            pressure: config.ambient_pressure,
            t: 0,
            fault: None,
            h1: Box::new(h1),
            h2: Box::new(h2),
            vibration: None,
            config,
        }
    }

    /// Attach a vibration sensor; each reading then carries one PCM interval.
    pub fn with_vibration(mut self) -> Result<Self> {
        self.vibration = Some(VibrationSensor::new(self.config.vibration.clone())?);
        Ok(self)
    }

    pub fn id(&self) -> &MachineId {
        &self.id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn speed_desired(&self) -> f64 {
        self.speed_desired
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Steps taken since construction.
    pub fn ticks(&self) -> u64 {
        self.t
    }

    pub fn is_broken(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<MachineFault> {
        self.fault
    }

    pub fn set_speed(&mut self, target: f64) {
        self.speed_desired = target;
    }

    /// Install fresh health channels and clear the broken state.
    pub fn set_health<H1, H2>(&mut self, h1: H1, h2: H2)
    where
        H1: Iterator<Item = HealthSample> + Send + 'static,
        H2: Iterator<Item = HealthSample> + Send + 'static,
    {
        self.h1 = Box::new(h1);
        self.h2 = Box::new(h2);
        self.fault = None;
    }

    /// Advance one tick.
    ///
    /// A broken machine is not advanced; it keeps returning the fault that
    /// broke it until repaired.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<MachineReading, MachineFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let h1 = self.pull(MachineFault::F1)?;
        let h2 = self.pull(MachineFault::F2)?;

        let speed_before = self.speed;
        self.speed = (self.speed + (2.0 - h2) * self.speed_desired) / 2.0;

        // The floor is the ambient pressure constant, not ambient temperature.
        let bounded_temperature = converge(
            self.temperature,
            self.config.ambient_pressure,
            self.config.max_temperature,
            self.speed / 10.0,
            0.01 * self.speed / 1000.0,
        );
        self.temperature = (2.0 - h1) * bounded_temperature;

        let bounded_pressure = converge(
            self.pressure,
            self.config.ambient_pressure,
            f64::INFINITY,
            self.speed * self.config.pressure_factor,
            0.3 * self.speed / 1000.0,
        );
        self.pressure = h1 * bounded_pressure;

        let vibration = self
            .vibration
            .as_mut()
            .map(|sensor| sensor.sample(speed_before / 60.0, self.speed / 60.0, rng));

        self.t += 1;

        let noise = self.config.noise;
        let ambient_pressure = self.config.ambient_pressure + jitter(rng, noise.ambient_pressure);
        let ambient_temperature =
            self.config.ambient_temperature + jitter(rng, noise.ambient_temperature);
        let speed = self.speed + jitter(rng, noise.speed);
        let temperature = self.temperature + jitter(rng, noise.temperature);
        let pressure = self.pressure + jitter(rng, noise.pressure);

        Ok(MachineReading {
            speed_desired: round2(self.speed_desired),
            ambient_pressure: round2(ambient_pressure),
            ambient_temperature: round2(ambient_temperature),
            speed: round2(speed),
            temperature: round2(temperature),
            pressure: round2(pressure),
            vibration,
        })
    }

    fn pull(&mut self, fault: MachineFault) -> Result<f64, MachineFault> {
        let channel = match fault {
            MachineFault::F1 => &mut self.h1,
            MachineFault::F2 => &mut self.h2,
        };

        match channel.next() {
            Some(sample) => Ok(sample.h),
            None => {
                self.fault = Some(fault);
                Err(fault)
            }
        }
    }
}

impl std::fmt::Debug for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineState")
            .field("id", &self.id)
            .field("speed", &self.speed)
            .field("speed_desired", &self.speed_desired)
            .field("temperature", &self.temperature)
            .field("pressure", &self.pressure)
            .field("t", &self.t)
            .field("fault", &self.fault)
            .field("vibration", &self.vibration.is_some())
            .finish()
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, magnitude: f64) -> f64 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-magnitude..=magnitude)
}
