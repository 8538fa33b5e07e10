use anyhow::Result;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::degradation::{draw_horizons, HealthSequence};
use crate::machine::MachineState;
use crate::types::MachineId;

#[derive(Debug, Clone, Default)]
pub struct FactoryConfig {
    pub simulation: SimulationConfig,
    pub vibration: bool,
}

/// A fresh machine at `index`, each health channel seeded with its own
/// randomly drawn horizon.
pub fn create_machine<R: Rng + ?Sized>(
    index: usize,
    config: &FactoryConfig,
    rng: &mut R,
) -> Result<MachineState> {
    let (thermal_ttf, speed_ttf) = draw_horizons(&config.simulation, rng);
    let shape = config.simulation.channel_shape();

    log::debug!(
        "Creating {} with thermal horizon {} and speed horizon {}",
        MachineId::from_index(index),
        thermal_ttf,
        speed_ttf
    );

    let machine = MachineState::new(
        MachineId::from_index(index),
        config.simulation.clone(),
        HealthSequence::new(thermal_ttf, shape),
        HealthSequence::new(speed_ttf, shape),
    );

    if config.vibration {
        machine.with_vibration()
    } else {
        Ok(machine)
    }
}

/// `n` machines named `M_0000`, `M_0001`, ...
pub fn create_machines<R: Rng + ?Sized>(
    n: usize,
    config: &FactoryConfig,
    rng: &mut R,
) -> Result<Vec<MachineState>> {
    (0..n).map(|i| create_machine(i, config, rng)).collect()
}
