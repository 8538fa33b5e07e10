pub mod convergence;
pub mod state;
pub mod vibration;

pub use convergence::{converge, round2};
pub use state::{HealthChannel, MachineState};
pub use vibration::VibrationSensor;
