pub mod horizon;
pub mod sequence;

pub use horizon::{draw_horizons, HorizonRange};
pub use sequence::{DecayShape, HealthSample, HealthSequence};
