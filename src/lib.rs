pub mod config;
pub mod degradation;
pub mod engine;
pub mod error;
pub mod factory;
pub mod machine;
pub mod types;

pub use config::{Config, SimulationConfig};
pub use error::MachineFault;
pub use types::*;
