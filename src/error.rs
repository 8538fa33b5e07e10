use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A machine breakdown. Raised when a subcomponent's health sequence runs
/// out; the machine is marked broken before the fault is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum MachineFault {
    /// Thermal channel (h1) exhausted.
    #[error("F1")]
    F1,
    /// Speed channel (h2) exhausted.
    #[error("F2")]
    F2,
}

impl MachineFault {
    /// Event code as it appears on CRITICAL records.
    pub fn code(&self) -> String {
        format!("Error: {}", self)
    }
}
