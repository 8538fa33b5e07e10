pub mod record;

pub use record::{EventRecord, MachineReading, Record, TelemetryRecord};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine identity, rendered as `M_` plus a zero-padded four digit index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("M_{:04}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Info,
    Critical,
}

impl EventLevel {
    pub fn as_str(&self) -> &str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Critical => "CRITICAL",
        }
    }
}
