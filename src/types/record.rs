use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventLevel, MachineId};
use crate::error::MachineFault;

/// One step's worth of readings, noise applied and rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineReading {
    pub speed_desired: f64,
    pub ambient_pressure: f64,
    pub ambient_temperature: f64,
    pub speed: f64,
    pub temperature: f64,
    pub pressure: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<Vec<i16>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "machineID")]
    pub machine_id: MachineId,
    #[serde(flatten)]
    pub reading: MachineReading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "machineID")]
    pub machine_id: MachineId,
    pub level: EventLevel,
    pub code: String,
}

impl EventRecord {
    pub fn fixed(machine_id: MachineId, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            machine_id,
            level: EventLevel::Info,
            code: "fixed".to_string(),
        }
    }

    pub fn fault(machine_id: MachineId, timestamp: DateTime<Utc>, fault: MachineFault) -> Self {
        Self {
            timestamp,
            machine_id,
            level: EventLevel::Critical,
            code: fault.code(),
        }
    }
}

/// Anything the simulation writes to its sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Event(EventRecord),
    Telemetry(TelemetryRecord),
}

impl Record {
    pub fn machine_id(&self) -> &MachineId {
        match self {
            Record::Event(e) => &e.machine_id,
            Record::Telemetry(t) => &t.machine_id,
        }
    }

    pub fn as_telemetry(&self) -> Option<&TelemetryRecord> {
        match self {
            Record::Telemetry(t) => Some(t),
            Record::Event(_) => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventRecord> {
        match self {
            Record::Event(e) => Some(e),
            Record::Telemetry(_) => None,
        }
    }
}

impl From<TelemetryRecord> for Record {
    fn from(record: TelemetryRecord) -> Self {
        Record::Telemetry(record)
    }
}

impl From<EventRecord> for Record {
    fn from(record: EventRecord) -> Self {
        Record::Event(record)
    }
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
