use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use crate::types::{EventRecord, Record, TelemetryRecord};

/// Destination for emitted records.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &Record) -> Result<()>;
}

/// Writes each record as one line of JSON, flushing after every line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&self, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to encode record")?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Record writer lock poisoned"))?;
        writeln!(writer, "{}", line).context("Failed to write record")?;
        writer.flush().context("Failed to flush record writer")?;
        Ok(())
    }
}

/// Keeps everything in memory. Clones share the same buffer, so a test can
/// hand one clone to a controller and read from another.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Telemetry(t) => Some(t),
                Record::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Event(e) => Some(e),
                Record::Telemetry(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &Record) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("Memory sink lock poisoned"))?;
        records.push(record.clone());
        Ok(())
    }
}
