use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::controller::{CycleController, TickOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub iterations: u64,
    pub samples: u64,
    pub faults: u64,
    pub repairs: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Sampled { .. } => self.samples += 1,
            TickOutcome::Faulted { .. } => self.faults += 1,
            TickOutcome::Repaired { .. } => self.repairs += 1,
        }
        if outcome.ends_iteration() {
            self.iterations += 1;
        }
    }
}

/// Run as fast as the sink accepts records. `None` runs forever.
pub fn run(controller: &mut CycleController, max_iterations: Option<u64>) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    while max_iterations.map_or(true, |max| summary.iterations < max) {
        let outcome = controller.tick()?;
        summary.record(&outcome);
    }

    Ok(summary)
}

/// Like [`run`], but one tick per `tick_interval` of wall-clock time.
pub async fn run_paced(
    controller: &mut CycleController,
    tick_interval: Duration,
    max_iterations: Option<u64>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while max_iterations.map_or(true, |max| summary.iterations < max) {
        ticker.tick().await;
        let outcome = controller.tick()?;
        summary.record(&outcome);
    }

    Ok(summary)
}
