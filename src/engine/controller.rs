use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::Clock;
use super::plan::CyclePlan;
use super::sink::RecordSink;
use crate::degradation::{draw_horizons, HealthSequence};
use crate::error::MachineFault;
use crate::machine::MachineState;
use crate::types::{EventRecord, TelemetryRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,           // Between cycles, machine healthy
    Running,        // Setpoint at nominal speed
    Cooldown,       // Last ticks of a cycle, setpoint zero
    AwaitingRepair, // Broken, next tick repairs
}

/// Result of one unit of controller work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Sampled {
        index: u64,
        phase: Phase,
        cycle_finished: bool,
    },
    Faulted {
        index: u64,
        fault: MachineFault,
    },
    Repaired {
        thermal_ttf: u64,
        speed_ttf: u64,
    },
}

impl TickOutcome {
    /// Whether this tick closed an iteration of the operating loop.
    pub fn ends_iteration(&self) -> bool {
        match self {
            TickOutcome::Sampled { cycle_finished, .. } => *cycle_finished,
            TickOutcome::Faulted { .. } | TickOutcome::Repaired { .. } => true,
        }
    }
}

/// Result of one iteration of the operating loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Completed {
        plan: CyclePlan,
        ticks: u64,
    },
    Faulted {
        plan: CyclePlan,
        fault: MachineFault,
        /// Telemetry records emitted before the fault.
        ticks: u64,
    },
    Repaired {
        thermal_ttf: u64,
        speed_ttf: u64,
    },
}

struct ActiveCycle {
    plan: CyclePlan,
    next_index: u64,
}

/// Drives one machine through idle, run and cooldown, repairing it after a
/// breakdown.
///
/// Each [`tick`](Self::tick) does exactly one unit of work: a machine step
/// or a repair. [`run_cycle`](Self::run_cycle) and [`cycles`](Self::cycles)
/// build on it for callers that think in whole cycles.
pub struct CycleController {
    machine: MachineState,
    sink: Arc<dyn RecordSink>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    active: Option<ActiveCycle>,
    last_plan: Option<CyclePlan>,
    next_plan: Option<CyclePlan>,
}

impl CycleController {
    pub fn new(
        machine: MachineState,
        sink: Arc<dyn RecordSink>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        Self {
            machine,
            sink,
            clock,
            rng,
            active: None,
            last_plan: None,
            next_plan: None,
        }
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut MachineState {
        &mut self.machine
    }

    /// Plan of the cycle in progress, or of the most recent one.
    pub fn last_plan(&self) -> Option<&CyclePlan> {
        self.last_plan.as_ref()
    }

    /// Use `plan` for the next cycle instead of drawing one.
    pub fn schedule(&mut self, plan: CyclePlan) {
        self.next_plan = Some(plan);
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            Some(cycle) if cycle.plan.is_cooling(cycle.next_index) => Phase::Cooldown,
            Some(_) => Phase::Running,
            None if self.machine.is_broken() => Phase::AwaitingRepair,
            None => Phase::Idle,
        }
    }

    pub fn tick(&mut self) -> Result<TickOutcome> {
        let mut cycle = match self.active.take() {
            Some(cycle) => cycle,
            None if self.machine.is_broken() => return self.repair(),
            None => self.begin_cycle(),
        };

        let index = cycle.next_index;
        if index == cycle.plan.cooldown_point {
            self.machine.set_speed(0.0);
            log::debug!("{} entering cooldown at tick {}", self.machine.id(), index);
        }
        let phase = if cycle.plan.is_cooling(index) {
            Phase::Cooldown
        } else {
            Phase::Running
        };

        match self.machine.step(&mut self.rng) {
            Ok(reading) => {
                cycle.next_index += 1;
                let cycle_finished = cycle.next_index >= cycle.plan.duration;
                if !cycle_finished {
                    self.active = Some(cycle);
                }

                let record = TelemetryRecord {
                    timestamp: self.clock.now(),
                    machine_id: self.machine.id().clone(),
                    reading,
                };
                self.sink.emit(&record.into())?;

                Ok(TickOutcome::Sampled {
                    index,
                    phase,
                    cycle_finished,
                })
            }
            Err(fault) => {
                log::warn!(
                    "{} broke down with {} at tick {} of {}",
                    self.machine.id(),
                    fault,
                    index,
                    cycle.plan.duration
                );
                let event =
                    EventRecord::fault(self.machine.id().clone(), self.clock.now(), fault);
                self.sink.emit(&event.into())?;

                Ok(TickOutcome::Faulted { index, fault })
            }
        }
    }

    /// Tick until the current loop iteration ends: a full cycle, a cycle cut
    /// short by a fault, or a repair.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        loop {
            match self.tick()? {
                TickOutcome::Repaired {
                    thermal_ttf,
                    speed_ttf,
                } => {
                    return Ok(CycleOutcome::Repaired {
                        thermal_ttf,
                        speed_ttf,
                    })
                }
                TickOutcome::Faulted { index, fault } => {
                    return Ok(CycleOutcome::Faulted {
                        plan: self.current_plan()?,
                        fault,
                        ticks: index,
                    })
                }
                TickOutcome::Sampled {
                    index,
                    cycle_finished: true,
                    ..
                } => {
                    return Ok(CycleOutcome::Completed {
                        plan: self.current_plan()?,
                        ticks: index + 1,
                    })
                }
                TickOutcome::Sampled { .. } => {}
            }
        }
    }

    /// Endless iterator over loop iterations; take as many as needed.
    pub fn cycles(&mut self) -> Cycles<'_> {
        Cycles { controller: self }
    }

    fn begin_cycle(&mut self) -> ActiveCycle {
        let plan = match self.next_plan.take() {
            Some(plan) => plan,
            None => CyclePlan::draw(self.machine.config(), &mut self.rng),
        };

        let nominal = self.machine.config().nominal_speed;
        self.machine.set_speed(nominal);
        self.last_plan = Some(plan);

        log::info!(
            "{} starting {:.2} min cycle: {} ticks, cooldown at {}, offset {:.1}s",
            self.machine.id(),
            plan.length_minutes,
            plan.duration,
            plan.cooldown_point,
            plan.start_offset_secs
        );

        ActiveCycle {
            plan,
            next_index: 0,
        }
    }

    fn repair(&mut self) -> Result<TickOutcome> {
        let (thermal_ttf, speed_ttf) = draw_horizons(self.machine.config(), &mut self.rng);
        let shape = self.machine.config().channel_shape();
        self.machine.set_health(
            HealthSequence::new(thermal_ttf, shape),
            HealthSequence::new(speed_ttf, shape),
        );

        log::info!(
            "{} repaired: thermal horizon {}, speed horizon {}",
            self.machine.id(),
            thermal_ttf,
            speed_ttf
        );
        let event = EventRecord::fixed(self.machine.id().clone(), self.clock.now());
        self.sink.emit(&event.into())?;

        Ok(TickOutcome::Repaired {
            thermal_ttf,
            speed_ttf,
        })
    }

    fn current_plan(&self) -> Result<CyclePlan> {
        self.last_plan
            .ok_or_else(|| anyhow!("No cycle has been started"))
    }
}

pub struct Cycles<'a> {
    controller: &'a mut CycleController,
}

impl Iterator for Cycles<'_> {
    type Item = Result<CycleOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.controller.run_cycle())
    }
}
