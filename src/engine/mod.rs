pub mod clock;
pub mod controller;
pub mod plan;
pub mod runner;
pub mod sink;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{CycleController, CycleOutcome, Cycles, Phase, TickOutcome};
pub use plan::CyclePlan;
pub use runner::{run, run_paced, RunSummary};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
