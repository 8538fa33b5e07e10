//! End-to-end behavior of the telemetry loop: cycle timing, fault handling,
//! repair, and the JSON records that reach the sink.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{BufRead, BufReader};
use std::iter;
use std::sync::Arc;

use turbine_telemetry::degradation::{DecayShape, HealthSample, HealthSequence};
use turbine_telemetry::engine::{
    run, CycleController, CycleOutcome, CyclePlan, FixedClock, JsonLinesSink, MemorySink, Phase,
};
use turbine_telemetry::factory::{create_machine, FactoryConfig};
use turbine_telemetry::machine::MachineState;
use turbine_telemetry::{EventLevel, MachineFault, MachineId, Record, SimulationConfig};

fn steady(h: f64) -> impl Iterator<Item = HealthSample> + Send + 'static {
    iter::repeat(HealthSample { t: 1, h })
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::stepping(
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        Duration::milliseconds(500),
    ))
}

fn controller(machine: MachineState, sink: &MemorySink, seed: u64) -> CycleController {
    CycleController::new(
        machine,
        Arc::new(sink.clone()),
        clock(),
        StdRng::seed_from_u64(seed),
    )
}

fn machine<H1, H2>(h1: H1, h2: H2) -> MachineState
where
    H1: Iterator<Item = HealthSample> + Send + 'static,
    H2: Iterator<Item = HealthSample> + Send + 'static,
{
    MachineState::new(MachineId::from_index(0), SimulationConfig::default(), h1, h2)
}

#[test]
fn test_setpoint_drops_at_cooldown_point() {
    let sink = MemorySink::new();
    let mut controller = controller(machine(steady(0.9), steady(0.9)), &sink, 1);
    controller.schedule(CyclePlan::with_duration(&SimulationConfig::default(), 120));

    let outcome = controller.run_cycle().unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed { ticks: 120, .. }));

    let telemetry = sink.telemetry();
    assert_eq!(telemetry.len(), 120);
    for (i, record) in telemetry.iter().enumerate() {
        if i < 100 {
            assert_ne!(record.reading.speed_desired, 0.0, "tick {}", i);
        } else {
            assert_eq!(record.reading.speed_desired, 0.0, "tick {}", i);
        }
    }

    // Speed is smoothed, so it is still well above zero right after the drop.
    assert!(telemetry[100].reading.speed > 100.0);
    assert!(telemetry[119].reading.speed < telemetry[100].reading.speed);
}

#[test]
fn test_fault_on_fifth_step_stops_cycle() {
    let sink = MemorySink::new();
    let mut controller = controller(machine(steady(0.9).take(4), steady(0.9)), &sink, 2);
    controller.schedule(CyclePlan::with_duration(&SimulationConfig::default(), 120));

    let outcome = controller.run_cycle().unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Faulted {
            fault: MachineFault::F1,
            ticks: 4,
            ..
        }
    ));

    let records = sink.records();
    assert_eq!(records.len(), 5);
    assert!(records[..4].iter().all(|r| r.as_telemetry().is_some()));

    let critical = records[4].as_event().unwrap();
    assert_eq!(critical.level, EventLevel::Critical);
    assert_eq!(critical.code, "Error: F1");
    assert_eq!(critical.machine_id.as_str(), "M_0000");
}

#[test]
fn test_broken_machine_is_repaired_before_next_cycle() {
    let sink = MemorySink::new();
    let mut controller = controller(machine(steady(0.9), iter::empty()), &sink, 3);

    let first = controller.run_cycle().unwrap();
    assert!(matches!(
        first,
        CycleOutcome::Faulted {
            fault: MachineFault::F2,
            ..
        }
    ));
    assert_eq!(controller.phase(), Phase::AwaitingRepair);

    let second = controller.run_cycle().unwrap();
    let config = SimulationConfig::default();
    match second {
        CycleOutcome::Repaired {
            thermal_ttf,
            speed_ttf,
        } => {
            assert!(config.thermal_horizon.contains(thermal_ttf));
            assert!(config.speed_horizon.contains(speed_ttf));
        }
        other => panic!("expected repair, got {:?}", other),
    }

    let fixed = sink.events().pop().unwrap();
    assert_eq!(fixed.level, EventLevel::Info);
    assert_eq!(fixed.code, "fixed");

    // Fresh sequences last at least 5000 ticks, longer than any cycle.
    let third = controller.run_cycle().unwrap();
    assert!(matches!(third, CycleOutcome::Completed { .. }));
}

#[test]
fn test_repairs_draw_independent_horizons() {
    let sink = MemorySink::new();
    let mut controller = controller(machine(iter::empty(), steady(0.9)), &sink, 4);
    let config = SimulationConfig::default();

    let mut horizons = Vec::new();
    for _ in 0..50 {
        // Fault immediately, then repair.
        controller
            .machine_mut()
            .set_health(iter::empty(), steady(0.9));
        assert!(matches!(
            controller.run_cycle().unwrap(),
            CycleOutcome::Faulted { .. }
        ));
        if let CycleOutcome::Repaired {
            thermal_ttf,
            speed_ttf,
        } = controller.run_cycle().unwrap()
        {
            horizons.push((thermal_ttf, speed_ttf));
        } else {
            panic!("expected repair");
        }
    }

    assert!(horizons
        .iter()
        .all(|&(a, b)| config.thermal_horizon.contains(a) && config.speed_horizon.contains(b)));
    assert!(horizons.iter().any(|&(a, b)| a != b));
    assert!(horizons.iter().any(|&(_, b)| b > config.thermal_horizon.max));
}

#[test]
fn test_single_step_speed_from_rest() {
    let mut machine = machine(steady(1.0), steady(1.0));
    let mut rng = StdRng::seed_from_u64(5);
    machine.set_speed(1000.0);

    let reading = machine.step(&mut rng).unwrap();

    assert_eq!(machine.speed(), 500.0);
    assert!((reading.speed - 500.0).abs() <= 5.005);
}

#[test]
fn test_exhausted_sequences_fail_on_thermal_channel_first() {
    let shape = DecayShape::default();
    let mut machine = machine(HealthSequence::new(0, shape), HealthSequence::new(0, shape));
    let mut rng = StdRng::seed_from_u64(6);

    assert_eq!(machine.step(&mut rng), Err(MachineFault::F1));
    assert!(machine.is_broken());
}

#[test]
fn test_long_run_keeps_looping_through_breakdowns() {
    let sink = MemorySink::new();
    let config = SimulationConfig {
        thermal_horizon: turbine_telemetry::degradation::HorizonRange::new(150, 400),
        speed_horizon: turbine_telemetry::degradation::HorizonRange::new(150, 600),
        ..SimulationConfig::default()
    };
    let factory = FactoryConfig {
        simulation: config,
        vibration: false,
    };
    let mut rng = StdRng::seed_from_u64(7);
    let machine = create_machine(0, &factory, &mut rng).unwrap();
    let mut controller = CycleController::new(machine, Arc::new(sink.clone()), clock(), rng);

    let summary = run(&mut controller, Some(40)).unwrap();

    assert_eq!(summary.iterations, 40);
    assert!(summary.faults > 0);
    assert!(summary.repairs > 0);
    // Every fault is followed by exactly one repair unless it was the last iteration.
    assert!(summary.faults - summary.repairs <= 1);

    let events = sink.events();
    for pair in events.windows(2) {
        if pair[0].level == EventLevel::Critical {
            assert_eq!(pair[1].code, "fixed");
        }
    }
}

#[test]
fn test_json_lines_written_to_file() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let sink = JsonLinesSink::new(file.reopen()?);

    let mut controller = CycleController::new(
        machine(steady(0.9).take(2), steady(0.9)),
        Arc::new(sink),
        clock(),
        StdRng::seed_from_u64(9),
    );
    controller.schedule(CyclePlan::with_duration(&SimulationConfig::default(), 60));
    controller.run_cycle()?;

    let lines: Vec<String> = BufReader::new(file.reopen()?)
        .lines()
        .collect::<std::io::Result<_>>()?;
    assert_eq!(lines.len(), 3);

    let first: serde_json::Value = serde_json::from_str(&lines[0])?;
    for key in [
        "timestamp",
        "machineID",
        "speedDesired",
        "ambientPressure",
        "ambientTemperature",
        "speed",
        "temperature",
        "pressure",
    ] {
        assert!(first.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(first["timestamp"], "2024-06-01T08:00:00.000Z");

    let second: Record = serde_json::from_str(&lines[1])?;
    assert_eq!(
        second.as_telemetry().unwrap().timestamp,
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::milliseconds(500)
    );

    let last: Record = serde_json::from_str(&lines[2])?;
    assert_eq!(last.as_event().unwrap().code, "Error: F1");

    Ok(())
}

#[test]
fn test_same_seed_same_stream() {
    let run_once = |seed: u64| {
        let sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let machine = create_machine(0, &FactoryConfig::default(), &mut rng).unwrap();
        let mut controller = CycleController::new(machine, Arc::new(sink.clone()), clock(), rng);
        run(&mut controller, Some(2)).unwrap();
        sink.records()
    };

    assert_eq!(run_once(11), run_once(11));
    assert_ne!(run_once(11), run_once(12));
}

#[test]
fn test_repaired_channels_degrade_below_scenario_threshold() {
    use turbine_telemetry::degradation::HorizonRange;

    let config = SimulationConfig {
        thermal_horizon: HorizonRange::new(200, 200),
        speed_horizon: HorizonRange::new(1_000, 1_000),
        ..SimulationConfig::default()
    };
    let sink = MemorySink::new();
    let broken = MachineState::new(
        MachineId::from_index(0),
        config.clone(),
        iter::empty(),
        iter::empty(),
    );
    let mut controller = controller(broken, &sink, 10);

    assert!(matches!(
        controller.run_cycle().unwrap(),
        CycleOutcome::Faulted { .. }
    ));
    let thermal_ttf = match controller.run_cycle().unwrap() {
        CycleOutcome::Repaired { thermal_ttf, .. } => thermal_ttf,
        other => panic!("expected repair, got {:?}", other),
    };

    let reference = HealthSequence::new(thermal_ttf, config.channel_shape());
    assert_eq!(reference.ttf(), 200);
    let last = reference.last().unwrap();
    assert_eq!(last.t, 1);
    assert!((last.h - 0.2092).abs() < 1e-3);

    // At rest pressure settles to h1 * ambient pressure, exposing h1 directly.
    let machine = controller.machine_mut();
    machine.set_speed(0.0);
    let mut rng = StdRng::seed_from_u64(10);
    let mut lowest = f64::INFINITY;
    let mut steps = 0;
    let fault = loop {
        match machine.step(&mut rng) {
            Ok(_) => {
                steps += 1;
                lowest = lowest.min(machine.pressure() / config.ambient_pressure);
            }
            Err(fault) => break fault,
        }
    };

    assert_eq!(fault, MachineFault::F1);
    assert_eq!(steps, 200);
    assert!(lowest < config.decay.threshold);
    assert!((lowest - last.h).abs() < 1e-9);
}
