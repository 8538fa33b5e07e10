use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use turbine_telemetry::engine::{run, run_paced, CycleController, JsonLinesSink, SystemClock};
use turbine_telemetry::factory::{create_machines, FactoryConfig};
use turbine_telemetry::{Config, SimulationConfig};

#[derive(Parser)]
#[command(name = "turbine-telemetry")]
#[command(about = "Synthetic telemetry stream for a degrading rotating machine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit records to stdout, one JSON object per line
    Run {
        #[arg(long, help = "Stop after this many loop iterations (default: run forever)")]
        cycles: Option<u64>,
        #[arg(long, help = "RNG seed (overrides SIM_SEED)")]
        seed: Option<u64>,
        #[arg(long, help = "Pace ticks at the configured sample rate")]
        realtime: bool,
        #[arg(long, help = "Attach vibration PCM to every telemetry record")]
        vibration: bool,
    },
    /// Print the model constants as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            cycles,
            seed,
            realtime,
            vibration,
        } => {
            let mut config = Config::from_env()?;
            config.seed = seed.or(config.seed);
            config.realtime |= realtime;
            config.vibration |= vibration;
            run_simulation(config, cycles).await?
        }
        Commands::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&SimulationConfig::default())?
            );
        }
    }

    Ok(())
}

async fn run_simulation(config: Config, cycles: Option<u64>) -> Result<()> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let factory_config = FactoryConfig {
        simulation: SimulationConfig::default(),
        vibration: config.vibration,
    };
    let sample_rate = factory_config.simulation.sample_rate_hz;

    // Only the first machine of the fleet is driven.
    let machine = create_machines(1, &factory_config, &mut rng)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Factory produced no machines"))?;

    log::info!(
        "Simulating {} (seed: {:?}, realtime: {}, vibration: {})",
        machine.id(),
        config.seed,
        config.realtime,
        config.vibration
    );

    let mut controller = CycleController::new(
        machine,
        Arc::new(JsonLinesSink::stdout()),
        Arc::new(SystemClock),
        rng,
    );

    let summary = if config.realtime && sample_rate > 0.0 {
        let interval = Duration::from_secs_f64(1.0 / sample_rate);
        run_paced(&mut controller, interval, cycles).await?
    } else {
        run(&mut controller, cycles)?
    };

    log::info!(
        "Finished {} iterations: {} samples, {} faults, {} repairs",
        summary.iterations,
        summary.samples,
        summary.faults,
        summary.repairs
    );

    Ok(())
}
