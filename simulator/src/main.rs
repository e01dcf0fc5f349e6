use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{select, tick};
use log::info;
use shared_resources::config::{Config, ConfigError};
use thiserror::Error;

pub mod debug;
pub mod engine;

use debug::StatusView;
use engine::Simulation;

#[derive(Debug, Parser)]
#[command(version, about = "Runs the elevator dispatcher against a simulated building")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Simulated seconds to run, overriding the config file
    #[arg(short, long)]
    duration: Option<f64>,

    /// Seed for passenger spawning, overriding the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Redraw a status table every tick
    #[arg(long)]
    status: bool,

    /// Run as fast as possible instead of in real time
    #[arg(long, conflicts_with = "status")]
    fast: bool,
}

#[derive(Debug, Error)]
enum SimulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("terminal output failed: {0}")]
    Terminal(#[from] std::io::Error),
}

fn main() -> Result<(), SimulatorError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // READ CONFIGURATION
    let mut config = Config::load(&args.config)?;
    if let Some(duration) = args.duration {
        config.simulation.duration_s = duration;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    config.validate()?;
    info!(
        "simulating {} cars over {} floors for {} s (seed {})",
        config.elevator.num_cars, config.elevator.num_floors, config.simulation.duration_s, config.simulation.seed
    );

    let tick_period = Duration::from_millis(config.simulation.tick_ms);
    let duration = config.simulation.duration_s;
    let mut simulation = Simulation::new(config);

    if args.fast {
        simulation.run_for(duration);
    } else {
        let ticker = tick(tick_period);
        let mut status = args.status.then(StatusView::new);
        while !simulation.finished() {
            select! {
                recv(ticker) -> _ => {
                    simulation.step();
                    if let Some(status) = status.as_mut() {
                        status.print_status(&simulation)?;
                    }
                }
            }
        }
    }

    let stats = simulation.stats();
    info!(
        "spawned {} passengers, delivered {}, average wait {:.1} s, longest wait {:.1} s, average ride {:.1} s",
        stats.spawned,
        stats.delivered,
        stats.average_wait(),
        stats.max_wait,
        stats.average_ride()
    );
    Ok(())
}
