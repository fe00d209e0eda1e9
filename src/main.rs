//! MadhuNav - runs the mission controller against the headless arena simulator.
//!
//! Loads `madhu.toml` (or the file given with `--config`), builds the simulated
//! arena and runs the control loop until the mission ends, the match clock
//! runs out or SIGINT/SIGTERM arrives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{info, warn};

use madhu_nav::config::MadhuConfig;
use madhu_nav::mission::MissionController;
use madhu_nav::runner::ControlLoop;
use madhu_nav::sim::{Simulator, ZoneSide};
use madhu_nav::Result;

/// Hive-collection robot controller (simulated arena)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many control cycles (default: the whole match)
    #[arg(short, long)]
    steps: Option<usize>,

    /// Route legs around other hives with the grid planner
    #[arg(short, long)]
    planner: bool,

    /// Pace cycles in real time instead of running as fast as possible
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("madhu_nav=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MadhuConfig::load(path)?
        }
        None if Path::new("madhu.toml").exists() => {
            info!("Loading configuration from madhu.toml");
            MadhuConfig::load(Path::new("madhu.toml"))?
        }
        None => {
            info!("Using default configuration");
            MadhuConfig::default()
        }
    };
    if args.planner {
        config.planner.enabled = true;
    }
    config.validate()?;

    info!("MadhuNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Planner {}, cycle {:.0} ms, near-target timeout {:.1}s",
        if config.planner.enabled { "on" } else { "off" },
        config.mission.cycle_delay * 1000.0,
        config.mission.near_target_timeout
    );

    let sim = Simulator::new(&config)?;
    let mut world = sim.world();
    let mut motors = sim.motors();

    let controller = MissionController::new(config.controller_config());
    let mut control = ControlLoop::new(controller, config.mission.cycle_delay);

    // Operator signal disables the robot on the next cycle
    let stop = control.stop_handle();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))?;
    }

    if args.realtime {
        control.run(&mut world, &mut motors)?;
    } else {
        let match_cycles = (config.sim.match_duration / config.mission.cycle_delay).ceil() as usize;
        let steps = args.steps.unwrap_or(match_cycles);
        control.run_steps(&mut world, &mut motors, steps)?;
    }

    let deliveries = sim.deliveries();
    let home = deliveries.iter().filter(|d| d.zone == ZoneSide::Home).count();
    info!(
        "Finished in {} after {} cycles ({} skipped), t={:.1}s",
        control.controller().state(),
        control.cycles(),
        control.skipped(),
        sim.clock()
    );
    info!(
        "Delivered {} hives ({} home, {} opponent), {} left on the field",
        deliveries.len(),
        home,
        deliveries.len() - home,
        sim.remaining_hives().len()
    );
    if let Some(hive) = sim.carrying() {
        warn!("Still carrying hive {}", hive.id);
    }

    Ok(())
}
