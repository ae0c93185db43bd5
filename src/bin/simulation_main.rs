// simulation_main.rs
use anyhow::{Context, Result};
use clap::Parser;
use intersection_control::communication::channels::{
    command_channel, coordination_channel, update_channel,
};
use intersection_control::config::SimulationConfig;
use intersection_control::control_system::traffic_light_controller::{
    ControllerChannels, IntersectionController,
};
use intersection_control::monitoring::traffic_monitoring_system::{
    run_cli, Collector, CsvRecorder, Director,
};
use intersection_control::simulation_engine::intersections::{IntersectionId, IntersectionLayout};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

#[derive(Parser)]
#[command(name = "simulation_main")]
#[command(about = "Two-intersection traffic control simulation (F10 & F11)")]
struct Cli {
    /// TOML file overriding timings and capacities
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append every received update to this CSV file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Seed for vehicle categories and spawn jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Start with empty roads; vehicles only appear through scenarios
    #[arg(long)]
    no_initial_traffic: bool,
}

/// Runs a controller on its own OS thread and runtime, so a crash there
/// leaves the collector and the other controller running.
fn spawn_controller_thread(controller: IntersectionController) -> Result<thread::JoinHandle<()>> {
    let id = controller.id();
    let handle = thread::Builder::new()
        .name(format!("controller-{id}"))
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("{id}: failed to start runtime: {e}");
                    return;
                }
            };
            if let Err(e) = runtime.block_on(controller.run()) {
                warn!("{e}");
            }
        })
        .with_context(|| format!("spawning controller thread for {id}"))?;
    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.no_initial_traffic {
        config.spawn_initial_traffic = false;
    }

    // Five channels: two update streams, two command streams, F10 -> F11 coordination.
    let (f10_updates, f10_update_rx) = update_channel();
    let (f11_updates, f11_update_rx) = update_channel();
    let (f10_commands, f10_command_rx) = command_channel();
    let (f11_commands, f11_command_rx) = command_channel();
    let (coordination_tx, coordination_rx) = coordination_channel();

    let f10 = IntersectionController::new(
        IntersectionLayout::f10(),
        config.clone(),
        ControllerChannels {
            updates: f10_updates,
            commands: Some(f10_command_rx),
            coordination_in: None,
            coordination_out: Some(coordination_tx),
        },
    );
    let f11 = IntersectionController::new(
        IntersectionLayout::f11(),
        config,
        ControllerChannels {
            updates: f11_updates,
            commands: Some(f11_command_rx),
            coordination_in: Some(coordination_rx),
            coordination_out: None,
        },
    );
    spawn_controller_thread(f10)?;
    spawn_controller_thread(f11)?;

    let mut collector = Collector::new();
    if let Some(path) = &cli.record {
        let recorder = CsvRecorder::open(path)
            .with_context(|| format!("opening recording {}", path.display()))?;
        collector = collector.with_recorder(recorder);
    }
    let collector = Arc::new(Mutex::new(collector));

    for (stream, mut rx) in [
        (IntersectionId::F10, f10_update_rx),
        (IntersectionId::F11, f11_update_rx),
    ] {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                collector
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply(stream, update);
            }
            warn!("{stream}: update stream ended");
        });
    }

    info!("=== Traffic Simulation Started ===");
    let director = Director {
        f10: f10_commands,
        f11: f11_commands,
    };
    let cli_collector = Arc::clone(&collector);
    tokio::task::spawn_blocking(move || run_cli(&director, &cli_collector)).await?;

    let summary = collector
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .summary();
    println!("Final state: {summary}");
    info!("=== Traffic Simulation Ended ===");
    Ok(())
}
