/*
 * Boid Flocking Simulation - Headless Runner
 *
 * Runs the flocking core without a window: builds a simulation from defaults,
 * an optional JSON parameter file and command line overrides, advances it a
 * fixed number of ticks and reports what happened. A JSON snapshot of the
 * final state can be written for inspection or for an external renderer.
 */

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use flocking::{AgentKind, AgentSnapshot, Simulation, SimulationParams, StepStats};

#[derive(Parser, Debug)]
#[command(name = "flocking", about = "Run the boid flocking simulation headlessly")]
struct Args {
    /// JSON file with simulation parameters; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of boids (10..=5000)
    #[arg(long)]
    boids: Option<usize>,

    /// Number of hawks (0..=100)
    #[arg(long)]
    hawks: Option<usize>,

    /// Half edge length of the bounding cube
    #[arg(long)]
    half_extent: Option<f64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    steps: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Seed for spawning, hawk wandering and the noise field
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Disable the parallel steering pass
    #[arg(long)]
    sequential: bool,

    /// Write boid and hawk snapshots of the final tick to this JSON file
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Serialize)]
struct SnapshotFile {
    stats: StepStats,
    boids: AgentSnapshot,
    hawks: AgentSnapshot,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut params = match &args.config {
        Some(path) => SimulationParams::load(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => SimulationParams::default(),
    };
    if args.sequential {
        params.enable_parallel = false;
    }

    let mut sim = Simulation::new(params, args.seed)?;
    if let Some(count) = args.boids {
        sim.set_population_size(AgentKind::Boid, count);
    }
    if let Some(count) = args.hawks {
        sim.set_population_size(AgentKind::Hawk, count);
    }
    if let Some(half_extent) = args.half_extent {
        sim.set_half_extent(half_extent)?;
    }

    info!(
        boids = sim.len(AgentKind::Boid),
        hawks = sim.len(AgentKind::Hawk),
        half_extent = sim.state().volume.half_extent,
        steps = args.steps,
        dt = args.dt,
        "Starting headless run"
    );

    let started = Instant::now();
    let mut frightened_ticks = 0u64;
    let mut chasing_ticks = 0u64;
    for _ in 0..args.steps {
        let stats = sim.step(args.dt);
        frightened_ticks += u64::from(stats.frightened_boids > 0);
        chasing_ticks += u64::from(stats.chasing_hawks > 0);
    }
    let wall = started.elapsed();

    let stats = *sim.last_stats();
    info!(
        ticks = stats.tick,
        sim_time = sim.state().sim_time,
        wall_ms = wall.as_millis() as u64,
        candidates_per_boid = stats.candidates_per_boid(),
        occupied_cells = stats.occupied_cells,
        frightened_ticks,
        chasing_ticks,
        "Run finished"
    );

    if let Some(path) = &args.snapshot {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let snapshot = SnapshotFile {
            stats,
            boids: sim.snapshot(AgentKind::Boid),
            hawks: sim.snapshot(AgentKind::Hawk),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)?;
        info!(path = %path.display(), "Snapshot written");
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
