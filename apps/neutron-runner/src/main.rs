// [apps/neutron-runner/src/main.rs]
//! Thin CLI shell: parses arguments, loads a run's inputs, drives one timestep, prints the
//! aggregated counters and the PASSED/FAILED validation line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use neutron_runner_lib::{run_once, MeshShape, RunInputs};

/// Runs one transport timestep from a parameter file and a pair of cross-section files.
#[derive(Parser, Debug)]
#[command(author = "Raz Podesta <metaShark Tech>", version, about = "2D Monte Carlo neutron transport, single timestep")]
struct Cli {
    /// Run-configuration TOML file (nparticles, initial_energy, source, dt, threads, validation).
    #[arg(long)]
    params: PathBuf,

    /// Scatter cross-section file (`<energy> <sigma>` per line).
    #[arg(long = "scatter-xs")]
    scatter_xs: PathBuf,

    /// Absorb cross-section file (`<energy> <sigma>` per line).
    #[arg(long = "absorb-xs")]
    absorb_xs: PathBuf,

    /// Worker thread count; defaults to the parameter file's `threads`, or the number of logical
    /// CPUs if that field is also left at its default.
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = 10)]
    nx: usize,
    #[arg(long, default_value_t = 10)]
    ny: usize,
    #[arg(long, default_value_t = 1.0)]
    width: f64,
    #[arg(long, default_value_t = 1.0)]
    height: f64,
    #[arg(long, default_value_t = 1.0)]
    density: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let inputs = RunInputs::load(
        &cli.params,
        &cli.scatter_xs,
        &cli.absorb_xs,
        MeshShape {
            nx: cli.nx,
            ny: cli.ny,
            width: cli.width,
            height: cli.height,
            density: cli.density,
        },
        cli.threads,
    )
    .with_context(|| format!("failed to load run configuration from {}", cli.params.display()))?;

    let report = run_once(&inputs).context("timestep failed")?;

    info!(
        collisions = report.outcome.collisions,
        facet_crossings = report.outcome.facet_crossings,
        census_events = report.outcome.census_events,
        live_particles = report.outcome.live_particles,
        tally_total = report.tally_total,
        "run summary"
    );

    println!("collisions:       {}", report.outcome.collisions);
    println!("facet_crossings:  {}", report.outcome.facet_crossings);
    println!("census_events:    {}", report.outcome.census_events);
    println!("live_particles:   {}", report.outcome.live_particles);
    println!("tally_total:      {:.6e}", report.tally_total);
    if report.scatter_out_of_range > 0 || report.absorb_out_of_range > 0 {
        println!(
            "out_of_range_hits: scatter={} absorb={}",
            report.scatter_out_of_range, report.absorb_out_of_range
        );
    }

    match report.validation {
        Some((true, total)) => {
            println!("validation: PASSED (tally_total = {:.6e})", total);
        }
        Some((false, total)) => {
            println!("validation: FAILED (tally_total = {:.6e})", total);
            std::process::exit(1);
        }
        None => {}
    }

    Ok(())
}
