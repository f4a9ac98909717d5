//! swarm-sim-downloader - Main entry point
//!
//! A tracker-coordinated peer-to-peer swarm download simulator.

use anyhow::{Context, Result};
use swarm_sim_downloader::{simulation, CliArgs, Config, ScenarioSpec};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Initialize logging
    init_logging(&args);
    info!("swarm-sim-downloader starting");
    debug!("CLI arguments: {:?}", args);

    if args.generate {
        run_generator(&args).await?;
        info!("swarm-sim-downloader finished");
        return Ok(());
    }

    // Resolve and validate configuration
    let config = Config::from_args(&args).context("Failed to resolve configuration")?;
    config.validate().context("Invalid configuration")?;
    display_run_info(&config);

    // Run the simulation
    let report = simulation::run(&config).await.map_err(|e| {
        error!("Simulation failed: {}", e);
        e
    })?;

    if !config.quiet {
        report.print_summary();
    }

    info!("swarm-sim-downloader finished");
    Ok(())
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let level = args.log_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    debug!("Logging initialized with level: {:?}", level);
}

/// Generate a synthetic scenario into the input directory
async fn run_generator(args: &CliArgs) -> Result<()> {
    let spec = ScenarioSpec {
        peers: args.peers,
        files: args.gen_files,
        max_segments: args.gen_segments,
        seed: args.seed,
    };
    info!(
        "Generating scenario: {} peers, {} files, up to {} segments (seed {})",
        spec.peers, spec.files, spec.max_segments, spec.seed
    );

    let inputs = swarm_sim_downloader::build_inputs(&spec).context("Failed to build scenario")?;
    swarm_sim_downloader::write_inputs(&args.input_dir, &inputs)
        .await
        .context("Failed to write scenario inputs")?;

    if !args.is_quiet() {
        println!(
            "Generated {} peer inputs in {}",
            inputs.len(),
            args.input_dir.display()
        );
    }
    Ok(())
}

/// Display run configuration
fn display_run_info(config: &Config) {
    if config.quiet {
        return;
    }
    println!("Swarm run:");
    println!("  Input directory: {}", config.input_dir.display());
    println!("  Output directory: {}", config.output_dir.display());
    println!("  Peers: {}", config.peers);
    if let Some(report) = &config.report {
        println!("  Report: {}", report.display());
    }
    println!();
}
