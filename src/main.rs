use advection_diffusion_modeller::config::Config;
use advection_diffusion_modeller::initial::{self, DEFAULT_SIGMA, DEFAULT_SIZE};
use advection_diffusion_modeller::io::{read_field_csv, write_field_csv};
use advection_diffusion_modeller::simulation::{Simulation, SnapshotWriter};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// 2D advection-diffusion toy model
#[derive(Parser)]
#[command(name = "advection-diffusion-modeller")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "2D advection-diffusion solver", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Worker threads for the parallel step (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run(RunArgs),
    /// Generate an initial condition CSV
    MakeIc(MakeIcArgs),
    /// Check a configuration without running it
    Validate(ValidateArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Simulation config (.toml, or legacy key,value .csv)
    #[arg(long, default_value = "configs/base_config.csv")]
    config: PathBuf,

    /// Initial condition CSV
    #[arg(long, default_value = "configs/base_ic.csv")]
    ic: PathBuf,

    /// Output directory for CSV and plots (overrides the config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Disable plotting
    #[arg(long)]
    no_plot: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum IcKind {
    Impulse,
    Gaussian,
}

#[derive(Args)]
struct MakeIcArgs {
    #[arg(long, value_enum, default_value = "impulse")]
    kind: IcKind,

    #[arg(long, default_value_t = DEFAULT_SIZE)]
    nx: usize,

    #[arg(long, default_value_t = DEFAULT_SIZE)]
    ny: usize,

    /// Gaussian width on the [-1, 1] axes
    #[arg(long, default_value_t = DEFAULT_SIGMA)]
    sigma: f64,

    #[arg(long, default_value = "configs/base_ic.csv")]
    out: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long, default_value = "configs/base_config.csv")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::MakeIc(args) => make_ic(args),
        Commands::Validate(args) => validate(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::from_file(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if args.no_plot {
        config.output.plot = false;
    }
    config.log_summary();

    let u0 = read_field_csv(&args.ic)?;
    let mut sim = Simulation::from_config(&config, u0)?;
    let mut writer = SnapshotWriter::from_config(&config)?;

    let summary = sim.run(
        config.simulation.nsteps,
        config.simulation.snapshot_interval,
        &mut writer,
    )?;
    info!(
        "{} files saved to {}",
        summary.files_written,
        config.output.dir.display()
    );
    Ok(())
}

fn make_ic(args: MakeIcArgs) -> Result<()> {
    let u0 = match args.kind {
        IcKind::Impulse => initial::impulse(args.ny, args.nx),
        IcKind::Gaussian => initial::gaussian(args.ny, args.nx, args.sigma),
    };
    write_field_csv(&args.out, &u0)?;
    info!("Wrote {}x{} initial condition to {}", args.ny, args.nx, args.out.display());
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let config = Config::from_file(&args.config)?;
    config.log_summary();
    let params = config.params();
    params.validate()?;
    params.check_stability()?;
    info!("Configuration OK");
    Ok(())
}
