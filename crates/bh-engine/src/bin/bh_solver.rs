use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bh_engine::{BatchDriver, OutputFormat};
use bh_types::{load_descriptors, SearchConfig, DESCRIPTOR_FILE_NAME};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bh-solver",
    version,
    about = "Search each native objective for an exact zero with bounded basin-hopping"
)]
struct Cli {
    /// Directory holding gofuncs.api and the objective library
    lib_dir: PathBuf,

    /// JSON file with search settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock budget per function, in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Number of basin-hopping iterations
    #[arg(long)]
    max_iter: Option<usize>,

    /// Metropolis acceptance temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Initial perturbation step size
    #[arg(long)]
    step_size: Option<f64>,

    /// Iterations between step-size adjustments
    #[arg(long)]
    interval: Option<usize>,

    /// Seed for reproducible perturbations
    #[arg(long)]
    seed: Option<u64>,

    /// Pass the local iteration cap and tolerance through to the local minimizer
    #[arg(long)]
    honor_local_limits: bool,

    /// End a search as soon as it finds a zero
    #[arg(long)]
    stop_on_zero: bool,

    /// Result line format
    #[arg(long, value_enum, default_value_t = FormatChoice::Csv)]
    format: FormatChoice,

    /// Print the functions listed in the descriptor file and exit
    #[arg(long)]
    list_functions: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Csv,
    Json,
}

impl From<FormatChoice> for OutputFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Csv => OutputFormat::Csv,
            FormatChoice::Json => OutputFormat::Json,
        }
    }
}

fn search_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SearchConfig::default(),
    };

    if let Some(timeout) = cli.timeout {
        config = config.with_timeout_secs(timeout);
    }
    if let Some(max_iter) = cli.max_iter {
        config = config.with_max_iter(max_iter);
    }
    if let Some(temperature) = cli.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(step_size) = cli.step_size {
        config = config.with_step_size(step_size);
    }
    if let Some(interval) = cli.interval {
        config = config.with_interval(interval);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if cli.honor_local_limits {
        config = config.with_local_limits(true);
    }
    if cli.stop_on_zero {
        config = config.with_stop_on_zero(true);
    }

    config.validate().context("invalid search settings")?;
    Ok(config)
}

fn list_functions(lib_dir: &Path) -> Result<()> {
    let path = lib_dir.join(DESCRIPTOR_FILE_NAME);
    let descriptors = load_descriptors(&path)
        .with_context(|| format!("failed to read descriptors from {}", path.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for descriptor in descriptors {
        writeln!(out, "{descriptor}")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_functions {
        return list_functions(&cli.lib_dir);
    }

    let config = search_config(&cli)?;
    info!("Search settings {config}");

    let driver = BatchDriver::from_lib_dir(&cli.lib_dir, config)
        .with_context(|| format!("failed to prepare objectives in {}", cli.lib_dir.display()))?
        .with_format(cli.format.into());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = driver.run_all(&mut out).context("batch run failed")?;
    info!("{summary}");

    Ok(())
}
