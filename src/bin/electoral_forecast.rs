use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use electoral_forecast::loader::DirectoryDataSource;
use electoral_forecast::model::StateClassification;
use electoral_forecast::pipeline::{run_forecast_from, ForecastRun};
use electoral_forecast::{ForecastConfig, MonteCarloEngine};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Monte Carlo forecast of the US presidential race")]
struct Cli {
    /// Directory holding states_info.csv, the state lists and polling_data.csv
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// TOML file with forecast settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulated elections
    #[arg(long)]
    simulations: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Electoral votes needed to win
    #[arg(long)]
    threshold: Option<u32>,

    /// Multiplier applied to every state's standard deviation
    #[arg(long)]
    poll_uncertainty: Option<f64>,

    /// CSV with state_name,margin_shift columns (positive favours Harris)
    #[arg(long)]
    turnout_file: Option<PathBuf>,

    /// Run all simulations on the calling thread
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Print the full run as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print how often Harris carried each competitive state
    #[arg(long, default_value_t = false)]
    state_breakdown: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => ForecastConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => ForecastConfig::default(),
    };
    if let Some(v) = cli.simulations {
        cfg.simulation_count = v;
    }
    if let Some(v) = cli.seed {
        cfg.rng_seed = Some(v);
    }
    if let Some(v) = cli.threshold {
        cfg.ev_threshold = v;
    }
    if let Some(v) = cli.poll_uncertainty {
        cfg.poll_uncertainty = v;
    }
    if cli.sequential {
        cfg.parallel = false;
    }
    cfg.state_tallies = cli.json || cli.state_breakdown;

    let mut source = DirectoryDataSource::new(&cli.data_dir);
    if let Some(path) = &cli.turnout_file {
        source = source.with_margin_shifts(path);
    }

    let engine = MonteCarloEngine::from_config(&cfg);
    let run = run_forecast_from(&source, &cfg, &engine).with_context(|| {
        format!(
            "forecast failed for data directory {}",
            cli.data_dir.display()
        )
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    print_summary(&run);
    if cli.state_breakdown {
        print_state_breakdown(&run);
    }
    Ok(())
}

fn print_summary(run: &ForecastRun) {
    let summary = &run.summary;
    println!("\nOut of {} simulations (seed {}):", summary.total, run.seed);
    println!(
        "Kamala Harris wins: {} times ({:.1}%)",
        summary.harris_wins,
        100.0 * summary.harris_probability()
    );
    println!(
        "Donald Trump wins: {} times ({:.1}%)",
        summary.trump_wins,
        100.0 * summary.trump_probability()
    );
    println!(
        "Ties or no majority: {} times ({:.1}%)",
        summary.ties,
        100.0 * summary.tie_probability()
    );

    for fallback in &run.distributions.fallbacks {
        println!(
            "note: {} used default distribution ({:?})",
            fallback.state_name, fallback.reason
        );
    }
}

fn print_state_breakdown(run: &ForecastRun) {
    println!("\nCompetitive states (Harris carried):");
    for (dist, tally) in run
        .distributions
        .distributions
        .iter()
        .zip(&run.state_tallies)
        .filter(|(d, _)| d.classification == StateClassification::Competitive)
    {
        println!(
            "  {:<16} {:>5.1}%  margin {:+.2} ± {:.2}",
            dist.state_name,
            100.0 * tally.harris_share(),
            dist.mean_margin,
            dist.std_dev
        );
    }
}
