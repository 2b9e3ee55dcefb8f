use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use level::{load_level, LevelContext, LogSink, DEFAULT_GRID_SIZE, DEFAULT_TEAM_COUNT};
use tools::{collect_level_paths, format_level_pretty, inspect_level, simulate, SimConfig};

#[derive(Parser)]
#[command(
    name = "ghostwire-tools",
    version,
    about = "ghostwire level inspection and replication simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a level file, or every level file in a directory.
    Level {
        /// Level file or directory.
        path: PathBuf,
        /// Optional glob filter when reading a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        /// Precision bits of the coordinate grid.
        #[arg(long, default_value_t = 2)]
        precision: u8,
    },
    /// Replicate a world over a lossy transport and verify convergence.
    Simulate {
        /// Simulation config JSON; flags override its fields.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Level file to populate the world from.
        #[arg(long)]
        level: Option<PathBuf>,
        /// Number of observing clients.
        #[arg(long)]
        clients: Option<usize>,
        /// Number of ticks to simulate.
        #[arg(long)]
        ticks: Option<u32>,
        /// Packet loss probability.
        #[arg(long)]
        loss: Option<f64>,
        /// Probability a packet is delayed past later ones.
        #[arg(long)]
        reorder: Option<f64>,
        /// Probability a packet is delivered twice.
        #[arg(long)]
        duplicate: Option<f64>,
        /// RNG seed for deterministic results.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Level {
            path,
            glob,
            format,
            precision,
        } => {
            let ctx = LevelContext::new(DEFAULT_GRID_SIZE, DEFAULT_TEAM_COUNT, precision);
            let paths = if path.is_dir() {
                collect_level_paths(&path, glob.as_deref())?
            } else {
                vec![path]
            };
            let reports = paths
                .iter()
                .map(|path| inspect_level(path, &ctx))
                .collect::<Result<Vec<_>>>()?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&reports).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => {
                    for report in &reports {
                        print!("{}", format_level_pretty(report));
                    }
                }
            }
        }
        Command::Simulate {
            config,
            level,
            clients,
            ticks,
            loss,
            reorder,
            duplicate,
            seed,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => SimConfig::default(),
            };
            config.clients = clients.unwrap_or(config.clients);
            config.ticks = ticks.unwrap_or(config.ticks);
            config.loss = loss.unwrap_or(config.loss);
            config.reorder = reorder.unwrap_or(config.reorder);
            config.duplicate = duplicate.unwrap_or(config.duplicate);
            config.seed = seed.unwrap_or(config.seed);

            let level = level
                .map(|path| -> Result<_> {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("read level {}", path.display()))?;
                    let ctx = LevelContext::new(
                        DEFAULT_GRID_SIZE,
                        DEFAULT_TEAM_COUNT,
                        config.replication.precision_bits,
                    );
                    Ok(load_level(&text, &ctx, &mut LogSink))
                })
                .transpose()?;

            let report = simulate(config, level.as_ref())?;
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            println!("{json}");
            if !report.converged {
                anyhow::bail!(
                    "{} divergences after {} drain rounds",
                    report.divergences.len(),
                    report.drain_rounds
                );
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config: SimConfig = serde_json::from_str(&contents).context("parse config json")?;
    config.validate().context("invalid simulation config")?;
    Ok(config)
}
