//! Tempora CLI
//!
//! Command-line interface for working with a saved clock registry:
//! - Print the synchronization report
//! - Add, update and remove clocks
//! - Move the reference time or simulate drift
//! - Export state and generate a config file

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempora::clock::{current_time, ClockRegistry, NewClock};
use tempora::config::generate_default_config;
use tempora::display::render_report;
use tempora::store;

#[derive(Parser)]
#[command(name = "tempora-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Town clock synchronization against the Grand Clock Tower")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry state file
    #[arg(short, long, default_value = "tempora-state.json", global = true)]
    pub state: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the synchronization report
    Report {
        /// Minutes a clock may be off and still count as synchronized
        #[arg(short, long, default_value = "0")]
        tolerance: u32,
    },

    /// Register a clock
    Add {
        /// Clock time as HH:MM
        time: String,
        /// Display name
        name: String,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
        /// Explicit id (default: next free id)
        #[arg(long)]
        id: Option<i64>,
    },

    /// Set a clock's time
    Update {
        id: u32,
        /// New time as HH:MM
        time: String,
    },

    /// Remove a clock
    Remove { id: u32 },

    /// Set the reference time ("now" for the current time)
    Reference {
        time: String,
        /// UTC offset in minutes used for "now"
        #[arg(long, default_value = "330", allow_hyphen_values = true)]
        utc_offset: i32,
    },

    /// Shift clocks by minutes, given as id=delta pairs
    Drift {
        #[arg(required = true, allow_hyphen_values = true)]
        pairs: Vec<String>,
    },

    /// Print the registry state as JSON
    Export,

    /// Write the default town to the state file
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempora=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report { tolerance } => {
            let mut registry = open_registry(&cli.state)?;
            registry.set_tolerance(tolerance);
            let report = registry.analyze(false);
            print!("{}", render_report(&report, &registry.recommendations_per_clock()));
        }

        Commands::Add {
            time,
            name,
            location,
            color,
            id,
        } => {
            let mut registry = open_registry(&cli.state)?;
            let mut request = NewClock::new(time, name);
            if let Some(location) = location {
                request = request.location(location);
            }
            if let Some(color) = color {
                request = request.color(color);
            }
            if let Some(id) = id {
                request = request.id(id);
            }

            let clock = registry.add_clock(request)?;
            println!("✓ Added {} (id {}) at {}", clock.name(), clock.id(), clock.time());
            save_registry(&cli.state, &registry)?;
        }

        Commands::Update { id, time } => {
            let mut registry = open_registry(&cli.state)?;
            if !registry.update_clock_time(id, &time)? {
                return Err(anyhow!("clock {} not found", id));
            }
            println!("✓ Clock {} set to {}", id, time);
            save_registry(&cli.state, &registry)?;
        }

        Commands::Remove { id } => {
            let mut registry = open_registry(&cli.state)?;
            let outcome = registry.remove_clock(id);
            if !outcome.success {
                return Err(anyhow!("clock {} not found", id));
            }
            println!("✓ Removed clock {}", id);
            save_registry(&cli.state, &registry)?;
        }

        Commands::Reference { time, utc_offset } => {
            let mut registry = open_registry(&cli.state)?;
            let time = if time.eq_ignore_ascii_case("now") {
                current_time(utc_offset).to_string()
            } else {
                time
            };
            registry.set_reference_time(&time)?;
            println!("✓ Grand Clock Tower set to {}", registry.reference_time());
            save_registry(&cli.state, &registry)?;
        }

        Commands::Drift { pairs } => {
            let drift = parse_drift(&pairs)?;
            let mut registry = open_registry(&cli.state)?;
            let shifted = registry.simulate_drift(&drift);
            println!("✓ Shifted {} clock(s)", shifted.len());
            for id in drift.keys().filter(|id| !shifted.contains(id)) {
                eprintln!("  skipped unknown clock {}", id);
            }
            save_registry(&cli.state, &registry)?;
        }

        Commands::Export => {
            let registry = open_registry(&cli.state)?;
            println!("{}", serde_json::to_string_pretty(&registry.export_state())?);
        }

        Commands::Init { force } => {
            if cli.state.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    cli.state.display()
                ));
            }
            let registry = ClockRegistry::with_default_clocks();
            save_registry(&cli.state, &registry)?;
            println!("✓ Wrote {} clocks to {}", registry.len(), cli.state.display());
        }

        Commands::Config { output } => {
            let config = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, config)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("✓ Config written to {:?}", path);
                }
                None => println!("{}", config),
            }
        }
    }

    Ok(())
}

/// Saved registry, or the default town when no state file exists
fn open_registry(path: &Path) -> Result<ClockRegistry> {
    let mut registry = ClockRegistry::with_default_clocks();
    store::load_into(path, &mut registry)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(registry)
}

fn save_registry(path: &Path, registry: &ClockRegistry) -> Result<()> {
    store::save_registry(path, registry)
        .with_context(|| format!("failed to save {}", path.display()))
}

/// Parse `id=delta` pairs such as `1=5` or `4=-3`
fn parse_drift(pairs: &[String]) -> Result<BTreeMap<u32, i64>> {
    let mut drift = BTreeMap::new();
    for pair in pairs {
        let (id, delta) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected id=delta, got {:?}", pair))?;
        let id: u32 = id
            .trim()
            .parse()
            .with_context(|| format!("invalid clock id in {:?}", pair))?;
        let delta: i64 = delta
            .trim()
            .parse()
            .with_context(|| format!("invalid minute delta in {:?}", pair))?;
        let total = drift.entry(id).or_insert(0i64);
        *total = total
            .checked_add(delta)
            .ok_or_else(|| anyhow!("minute delta for clock {} is out of range", id))?;
    }
    Ok(drift)
}
