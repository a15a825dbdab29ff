//! Writes the change-log fixture files.
//!
//! ```text
//! crdt-fixture-gen --out-dir fixtures --scenario two --time 1741534262
//! ```

mod scenarios;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crdt_changes::{FixedClock, SystemClock, TimeSource};
use log::info;

use crate::scenarios::Scenario;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory the fixture files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Which scenario to generate
    #[arg(short, long, value_enum, default_value_t = Which::All)]
    scenario: Which,

    /// Unix time in seconds for changes without an explicit time
    #[arg(long)]
    time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Which {
    All,
    One,
    Two,
}

impl Which {
    fn scenarios(self) -> &'static [Scenario] {
        match self {
            Which::All => &Scenario::ALL,
            Which::One => &[Scenario::One],
            Which::Two => &[Scenario::Two],
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let clock: Arc<dyn TimeSource> = match cli.time {
        Some(time) => Arc::new(FixedClock(time)),
        None => Arc::new(SystemClock),
    };

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    for &scenario in cli.scenario.scenarios() {
        let path = scenarios::generate(scenario, &cli.out_dir, clock.clone())?;
        info!("{scenario:?} -> {}", path.display());
    }
    Ok(())
}
