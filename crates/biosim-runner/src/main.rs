//! Command line runner for island scenarios.

mod scenario;
mod telemetry;

use anyhow::{Context, Result};
use biosim_core::ParameterTables;
use clap::{Parser, Subcommand};
use scenario::Scenario;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "biosim-runner", version, about = "Island ecosystem simulation runner")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario file
    Run {
        #[arg(long)]
        scenario: PathBuf,

        /// Override the number of years to simulate
        #[arg(long)]
        years: Option<u64>,

        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Process cells one after another instead of on the thread pool
        #[arg(long)]
        sequential: bool,

        /// Print the final island snapshot as JSON
        #[arg(long)]
        print_snapshot: bool,
    },
    /// Print the default parameter tables as JSON
    Defaults,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json)?;

    match cli.command {
        Command::Run {
            scenario,
            years,
            seed,
            sequential,
            print_snapshot,
        } => {
            let mut loaded = Scenario::load(&scenario)?;
            if let Some(years) = years {
                loaded.years = years;
            }
            if let Some(seed) = seed {
                loaded.seed = seed;
            }

            info!(
                scenario = %scenario.display(),
                years = loaded.years,
                seed = loaded.seed,
                parallel = !sequential,
                "Starting scenario"
            );
            let outcome = loaded.run(!sequential)?;

            let births: usize = outcome.reports.iter().map(|r| r.births.total()).sum();
            let deaths: usize = outcome.reports.iter().map(|r| r.deaths.total()).sum();
            let final_counts = outcome
                .reports
                .last()
                .map(|report| report.population)
                .unwrap_or_default();
            info!(
                event = "scenario_complete",
                years = outcome.reports.len(),
                herbivores = final_counts.herbivores,
                carnivores = final_counts.carnivores,
                births,
                deaths,
                "Scenario complete"
            );

            if print_snapshot {
                println!("{}", outcome.snapshot.to_json()?);
            }
        }
        Command::Defaults => {
            let json = serde_json::to_string_pretty(&ParameterTables::default())
                .context("Failed to serialize default parameters")?;
            println!("{}", json);
        }
    }

    Ok(())
}
