//! Scenario files: an island, its parameters and a population schedule.

use anyhow::{Context, Result};
use biosim_core::{ParameterOverrides, ParameterTables, PopulationEntry, SimulationConfig};
use biosim_world::{CycleReport, IslandSnapshot, Simulation};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Animals to place once the simulation reaches `year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPopulation {
    pub year: u64,
    pub entries: Vec<PopulationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub island_map: String,
    #[serde(default)]
    pub seed: u64,
    pub years: u64,
    #[serde(default)]
    pub parameters: ParameterOverrides,
    #[serde(default)]
    pub populations: Vec<ScheduledPopulation>,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub reports: Vec<CycleReport>,
    pub snapshot: IslandSnapshot,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the simulation config with this scenario's overrides applied.
    pub fn config(&self, parallel: bool) -> Result<SimulationConfig> {
        let mut params = ParameterTables::default();
        self.parameters
            .apply(&mut params)
            .context("Invalid parameter overrides")?;
        Ok(SimulationConfig {
            seed: self.seed,
            parallel,
            params,
        })
    }

    /// Run the scenario, placing each scheduled population at the start of
    /// its year.
    pub fn run(&self, parallel: bool) -> Result<ScenarioOutcome> {
        let mut sim = Simulation::new(&self.island_map, self.config(parallel)?)
            .context("Failed to create island")?;

        let mut schedule: Vec<&ScheduledPopulation> = self.populations.iter().collect();
        schedule.sort_by_key(|scheduled| scheduled.year);
        let mut pending = schedule.into_iter().peekable();

        let mut reports = Vec::with_capacity(self.years as usize);
        while sim.year() < self.years {
            let year = sim.year();
            while let Some(scheduled) = pending.next_if(|s| s.year <= year) {
                sim.add_population(&scheduled.entries)
                    .with_context(|| format!("Population for year {} rejected", scheduled.year))?;
            }
            reports.push(sim.step());
        }

        let skipped = pending.count();
        if skipped > 0 {
            info!(skipped, "Populations scheduled after the last year were not placed");
        }

        Ok(ScenarioOutcome {
            reports,
            snapshot: sim.snapshot(),
        })
    }
}
