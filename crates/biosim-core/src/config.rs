//! Configuration types for the simulation.

use crate::{Error, Result, Species, Terrain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-species physiology constants.
///
/// Field names on the wire match the parameter symbols (`F`, `DeltaPhiMax`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesParams {
    /// Mean birth weight
    pub w_birth: f64,
    /// Standard deviation of the birth weight
    pub sigma_birth: f64,
    /// Fraction of eaten food converted to body weight
    pub beta: f64,
    /// Fraction of body weight lost every year
    pub eta: f64,
    pub a_half: f64,
    pub phi_age: f64,
    pub w_half: f64,
    pub phi_weight: f64,
    /// Migration propensity
    pub mu: f64,
    /// Procreation propensity
    pub gamma: f64,
    /// Procreation weight threshold factor
    pub zeta: f64,
    /// Parent weight lost per unit of offspring weight
    pub xi: f64,
    /// Death propensity
    pub omega: f64,
    /// Appetite: food wanted per feeding stage
    #[serde(rename = "F")]
    pub appetite: f64,
    /// Fitness difference above which a kill is certain (carnivores only)
    #[serde(rename = "DeltaPhiMax", default, skip_serializing_if = "Option::is_none")]
    pub delta_phi_max: Option<f64>,
}

impl SpeciesParams {
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.6,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            gamma: 0.2,
            zeta: 3.5,
            xi: 1.2,
            omega: 0.4,
            appetite: 10.0,
            delta_phi_max: None,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 40.0,
            phi_age: 0.3,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            gamma: 0.8,
            zeta: 3.5,
            xi: 1.1,
            omega: 0.8,
            appetite: 50.0,
            delta_phi_max: Some(10.0),
        }
    }

    /// Every parameter present in this table, by its wire name.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        let mut entries = vec![
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("eta", self.eta),
            ("a_half", self.a_half),
            ("phi_age", self.phi_age),
            ("w_half", self.w_half),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("xi", self.xi),
            ("omega", self.omega),
            ("F", self.appetite),
        ];
        if let Some(delta_phi_max) = self.delta_phi_max {
            entries.push(("DeltaPhiMax", delta_phi_max));
        }
        entries
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "w_birth" => Some(&mut self.w_birth),
            "sigma_birth" => Some(&mut self.sigma_birth),
            "beta" => Some(&mut self.beta),
            "eta" => Some(&mut self.eta),
            "a_half" => Some(&mut self.a_half),
            "phi_age" => Some(&mut self.phi_age),
            "w_half" => Some(&mut self.w_half),
            "phi_weight" => Some(&mut self.phi_weight),
            "mu" => Some(&mut self.mu),
            "gamma" => Some(&mut self.gamma),
            "zeta" => Some(&mut self.zeta),
            "xi" => Some(&mut self.xi),
            "omega" => Some(&mut self.omega),
            "F" => Some(&mut self.appetite),
            "DeltaPhiMax" => self.delta_phi_max.as_mut(),
            _ => None,
        }
    }

    fn validate(&self, species: Species) -> Result<()> {
        for (name, value) in self.entries() {
            check_value(&species.to_string(), name, value)?;
        }
        if self.eta > 1.0 {
            return Err(Error::Configuration(format!(
                "{} eta must not exceed 1, got {}",
                species, self.eta
            )));
        }
        if species == Species::Herbivore {
            if self.delta_phi_max.is_some() {
                return Err(Error::Configuration(
                    "DeltaPhiMax only applies to carnivores".to_string(),
                ));
            }
        } else {
            match self.delta_phi_max {
                Some(value) if value > 0.0 => {}
                Some(value) => {
                    return Err(Error::Configuration(format!(
                        "Carnivore DeltaPhiMax must be positive, got {}",
                        value
                    )))
                }
                None => {
                    return Err(Error::Configuration(
                        "Carnivore parameters require DeltaPhiMax".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Fodder constants for one terrain type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerrainParams {
    pub f_max: f64,
}

/// Fodder constants for the terrains that grow fodder. Desert and water never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeParams {
    pub lowland: TerrainParams,
    pub highland: TerrainParams,
}

impl Default for LandscapeParams {
    fn default() -> Self {
        Self {
            lowland: TerrainParams { f_max: 800.0 },
            highland: TerrainParams { f_max: 300.0 },
        }
    }
}

impl LandscapeParams {
    /// Fodder stock a cell of this terrain is reset to every year.
    pub fn f_max(&self, terrain: Terrain) -> f64 {
        match terrain {
            Terrain::Lowland => self.lowland.f_max,
            Terrain::Highland => self.highland.f_max,
            Terrain::Desert | Terrain::Water => 0.0,
        }
    }
}

/// All constants the engine reads. Immutable while a cycle runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTables {
    pub herbivore: SpeciesParams,
    pub carnivore: SpeciesParams,
    #[serde(default)]
    pub landscape: LandscapeParams,
}

impl Default for ParameterTables {
    fn default() -> Self {
        Self {
            herbivore: SpeciesParams::herbivore(),
            carnivore: SpeciesParams::carnivore(),
            landscape: LandscapeParams::default(),
        }
    }
}

impl ParameterTables {
    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    fn species_mut(&mut self, species: Species) -> &mut SpeciesParams {
        match species {
            Species::Herbivore => &mut self.herbivore,
            Species::Carnivore => &mut self.carnivore,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.herbivore.validate(Species::Herbivore)?;
        self.carnivore.validate(Species::Carnivore)?;
        for terrain in [Terrain::Lowland, Terrain::Highland] {
            check_value(&terrain.to_string(), "f_max", self.landscape.f_max(terrain))?;
        }
        Ok(())
    }

    /// Override species constants by name. Nothing changes unless every
    /// override is accepted.
    pub fn set_species_parameters(
        &mut self,
        species: Species,
        overrides: &BTreeMap<String, f64>,
    ) -> Result<()> {
        let mut updated = self.species(species).clone();
        for (name, &value) in overrides {
            check_value(&species.to_string(), name, value)?;
            let field = updated.field_mut(name).ok_or_else(|| {
                Error::Configuration(format!(
                    "'{}' is not a recognised {} parameter",
                    name, species
                ))
            })?;
            *field = value;
        }
        updated.validate(species)?;

        debug!(species = %species, count = overrides.len(), "Applied species parameter overrides");
        *self.species_mut(species) = updated;
        Ok(())
    }

    /// Override terrain constants by name. Only lowland and highland grow
    /// fodder, so only they accept `f_max`.
    pub fn set_landscape_parameters(
        &mut self,
        terrain: Terrain,
        overrides: &BTreeMap<String, f64>,
    ) -> Result<()> {
        let mut updated = match terrain {
            Terrain::Lowland => self.landscape.lowland.clone(),
            Terrain::Highland => self.landscape.highland.clone(),
            Terrain::Desert | Terrain::Water => {
                return Err(Error::Configuration(format!(
                    "{} has no adjustable parameters",
                    terrain
                )))
            }
        };
        for (name, &value) in overrides {
            check_value(&terrain.to_string(), name, value)?;
            if name != "f_max" {
                return Err(Error::Configuration(format!(
                    "'{}' is not a recognised {} parameter",
                    name, terrain
                )));
            }
            updated.f_max = value;
        }

        debug!(terrain = %terrain, count = overrides.len(), "Applied landscape parameter overrides");
        match terrain {
            Terrain::Lowland => self.landscape.lowland = updated,
            _ => self.landscape.highland = updated,
        }
        Ok(())
    }
}

fn check_value(owner: &str, name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::Configuration(format!(
            "{} parameter '{}' must be a finite number, got {}",
            owner, name, value
        )));
    }
    if value < 0.0 {
        return Err(Error::Configuration(format!(
            "{} parameter '{}' cannot be negative, got {}",
            owner, name, value
        )));
    }
    Ok(())
}

/// Named overrides for the parameter tables, as they appear in scenario files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverrides {
    #[serde(default)]
    pub species: BTreeMap<Species, BTreeMap<String, f64>>,
    #[serde(default)]
    pub landscape: BTreeMap<Terrain, BTreeMap<String, f64>>,
}

impl ParameterOverrides {
    pub fn is_empty(&self) -> bool {
        self.species.is_empty() && self.landscape.is_empty()
    }

    /// Apply every override to a copy of `tables`, committing only on success.
    pub fn apply(&self, tables: &mut ParameterTables) -> Result<()> {
        let mut updated = tables.clone();
        for (species, overrides) in &self.species {
            updated.set_species_parameters(*species, overrides)?;
        }
        for (terrain, overrides) in &self.landscape {
            updated.set_landscape_parameters(*terrain, overrides)?;
        }
        *tables = updated;
        Ok(())
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Run per-cell stage work on the rayon thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub params: ParameterTables,
}

fn default_parallel() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            parallel: true,
            params: ParameterTables::default(),
        }
    }
}
