//! Annual cycle controller for one island.

use crate::island::{Island, IslandSnapshot};
use crate::rng::TrialSource;
use biosim_core::{
    ParameterTables, PopulationEntry, Position, Result, SimulationConfig, Species, SpeciesCounts,
    SpeciesVitals, Terrain, Vitals,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// What happened during one annual cycle.
///
/// `deaths` counts every animal that left the population, so herbivores
/// eaten during feeding are included alongside the death stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub year: u64,
    pub births: SpeciesCounts,
    pub deaths: SpeciesCounts,
    pub kills: usize,
    pub migrations: SpeciesCounts,
    pub population: SpeciesCounts,
}

/// Per-cell summary for habitable cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    pub position: Position,
    pub terrain: Terrain,
    pub fodder: f64,
    pub herbivores: Vitals,
    pub carnivores: Vitals,
}

pub struct Simulation {
    island: Island,
    config: SimulationConfig,
    trials: TrialSource,
    year: u64,
}

impl Simulation {
    pub fn new(map: &str, config: SimulationConfig) -> Result<Self> {
        config.params.validate()?;
        let island = Island::new(map)?;
        info!(
            rows = island.grid().rows,
            cols = island.grid().cols,
            seed = config.seed,
            parallel = config.parallel,
            "Created island"
        );
        Ok(Self {
            island,
            trials: TrialSource::new(config.seed),
            config,
            year: 0,
        })
    }

    /// Create an island and place its initial population in one go.
    pub fn with_population(
        map: &str,
        config: SimulationConfig,
        entries: &[PopulationEntry],
    ) -> Result<Self> {
        let mut sim = Self::new(map, config)?;
        sim.add_population(entries)?;
        Ok(sim)
    }

    /// Place more animals. Rejected batches leave the island untouched.
    pub fn add_population(&mut self, entries: &[PopulationEntry]) -> Result<usize> {
        let placed = self.island.place(entries)?;
        info!(year = self.year, animals = placed, "Added population");
        Ok(placed)
    }

    pub fn params(&self) -> &ParameterTables {
        &self.config.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn island(&self) -> &Island {
        &self.island
    }

    /// Run one annual cycle: feeding, procreation, migration, aging, weight
    /// loss and death, each applied to every cell before the next begins.
    #[instrument(skip(self), fields(year = self.year))]
    pub fn step(&mut self) -> CycleReport {
        let year = self.year;
        let parallel = self.config.parallel;
        let tables = &self.config.params;
        let trials = &self.trials;

        self.island.regrow_fodder(&tables.landscape);
        let feeding = self.island.feeding_stage(tables, trials, year, parallel);
        debug!(
            fodder_eaten = feeding.fodder_eaten,
            kills = feeding.kills,
            "Feeding done"
        );

        let births = self.island.procreation_stage(tables, trials, year, parallel);
        debug!(
            herbivores = births.herbivores,
            carnivores = births.carnivores,
            "Procreation done"
        );

        let migrations = self.island.migration_stage(tables, trials, year, parallel);
        debug!(moved = migrations.total(), "Migration done");

        self.island.aging_stage(parallel);
        self.island.weight_loss_stage(tables, parallel);

        let mut deaths = self.island.death_stage(tables, trials, year, parallel);
        debug!(
            herbivores = deaths.herbivores,
            carnivores = deaths.carnivores,
            "Death done"
        );
        deaths.add(Species::Herbivore, feeding.kills);

        self.year += 1;
        let population = self.island.counts();
        info!(
            event = "cycle_complete",
            year = self.year,
            herbivores = population.herbivores,
            carnivores = population.carnivores,
            births = births.total(),
            deaths = deaths.total(),
            kills = feeding.kills,
            "Cycle complete"
        );

        CycleReport {
            year: self.year,
            births,
            deaths,
            kills: feeding.kills,
            migrations,
            population,
        }
    }

    /// Run `years` consecutive cycles.
    #[instrument(skip(self), fields(start_year = self.year))]
    pub fn simulate(&mut self, years: u64) -> Vec<CycleReport> {
        (0..years).map(|_| self.step()).collect()
    }

    /// Number of completed cycles.
    pub fn year(&self) -> u64 {
        self.year
    }

    pub fn num_animals(&self) -> usize {
        self.island.counts().total()
    }

    pub fn num_animals_per_species(&self) -> SpeciesCounts {
        self.island.counts()
    }

    pub fn population_grid(&self, species: Species) -> Vec<Vec<usize>> {
        self.island.population_grid(species)
    }

    pub fn cell_stats(&self) -> Vec<CellStats> {
        let tables = &self.config.params;
        self.island
            .habitable_cells()
            .map(|cell| CellStats {
                position: cell.position(),
                terrain: cell.terrain(),
                fodder: cell.fodder(),
                herbivores: cell.vitals(Species::Herbivore, &tables.herbivore),
                carnivores: cell.vitals(Species::Carnivore, &tables.carnivore),
            })
            .collect()
    }

    /// Age, weight and fitness of every animal of `species`, in cell order.
    pub fn vitals(&self, species: Species) -> SpeciesVitals {
        let params = self.config.params.species(species);
        let mut vitals = SpeciesVitals::default();
        for cell in self.island.habitable_cells() {
            for animal in cell.animals(species) {
                vitals.push(animal.age(), animal.weight(), animal.fitness(params));
            }
        }
        vitals
    }

    pub fn snapshot(&self) -> IslandSnapshot {
        self.island.snapshot(&self.config.params, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::AnimalId;
    use biosim_core::{AnimalSpec, Error, ParameterOverrides};
    use proptest::prelude::*;
    use std::collections::HashMap;

    const MAP: &str = "
        WWWWWWW
        WLLLHHW
        WLLHHDW
        WDDLLLW
        WWWWWWW
    ";

    fn config(seed: u64, parallel: bool) -> SimulationConfig {
        SimulationConfig {
            seed,
            parallel,
            params: ParameterTables::default(),
        }
    }

    fn herbivores(location: (i32, i32), count: usize) -> PopulationEntry {
        PopulationEntry::new(
            location.into(),
            (0..count).map(|_| AnimalSpec::herbivore(5, 20.0)).collect(),
        )
    }

    fn carnivores(location: (i32, i32), count: usize) -> PopulationEntry {
        PopulationEntry::new(
            location.into(),
            (0..count).map(|_| AnimalSpec::carnivore(5, 20.0)).collect(),
        )
    }

    fn mixed(seed: u64, parallel: bool) -> Simulation {
        Simulation::with_population(
            MAP,
            config(seed, parallel),
            &[herbivores((1, 1), 50), herbivores((3, 4), 30), carnivores((2, 2), 20)],
        )
        .unwrap()
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(MAP, SimulationConfig::default()).unwrap();
        assert_eq!(sim.year(), 0);
        assert_eq!(sim.num_animals(), 0);
        assert_eq!(sim.cell_stats().len(), 15);
    }

    #[test]
    fn test_bad_map_rejected() {
        let result = Simulation::new("LLL\nWWW", SimulationConfig::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut config = SimulationConfig::default();
        config.params.herbivore.eta = 2.0;
        assert!(Simulation::new(MAP, config).is_err());

        let mut config = SimulationConfig::default();
        config.params.herbivore.phi_age = f64::INFINITY;
        assert!(matches!(
            Simulation::new(MAP, config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_conservation_per_cycle() {
        let mut sim = mixed(1, true);
        let mut before = sim.num_animals_per_species();
        for report in sim.simulate(30) {
            for species in Species::all() {
                assert_eq!(
                    before.get(species) + report.births.get(species),
                    report.population.get(species) + report.deaths.get(species),
                    "year {} {}",
                    report.year,
                    species
                );
            }
            assert!(report.kills <= report.deaths.herbivores);
            before = report.population;
        }
        assert_eq!(sim.year(), 30);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut parallel = mixed(42, true);
        let mut sequential = mixed(42, false);

        let a = parallel.simulate(25);
        let b = sequential.simulate(25);

        assert_eq!(a, b);
        assert_eq!(
            parallel.snapshot().to_bytes().unwrap(),
            sequential.snapshot().to_bytes().unwrap()
        );
    }

    #[test]
    fn test_same_seed_same_history() {
        let mut first = mixed(7, true);
        let mut second = mixed(7, true);
        assert_eq!(first.simulate(10), second.simulate(10));
        assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn test_herbivores_persist_alone() {
        let mut sim =
            Simulation::with_population(MAP, config(3, true), &[herbivores((1, 2), 50)]).unwrap();
        sim.simulate(50);
        assert!(sim.num_animals_per_species().herbivores > 0);
        assert_eq!(sim.num_animals_per_species().carnivores, 0);
    }

    #[test]
    fn test_no_animals_in_water_or_off_grid() {
        let mut sim = mixed(5, true);
        sim.simulate(20);
        let snapshot = sim.snapshot();
        for cell in &snapshot.cells {
            if cell.terrain == Terrain::Water {
                assert!(cell.herbivores.is_empty() && cell.carnivores.is_empty());
            }
            for animal in cell.herbivores.iter().chain(cell.carnivores.iter()) {
                assert!(animal.weight > 0.0);
                assert!((0.0..=1.0).contains(&animal.fitness));
            }
        }
        assert_eq!(
            snapshot
                .cells
                .iter()
                .map(|c| c.herbivores.len() + c.carnivores.len())
                .sum::<usize>(),
            sim.num_animals()
        );
    }

    #[test]
    fn test_water_placement_leaves_state_untouched() {
        let mut sim = mixed(9, false);
        sim.simulate(3);
        let bytes = sim.snapshot().to_bytes().unwrap();

        let result = sim.add_population(&[herbivores((1, 1), 5), herbivores((0, 0), 5)]);

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(sim.snapshot().to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_placement_between_years() {
        let mut sim = mixed(11, true);
        sim.simulate(5);
        let before = sim.num_animals_per_species();
        sim.add_population(&[carnivores((3, 3), 10)]).unwrap();
        let after = sim.num_animals_per_species();
        assert_eq!(after.herbivores, before.herbivores);
        assert_eq!(after.carnivores, before.carnivores + 10);
    }

    #[test]
    fn test_overrides_applied_before_construction() {
        let mut config = SimulationConfig::default();
        let overrides: ParameterOverrides =
            serde_json::from_str(r#"{"landscape": {"Lowland": {"f_max": 200.0}}}"#).unwrap();
        overrides.apply(&mut config.params).unwrap();

        let mut sim = Simulation::new(MAP, config).unwrap();
        assert_eq!(sim.params().landscape.lowland.f_max, 200.0);

        sim.step();
        let lowland = sim
            .cell_stats()
            .into_iter()
            .find(|cell| cell.terrain == Terrain::Lowland)
            .unwrap();
        assert_eq!(lowland.fodder, 200.0);
        assert_eq!(sim.params().herbivore, ParameterTables::default().herbivore);
    }

    #[test]
    fn test_survivors_age_once_and_move_at_most_one_cell() {
        let mut tables = ParameterTables::default();
        tables.herbivore.mu = 1.0;
        tables.carnivore.mu = 1.0;
        let config = SimulationConfig {
            seed: 17,
            parallel: true,
            params: tables,
        };
        let mut sim = Simulation::with_population(
            MAP,
            config,
            &[herbivores((1, 1), 50), herbivores((3, 4), 30), carnivores((2, 2), 20)],
        )
        .unwrap();

        let residents = |sim: &Simulation| -> HashMap<AnimalId, (Position, u32)> {
            sim.snapshot()
                .cells
                .iter()
                .flat_map(|cell| {
                    cell.herbivores
                        .iter()
                        .chain(cell.carnivores.iter())
                        .map(move |animal| (animal.id, (cell.position, animal.age)))
                })
                .collect()
        };

        let mut moved = 0;
        for _ in 0..10 {
            let before = residents(&sim);
            let report = sim.step();
            let after = residents(&sim);
            assert_eq!(after.len(), report.population.total());

            for (id, (position, age)) in &after {
                let Some((previous_position, previous_age)) = before.get(id) else {
                    continue;
                };
                assert_eq!(*age, previous_age + 1, "{} did not age by one year", id);
                let distance = previous_position.manhattan_distance(position);
                assert!(distance <= 1, "{} moved {} cells in one year", id, distance);
                if distance == 1 {
                    moved += 1;
                }
            }
        }
        assert!(moved > 0);
    }

    #[test]
    fn test_queries_agree() {
        let mut sim = mixed(13, true);
        sim.simulate(5);
        let counts = sim.num_animals_per_species();

        let grid_total: usize = sim
            .population_grid(Species::Herbivore)
            .iter()
            .flatten()
            .sum();
        assert_eq!(grid_total, counts.herbivores);
        assert_eq!(sim.vitals(Species::Carnivore).len(), counts.carnivores);

        let stats_total: usize = sim.cell_stats().iter().map(|c| c.herbivores.count).sum();
        assert_eq!(stats_total, counts.herbivores);
    }

    #[test]
    fn test_first_year_of_lone_herbivore() {
        let mut params = ParameterTables::default();
        params.herbivore.omega = 0.0;
        params.herbivore.mu = 0.0;
        let config = SimulationConfig {
            seed: 1,
            parallel: false,
            params,
        };
        let mut sim = Simulation::with_population(
            "WWW\nWLW\nWWW",
            config,
            &[PopulationEntry::new(
                Position::new(1, 1),
                vec![AnimalSpec::herbivore(0, 20.0)],
            )],
        )
        .unwrap();

        let report = sim.step();

        // 20 + 0.9 * 10 = 29, then loses 5 %.
        let vitals = sim.vitals(Species::Herbivore);
        assert_eq!(report.population.herbivores, 1);
        assert_eq!(vitals.age, vec![1]);
        assert!((vitals.weight[0] - 27.55).abs() < 1e-9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn test_invariants_hold(seed in any::<u64>(), years in 1u64..12) {
            let mut sim = mixed(seed, true);
            let mut population = sim.num_animals_per_species();
            for report in sim.simulate(years) {
                prop_assert_eq!(
                    population.total() + report.births.total(),
                    report.population.total() + report.deaths.total()
                );
                population = report.population;
            }
            for species in Species::all() {
                let vitals = sim.vitals(species);
                prop_assert!(vitals.weight.iter().all(|w| *w > 0.0));
                prop_assert!(vitals.fitness.iter().all(|f| (0.0..=1.0).contains(f)));
            }
        }
    }
}
