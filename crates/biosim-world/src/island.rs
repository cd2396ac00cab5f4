//! The island: a grid of cells, population placement and cross-cell migration.

use crate::animal::{Animal, AnimalId};
use crate::cell::{Cell, CellSnapshot, FeedingOutcome, Migration};
use crate::grid::Grid;
use crate::rng::{Stage, TrialSource};
use biosim_core::{
    Error, LandscapeParams, ParameterTables, PopulationEntry, Position, Result, Species,
    SpeciesCounts,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    grid: Grid,
    cells: Vec<Cell>,
    next_id: u64,
}

impl Island {
    /// Build an island from a terrain map. This is the only place the
    /// water-border rule is checked.
    pub fn new(map: &str) -> Result<Self> {
        Ok(Self::from_grid(Grid::parse(map)?))
    }

    pub fn from_grid(grid: Grid) -> Self {
        let cells = grid
            .iter()
            .map(|(pos, terrain)| Cell::new(pos, terrain))
            .collect();
        Self {
            grid,
            cells,
            next_id: 0,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All cells in row-major order, water included.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.grid.index_of(pos).map(|index| &self.cells[index])
    }

    pub fn habitable_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells
            .iter()
            .filter(|cell| cell.terrain().is_habitable())
    }

    pub fn counts(&self) -> SpeciesCounts {
        let mut counts = SpeciesCounts::default();
        for cell in &self.cells {
            counts += cell.counts();
        }
        counts
    }

    fn allocate_id(&mut self) -> AnimalId {
        let id = AnimalId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add animals to existing residents. Either every entry is accepted or
    /// the island is left exactly as it was.
    pub fn place(&mut self, entries: &[PopulationEntry]) -> Result<usize> {
        let mut staged = Vec::new();
        for entry in entries {
            let index = self.grid.index_of(entry.location).ok_or_else(|| {
                Error::Validation(format!("{} is not a cell on the island", entry.location))
            })?;
            if !self.cells[index].terrain().is_habitable() {
                return Err(Error::Validation(format!(
                    "{} is a water cell, animals cannot be placed in water",
                    entry.location
                )));
            }
            for spec in &entry.population {
                let age = u32::try_from(spec.age).map_err(|_| {
                    Error::Validation(format!(
                        "{} at {} has invalid age {}",
                        spec.species, entry.location, spec.age
                    ))
                })?;
                if !(spec.weight > 0.0 && spec.weight.is_finite()) {
                    return Err(Error::Validation(format!(
                        "{} at {} must have positive weight, got {}",
                        spec.species, entry.location, spec.weight
                    )));
                }
                staged.push((index, spec.species, age, spec.weight));
            }
        }

        let placed = staged.len();
        for (index, species, age, weight) in staged {
            let id = self.allocate_id();
            self.cells[index].insert(Animal::new(id, species, age, weight));
        }
        debug!(entries = entries.len(), animals = placed, "Placed population");
        Ok(placed)
    }

    /// Run `f` on every habitable cell, in parallel when asked. Results come
    /// back in row-major cell order either way.
    fn map_cells<T, F>(&mut self, parallel: bool, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut Cell) -> T + Sync + Send,
    {
        if parallel {
            self.cells
                .par_iter_mut()
                .enumerate()
                .filter(|(_, cell)| cell.terrain().is_habitable())
                .map(|(index, cell)| f(index, cell))
                .collect()
        } else {
            self.cells
                .iter_mut()
                .enumerate()
                .filter(|(_, cell)| cell.terrain().is_habitable())
                .map(|(index, cell)| f(index, cell))
                .collect()
        }
    }

    /// Reset fodder on every cell before anyone eats.
    pub fn regrow_fodder(&mut self, landscape: &LandscapeParams) {
        for cell in &mut self.cells {
            cell.regrow_fodder(landscape);
        }
    }

    pub fn feeding_stage(
        &mut self,
        tables: &ParameterTables,
        trials: &TrialSource,
        year: u64,
        parallel: bool,
    ) -> FeedingOutcome {
        self.map_cells(parallel, |index, cell| {
            let mut rng = trials.stream(year, Stage::Feeding, index);
            cell.feed(tables, &mut rng)
        })
        .into_iter()
        .fold(FeedingOutcome::default(), |total, outcome| FeedingOutcome {
            fodder_eaten: total.fodder_eaten + outcome.fodder_eaten,
            kills: total.kills + outcome.kills,
        })
    }

    /// Procreation in every cell, then ids for the newborns in cell order.
    pub fn procreation_stage(
        &mut self,
        tables: &ParameterTables,
        trials: &TrialSource,
        year: u64,
        parallel: bool,
    ) -> SpeciesCounts {
        let litters = self.map_cells(parallel, |index, cell| {
            let mut rng = trials.stream(year, Stage::Procreation, index);
            (index, cell.procreate(tables, &mut rng))
        });

        let mut births = SpeciesCounts::default();
        for (index, newborns) in litters {
            for newborn in newborns {
                let id = self.allocate_id();
                self.cells[index].insert(Animal::new(id, newborn.species, 0, newborn.weight));
                births.add(newborn.species, 1);
            }
        }
        births
    }

    /// Decide every move against the start-of-stage state, then apply them
    /// as one batch: all departures first, then all arrivals.
    pub fn migration_stage(
        &mut self,
        tables: &ParameterTables,
        trials: &TrialSource,
        year: u64,
        parallel: bool,
    ) -> SpeciesCounts {
        let grid = &self.grid;
        let decide = |index: usize, cell: &Cell| {
            let mut rng = trials.stream(year, Stage::Migration, index);
            (index, cell.migration_intents(grid, tables, &mut rng))
        };
        let intents: Vec<(usize, Vec<Migration>)> = if parallel {
            self.cells
                .par_iter()
                .enumerate()
                .filter(|(_, cell)| cell.terrain().is_habitable())
                .map(|(index, cell)| decide(index, cell))
                .collect()
        } else {
            self.cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.terrain().is_habitable())
                .map(|(index, cell)| decide(index, cell))
                .collect()
        };

        let mut arrivals = Vec::new();
        for (index, moves) in intents {
            if !moves.is_empty() {
                arrivals.extend(self.cells[index].depart(&moves));
            }
        }

        let mut migrations = SpeciesCounts::default();
        for (destination, animal) in arrivals {
            let Some(index) = self.grid.index_of(destination) else {
                continue;
            };
            migrations.add(animal.species(), 1);
            self.cells[index].insert(animal);
        }
        migrations
    }

    pub fn aging_stage(&mut self, parallel: bool) {
        self.map_cells(parallel, |_, cell| cell.age_animals());
    }

    pub fn weight_loss_stage(&mut self, tables: &ParameterTables, parallel: bool) {
        self.map_cells(parallel, |_, cell| cell.lose_weight(tables));
    }

    pub fn death_stage(
        &mut self,
        tables: &ParameterTables,
        trials: &TrialSource,
        year: u64,
        parallel: bool,
    ) -> SpeciesCounts {
        let mut deaths = SpeciesCounts::default();
        for cell_deaths in self.map_cells(parallel, |index, cell| {
            let mut rng = trials.stream(year, Stage::Death, index);
            cell.cull(tables, &mut rng)
        }) {
            deaths += cell_deaths;
        }
        deaths
    }

    /// Rows x cols matrix of how many animals of `species` live in each cell.
    pub fn population_grid(&self, species: Species) -> Vec<Vec<usize>> {
        let mut grid = vec![vec![0; self.grid.cols as usize]; self.grid.rows as usize];
        for cell in &self.cells {
            let pos = cell.position();
            grid[pos.row as usize][pos.col as usize] = cell.animals(species).len();
        }
        grid
    }

    pub fn snapshot(&self, tables: &ParameterTables, year: u64) -> IslandSnapshot {
        IslandSnapshot {
            year,
            rows: self.grid.rows,
            cols: self.grid.cols,
            cells: self
                .cells
                .iter()
                .map(|cell| cell.snapshot(tables))
                .collect(),
        }
    }
}

/// Serializable state of the whole island, for visualisation and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandSnapshot {
    pub year: u64,
    pub rows: i32,
    pub cols: i32,
    pub cells: Vec<CellSnapshot>,
}

impl IslandSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
