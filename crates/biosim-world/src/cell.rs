//! A single island cell: terrain, fodder and its resident animals.
//!
//! Every stage method here touches only this cell's own state, which is what
//! lets the island run them for all cells in parallel.

use crate::animal::{Animal, AnimalId, AnimalSnapshot};
use crate::grid::Grid;
use crate::rng::Trials;
use biosim_core::{
    kill_probability, LandscapeParams, ParameterTables, Position, Species, SpeciesCounts,
    SpeciesParams, Terrain, Vitals,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An offspring produced during procreation, waiting for its id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Newborn {
    pub species: Species,
    pub weight: f64,
}

/// A move decided during the migration stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub species: Species,
    pub id: AnimalId,
    pub from: Position,
    pub to: Position,
}

/// What happened in a cell during the feeding stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedingOutcome {
    pub fodder_eaten: f64,
    pub kills: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    position: Position,
    terrain: Terrain,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
}

impl Cell {
    pub fn new(position: Position, terrain: Terrain) -> Self {
        Self {
            position,
            terrain,
            fodder: 0.0,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    pub fn fodder(&self) -> f64 {
        self.fodder
    }

    pub fn herbivores(&self) -> &[Animal] {
        &self.herbivores
    }

    pub fn carnivores(&self) -> &[Animal] {
        &self.carnivores
    }

    pub fn animals(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    fn animals_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    pub fn counts(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.herbivores.len(), self.carnivores.len())
    }

    pub fn is_empty(&self) -> bool {
        self.herbivores.is_empty() && self.carnivores.is_empty()
    }

    pub fn iter_animals(&self) -> impl Iterator<Item = &Animal> + '_ {
        self.herbivores.iter().chain(self.carnivores.iter())
    }

    /// Add an animal to the collection of its species.
    pub(crate) fn insert(&mut self, animal: Animal) {
        debug_assert!(self.terrain.is_habitable(), "animal placed in water");
        self.animals_mut(animal.species()).push(animal);
    }

    /// Hand over every animal named in `moves`, paired with its destination.
    /// Residents keep their relative order.
    pub(crate) fn depart(&mut self, moves: &[Migration]) -> Vec<(Position, Animal)> {
        debug_assert!(
            moves
                .iter()
                .all(|m| m.from == self.position && m.from.manhattan_distance(&m.to) == 1),
            "migration must be one step away from {}",
            self.position
        );
        let destinations: HashMap<AnimalId, Position> =
            moves.iter().map(|m| (m.id, m.to)).collect();
        let mut leaving = Vec::with_capacity(moves.len());
        for species in Species::all() {
            let animals = std::mem::take(self.animals_mut(species));
            let mut staying = Vec::with_capacity(animals.len());
            for animal in animals {
                match destinations.get(&animal.id()) {
                    Some(&to) => leaving.push((to, animal)),
                    None => staying.push(animal),
                }
            }
            *self.animals_mut(species) = staying;
        }
        leaving
    }

    /// Reset fodder to the terrain maximum. Desert and water stay at 0.
    pub fn regrow_fodder(&mut self, landscape: &LandscapeParams) {
        self.fodder = landscape.f_max(self.terrain);
    }

    /// Herbivores graze in random order, each taking up to its appetite.
    pub fn feed_herbivores<R: Rng + ?Sized>(&mut self, params: &SpeciesParams, rng: &mut R) -> f64 {
        let mut eaten = 0.0;
        for index in rng.shuffled(self.herbivores.len()) {
            if self.fodder <= 0.0 {
                break;
            }
            let amount = params.appetite.min(self.fodder);
            self.herbivores[index].eat(amount, params);
            self.fodder -= amount;
            eaten += amount;
        }
        eaten
    }

    /// Carnivores hunt in random order, each attacking the weakest remaining
    /// herbivores until it is full or has tried every one of them.
    pub fn hunt<R: Rng + ?Sized>(
        &mut self,
        prey_params: &SpeciesParams,
        hunter_params: &SpeciesParams,
        rng: &mut R,
    ) -> usize {
        if self.carnivores.is_empty() || self.herbivores.is_empty() {
            return 0;
        }
        let delta_phi_max = hunter_params.delta_phi_max.unwrap_or(f64::INFINITY);

        // Prey fitness does not change while carnivores hunt, so it is sorted once.
        let mut prey: Vec<(f64, Animal)> = self
            .herbivores
            .drain(..)
            .map(|animal| (animal.fitness(prey_params), animal))
            .collect();
        prey.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut kills = 0;
        for index in rng.shuffled(self.carnivores.len()) {
            if prey.is_empty() {
                break;
            }
            let hunter = &mut self.carnivores[index];
            let mut eaten = 0.0;
            let mut i = 0;
            while i < prey.len() && eaten < hunter_params.appetite {
                let probability =
                    kill_probability(hunter.fitness(hunter_params), prey[i].0, delta_phi_max);
                if rng.bernoulli(probability) {
                    let (_, victim) = prey.remove(i);
                    let amount = (hunter_params.appetite - eaten).min(victim.weight());
                    hunter.eat(amount, hunter_params);
                    eaten += amount;
                    kills += 1;
                } else {
                    i += 1;
                }
            }
        }

        self.herbivores = prey.into_iter().map(|(_, animal)| animal).collect();
        kills
    }

    /// Full feeding stage for this cell: grazing first, then hunting.
    pub fn feed<R: Rng + ?Sized>(&mut self, tables: &ParameterTables, rng: &mut R) -> FeedingOutcome {
        let fodder_eaten = self.feed_herbivores(&tables.herbivore, rng);
        let kills = self.hunt(&tables.herbivore, &tables.carnivore, rng);
        FeedingOutcome {
            fodder_eaten,
            kills,
        }
    }

    /// Procreation trials for every animal present when the stage starts.
    ///
    /// Offspring are returned rather than inserted, so they neither count
    /// towards `N` nor give birth themselves this year.
    pub fn procreate<R: Rng + ?Sized>(&mut self, tables: &ParameterTables, rng: &mut R) -> Vec<Newborn> {
        let mut newborns = Vec::new();
        for species in Species::all() {
            let params = tables.species(species);
            let animals = self.animals_mut(species);
            let same_species = animals.len();
            if same_species < 2 {
                continue;
            }
            for parent in animals.iter_mut() {
                if let Some(weight) = parent.try_procreate(same_species, params, rng) {
                    newborns.push(Newborn { species, weight });
                }
            }
        }
        newborns
    }

    /// Decide which animals leave this cell and where to.
    ///
    /// Only reads the cell, so every cell can decide against the same
    /// start-of-stage state before any move is applied.
    pub fn migration_intents<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        tables: &ParameterTables,
        rng: &mut R,
    ) -> Vec<Migration> {
        let mut moves = Vec::new();
        for species in Species::all() {
            let params = tables.species(species);
            for animal in self.animals(species) {
                if !animal.wants_to_migrate(params, rng) {
                    continue;
                }
                let direction = rng.direction();
                let Some(target) = grid.neighbour(self.position, direction) else {
                    continue;
                };
                if grid.terrain(target).is_some_and(|terrain| terrain.is_habitable()) {
                    moves.push(Migration {
                        species,
                        id: animal.id(),
                        from: self.position,
                        to: target,
                    });
                }
            }
        }
        moves
    }

    pub fn age_animals(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.grow_older();
        }
    }

    pub fn lose_weight(&mut self, tables: &ParameterTables) {
        for species in Species::all() {
            let params = tables.species(species);
            for animal in self.animals_mut(species) {
                animal.lose_weight(params);
            }
        }
    }

    /// Death trials; each animal is judged on its own state only.
    pub fn cull<R: Rng + ?Sized>(&mut self, tables: &ParameterTables, rng: &mut R) -> SpeciesCounts {
        let mut deaths = SpeciesCounts::default();
        for species in Species::all() {
            let params = tables.species(species);
            let animals = self.animals_mut(species);
            let before = animals.len();
            animals.retain(|animal| !animal.dies(params, rng));
            deaths.add(species, before - animals.len());
        }
        deaths
    }

    pub fn vitals(&self, species: Species, params: &SpeciesParams) -> Vitals {
        let mut vitals = Vitals::new();
        for animal in self.animals(species) {
            vitals.update(animal.age(), animal.weight(), animal.fitness(params));
        }
        vitals
    }

    pub fn snapshot(&self, tables: &ParameterTables) -> CellSnapshot {
        let view = |species: Species| -> Vec<AnimalSnapshot> {
            let params = tables.species(species);
            self.animals(species)
                .iter()
                .map(|animal| AnimalSnapshot::new(animal, params))
                .collect()
        };
        CellSnapshot {
            position: self.position,
            terrain: self.terrain,
            fodder: self.fodder,
            herbivores: view(Species::Herbivore),
            carnivores: view(Species::Carnivore),
        }
    }
}

/// Serializable state of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub position: Position,
    pub terrain: Terrain,
    pub fodder: f64,
    pub herbivores: Vec<AnimalSnapshot>,
    pub carnivores: Vec<AnimalSnapshot>,
}
