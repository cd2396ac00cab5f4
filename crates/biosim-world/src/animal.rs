//! Animal state and physiology.

use crate::rng::Trials;
use biosim_core::{fitness, Species, SpeciesParams};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one animal for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimalId(pub u64);

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An animal in the simulation.
///
/// Age and weight only change through the physiology methods below; fitness
/// is derived from them on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    id: AnimalId,
    species: Species,
    age: u32,
    weight: f64,
}

impl Animal {
    pub fn new(id: AnimalId, species: Species, age: u32, weight: f64) -> Self {
        Self {
            id,
            species,
            age,
            weight,
        }
    }

    pub fn id(&self) -> AnimalId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn fitness(&self, params: &SpeciesParams) -> f64 {
        fitness(self.age, self.weight, params)
    }

    pub fn is_alive(&self) -> bool {
        self.weight > 0.0
    }

    /// Gain `beta` times the amount of food eaten.
    pub fn eat(&mut self, amount: f64, params: &SpeciesParams) {
        self.weight += params.beta * amount;
    }

    pub fn grow_older(&mut self) {
        self.age = self.age.saturating_add(1);
    }

    pub fn lose_weight(&mut self, params: &SpeciesParams) {
        self.weight -= params.eta * self.weight;
        if self.weight < 0.0 {
            self.weight = 0.0;
        }
    }

    /// Run one procreation attempt with `same_species` animals in the cell at
    /// the start of the stage. Returns the offspring's birth weight when a
    /// birth happens; the parent has already paid for it.
    pub fn try_procreate<R: Rng + ?Sized>(
        &mut self,
        same_species: usize,
        params: &SpeciesParams,
        rng: &mut R,
    ) -> Option<f64> {
        let probability =
            fitness::procreation_probability(params.gamma, self.fitness(params), same_species);
        if !rng.bernoulli(probability) {
            return None;
        }
        if self.weight < fitness::birth_weight_threshold(params) {
            return None;
        }

        let birth_weight = rng.gaussian(params.w_birth, params.sigma_birth);
        if birth_weight <= 0.0 {
            return None;
        }
        let cost = params.xi * birth_weight;
        if self.weight < cost {
            return None;
        }

        self.weight -= cost;
        Some(birth_weight)
    }

    /// Decide whether this animal tries to leave its cell this year.
    pub fn wants_to_migrate<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        rng.bernoulli(fitness::migration_probability(params.mu, self.fitness(params)))
    }

    /// Run the yearly death trial. Animals without weight always die.
    pub fn dies<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        if !self.is_alive() {
            return true;
        }
        rng.bernoulli(fitness::death_probability(params.omega, self.fitness(params)))
    }
}

/// Serializable view of an animal, including its fitness at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSnapshot {
    pub id: AnimalId,
    pub age: u32,
    pub weight: f64,
    pub fitness: f64,
}

impl AnimalSnapshot {
    pub fn new(animal: &Animal, params: &SpeciesParams) -> Self {
        Self {
            id: animal.id,
            age: animal.age,
            weight: animal.weight,
            fitness: animal.fitness(params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn herbivore(age: u32, weight: f64) -> Animal {
        Animal::new(AnimalId(1), Species::Herbivore, age, weight)
    }

    #[test]
    fn test_animal_creation() {
        let animal = herbivore(5, 20.0);
        assert_eq!(animal.id(), AnimalId(1));
        assert_eq!(animal.species(), Species::Herbivore);
        assert_eq!(animal.age(), 5);
        assert_eq!(animal.weight(), 20.0);
        assert!(animal.is_alive());
    }

    #[test]
    fn test_eat() {
        let params = SpeciesParams::herbivore();
        let mut animal = herbivore(0, 20.0);
        animal.eat(10.0, &params);
        assert!((animal.weight() - 29.0).abs() < 1e-12);
    }

    #[test]
    fn test_aging_and_weight_loss() {
        let params = SpeciesParams::herbivore();
        let mut animal = herbivore(3, 40.0);
        let before = animal.fitness(&params);

        animal.grow_older();
        animal.lose_weight(&params);

        assert_eq!(animal.age(), 4);
        assert!((animal.weight() - 38.0).abs() < 1e-12);
        assert!(animal.fitness(&params) < before);
    }

    #[test]
    fn test_full_weight_loss_reaches_zero() {
        let mut params = SpeciesParams::herbivore();
        params.eta = 1.0;
        let mut animal = herbivore(3, 40.0);
        animal.lose_weight(&params);
        assert_eq!(animal.weight(), 0.0);
        assert!(!animal.is_alive());
        assert_eq!(animal.fitness(&params), 0.0);
    }

    #[test]
    fn test_weightless_animal_always_dies() {
        let mut params = SpeciesParams::herbivore();
        params.omega = 0.0;
        let animal = herbivore(3, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(animal.dies(&params, &mut rng));
        }
    }

    #[test]
    fn test_no_death_without_omega() {
        let mut params = SpeciesParams::herbivore();
        params.omega = 0.0;
        let animal = herbivore(80, 2.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!((0..100).all(|_| !animal.dies(&params, &mut rng)));
    }

    #[test]
    fn test_lone_animal_never_procreates() {
        let mut params = SpeciesParams::herbivore();
        params.gamma = 1e9;
        let mut animal = herbivore(5, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(animal.try_procreate(1, &params, &mut rng), None);
        }
        assert_eq!(animal.weight(), 100.0);
    }

    #[test]
    fn test_procreation_costs_parent_weight() {
        let mut params = SpeciesParams::herbivore();
        params.gamma = 1e9;
        let mut animal = herbivore(5, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let birth_weight = animal
            .try_procreate(10, &params, &mut rng)
            .expect("certain procreation should give birth");
        assert!(birth_weight > 0.0);
        assert!((animal.weight() - (100.0 - params.xi * birth_weight)).abs() < 1e-9);
    }

    #[test]
    fn test_light_parent_does_not_procreate() {
        let mut params = SpeciesParams::herbivore();
        params.gamma = 1e9;
        let mut animal = herbivore(5, 30.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(animal.try_procreate(10, &params, &mut rng), None);
        }
        assert_eq!(animal.weight(), 30.0);
    }

    #[test]
    fn test_birth_heavier_than_parent_is_refused() {
        let mut params = SpeciesParams::herbivore();
        params.gamma = 1e9;
        params.zeta = 0.0;
        params.xi = 100.0;
        let mut animal = herbivore(5, 50.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            assert_eq!(animal.try_procreate(10, &params, &mut rng), None);
        }
        assert_eq!(animal.weight(), 50.0);
    }

    #[test]
    fn test_migration_certainty() {
        let mut params = SpeciesParams::carnivore();
        let animal = Animal::new(AnimalId(2), Species::Carnivore, 5, 60.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        params.mu = 0.0;
        assert!(!animal.wants_to_migrate(&params, &mut rng));
        params.mu = 1e9;
        assert!(animal.wants_to_migrate(&params, &mut rng));
    }

    #[test]
    fn test_animal_snapshot() {
        let params = SpeciesParams::herbivore();
        let animal = herbivore(5, 20.0);
        let snapshot = AnimalSnapshot::new(&animal, &params);
        assert_eq!(snapshot.id, animal.id());
        assert_eq!(snapshot.fitness, animal.fitness(&params));
    }
}
