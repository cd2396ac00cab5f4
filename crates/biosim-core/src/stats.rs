//! Population statistics computed by scanning animals.

use crate::Species;
use serde::{Deserialize, Serialize};

/// Count and mean physiology of a group of animals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub count: usize,
    pub mean_age: f64,
    pub mean_weight: f64,
    pub mean_fitness: f64,
}

impl Vitals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one animal into the running means
    pub fn update(&mut self, age: u32, weight: f64, fitness: f64) {
        let n = self.count as f64;
        let new_n = n + 1.0;

        self.mean_age = (self.mean_age * n + age as f64) / new_n;
        self.mean_weight = (self.mean_weight * n + weight) / new_n;
        self.mean_fitness = (self.mean_fitness * n + fitness) / new_n;
        self.count += 1;
    }
}

/// Per-species animal counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    pub herbivores: usize,
    pub carnivores: usize,
}

impl SpeciesCounts {
    pub fn new(herbivores: usize, carnivores: usize) -> Self {
        Self {
            herbivores,
            carnivores,
        }
    }

    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
        }
    }

    pub fn add(&mut self, species: Species, amount: usize) {
        match species {
            Species::Herbivore => self.herbivores += amount,
            Species::Carnivore => self.carnivores += amount,
        }
    }

    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }
}

impl std::ops::AddAssign for SpeciesCounts {
    fn add_assign(&mut self, other: Self) {
        self.herbivores += other.herbivores;
        self.carnivores += other.carnivores;
    }
}

/// Raw per-animal values of one species, for histograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesVitals {
    pub age: Vec<u32>,
    pub weight: Vec<f64>,
    pub fitness: Vec<f64>,
}

impl SpeciesVitals {
    pub fn push(&mut self, age: u32, weight: f64, fitness: f64) {
        self.age.push(age);
        self.weight.push(weight);
        self.fitness.push(fitness);
    }

    pub fn len(&self) -> usize {
        self.age.len()
    }

    pub fn is_empty(&self) -> bool {
        self.age.is_empty()
    }
}
