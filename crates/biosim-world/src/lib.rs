//! Island ecosystem engine.
//!
//! Herbivores and carnivores live on a grid of terrain cells and go through
//! the same annual cycle every year: feeding, procreation, migration, aging,
//! weight loss and death.

pub mod animal;
pub mod cell;
pub mod grid;
pub mod island;
pub mod rng;
pub mod simulation;

pub use animal::{Animal, AnimalId, AnimalSnapshot};
pub use cell::{Cell, CellSnapshot};
pub use grid::Grid;
pub use island::{Island, IslandSnapshot};
pub use rng::{Stage, TrialSource, Trials};
pub use simulation::{CellStats, CycleReport, Simulation};
