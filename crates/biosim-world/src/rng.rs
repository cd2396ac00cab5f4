//! Seedable random trials.
//!
//! Each (year, stage, cell) triple gets its own ChaCha stream derived from the
//! global seed, so per-cell work draws the same numbers whether cells run in
//! parallel or one after another.

use biosim_core::Direction;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const YEAR_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const STAGE_MIX: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Stages that consume random draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Feeding = 1,
    Procreation = 2,
    Migration = 3,
    Death = 4,
}

/// Factory for the per-cell random streams of one simulation.
#[derive(Debug, Clone, Copy)]
pub struct TrialSource {
    seed: u64,
}

impl TrialSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The stream a cell uses during one stage of one year.
    pub fn stream(&self, year: u64, stage: Stage, cell_index: usize) -> ChaCha8Rng {
        let key = self
            .seed
            .wrapping_add(year.wrapping_add(1).wrapping_mul(YEAR_MIX))
            .wrapping_add((stage as u64).wrapping_mul(STAGE_MIX));
        let mut rng = ChaCha8Rng::seed_from_u64(key);
        rng.set_stream(cell_index as u64);
        rng
    }
}

/// Trial helpers available on every random number generator.
pub trait Trials {
    /// One Bernoulli trial. Probabilities at or below 0 (or NaN) never succeed
    /// and probabilities at or above 1 always do; neither consumes a draw.
    fn bernoulli(&mut self, probability: f64) -> bool;

    /// A normal draw. A non-positive or non-finite deviation returns `mean`.
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64;

    /// One of the four migration directions, uniformly.
    fn direction(&mut self) -> Direction;

    /// A uniformly random permutation of `0..len`.
    fn shuffled(&mut self, len: usize) -> Vec<usize>;
}

impl<R: Rng + ?Sized> Trials for R {
    fn bernoulli(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            false
        } else if probability >= 1.0 {
            true
        } else {
            self.gen::<f64>() < probability
        }
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(normal) if std_dev > 0.0 && std_dev.is_finite() => normal.sample(self),
            _ => mean,
        }
    }

    fn direction(&mut self) -> Direction {
        Direction::all()[self.gen_range(0..4)]
    }

    fn shuffled(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(self);
        order
    }
}
