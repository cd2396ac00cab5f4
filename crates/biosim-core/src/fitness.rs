//! Fitness and the probability formulas derived from it.
//!
//! Everything here is a pure function of its arguments, so fitness is always
//! recomputed from an animal's current age and weight rather than cached.

use crate::SpeciesParams;

/// Logistic factor that falls from 1 to 0 as `x` grows past `x_half`.
pub fn q_plus(x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (phi * (x - x_half)).exp())
}

/// Logistic factor that rises from 0 to 1 as `x` grows past `x_half`.
pub fn q_minus(x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (-phi * (x - x_half)).exp())
}

/// Fitness Φ in `[0, 1]` for an animal of the given age and weight.
pub fn fitness(age: u32, weight: f64, params: &SpeciesParams) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let phi = q_plus(age as f64, params.a_half, params.phi_age)
        * q_minus(weight, params.w_half, params.phi_weight);
    if phi.is_nan() {
        return 0.0;
    }
    phi.clamp(0.0, 1.0)
}

/// Probability that a carnivore with fitness `predator` kills a herbivore with
/// fitness `prey` in a single attempt.
pub fn kill_probability(predator: f64, prey: f64, delta_phi_max: f64) -> f64 {
    let difference = predator - prey;
    if difference <= 0.0 {
        0.0
    } else if difference > delta_phi_max {
        1.0
    } else {
        difference / delta_phi_max
    }
}

/// Probability of giving birth with `same_species` animals (the parent
/// included) present in the cell at the start of procreation.
pub fn procreation_probability(gamma: f64, fitness: f64, same_species: usize) -> f64 {
    if same_species <= 1 {
        return 0.0;
    }
    (gamma * fitness * (same_species - 1) as f64).min(1.0)
}

pub fn migration_probability(mu: f64, fitness: f64) -> f64 {
    mu * fitness
}

pub fn death_probability(omega: f64, fitness: f64) -> f64 {
    omega * (1.0 - fitness)
}

/// Smallest parent weight at which a successful procreation trial may
/// produce an offspring.
pub fn birth_weight_threshold(params: &SpeciesParams) -> f64 {
    params.zeta * (params.w_birth + params.sigma_birth)
}
