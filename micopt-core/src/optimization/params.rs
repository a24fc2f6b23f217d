use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Schedule shaping the GA's blend between the strict high-confidence
/// coverage objective and the lenient any-detection objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaCurve {
    Linear,
    Expo,
}

/// Configuration bundle for one solver run. Immutable for the run's duration;
/// `validate` is the fail-fast gate before either solver's state machine starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationParams {
    pub num_recorders: usize,
    /// Detection sensitivity sigma, km.
    pub sd: f64,
    /// Semicircle region radius, km.
    pub radius: f64,

    // Genetic solver
    pub generations: usize,
    pub pop_size: usize,
    pub mutation_rate: f64,
    pub mutation_std: f64,
    pub alpha_curve: AlphaCurve,

    // Shared penalties
    pub empty_penalty_fraction: f64,
    pub close_penalty_fraction: f64,
    pub min_dist: f64,

    // Gradient solver
    pub gradient_learning_rate: f64,
    pub gradient_steps: usize,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        OptimizationParams {
            num_recorders: 8,
            sd: 10.,
            radius: 20.,
            generations: 100,
            pop_size: 30,
            mutation_rate: 0.3,
            mutation_std: 1.5,
            alpha_curve: AlphaCurve::Linear,
            empty_penalty_fraction: 0.3,
            close_penalty_fraction: 0.2,
            min_dist: 3.,
            gradient_learning_rate: 0.01,
            gradient_steps: 100,
        }
    }
}

impl OptimizationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_recorders < 1 {
            return Err(ConfigError::NoRecorders);
        }
        if self.sd <= 0. {
            return Err(ConfigError::NonPositiveSigma(self.sd));
        }
        if self.radius <= 0. {
            return Err(ConfigError::NonPositiveRadius(self.radius));
        }
        if self.generations < 1 {
            return Err(ConfigError::NoGenerations);
        }
        if self.pop_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.pop_size));
        }
        if !(0. ..=1.).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRateOutOfRange(self.mutation_rate));
        }
        if self.gradient_steps < 1 {
            return Err(ConfigError::NoGradientSteps);
        }
        if self.gradient_learning_rate <= 0. {
            return Err(ConfigError::NonPositiveLearningRate(self.gradient_learning_rate));
        }
        for (field, value) in [
            ("mutation_std", self.mutation_std),
            ("empty_penalty_fraction", self.empty_penalty_fraction),
            ("close_penalty_fraction", self.close_penalty_fraction),
            ("min_dist", self.min_dist),
        ] {
            if value < 0. {
                return Err(ConfigError::NegativeField { field, value });
            }
        }
        Ok(())
    }
}
