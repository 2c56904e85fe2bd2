//! Run configuration for the optimization engine.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Immutable parameters for one optimization run.
///
/// Every option has an explicit default (see [`EngineConfig::default`]);
/// [`EngineConfig::validate`] enforces the invariants before the engine
/// starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Gradient norm below which the gradient counts as vanished.
    pub gradient_threshold: f64,

    /// How many iterations back the plateau comparison looks.
    pub plateau_window: usize,

    /// Objective change (absolute) below which the run counts as plateaued.
    pub plateau_threshold: f64,

    /// Uncertainty score above which a stationary point is suspect.
    pub uncertainty_threshold: f64,

    /// Step size of the normalized gradient-ascent update.
    pub learning_rate: f64,

    /// Weight of the uncertainty bonus in the combined objective.
    pub exploration_weight: f64,

    /// Scale of the exploration noise; axis probes go out at twice this.
    pub sigma: f64,

    /// Number of isotropic Gaussian escape candidates per exploration.
    pub n_noise_directions: usize,

    /// Number of candidates the decoder produces from the final point.
    pub n_decode_samples: usize,

    /// Gaussian scale for decode-time perturbations.
    pub decode_noise_scale: f64,

    /// Hard cap on iterations per run.
    pub max_iterations: usize,

    /// Numerical stability epsilon for the step normalization.
    pub epsilon: f64,

    /// Probe step for finite-difference gradients (distinct from `sigma`).
    pub fd_step: f64,

    /// Minimum strict improvement required to accept an escape candidate.
    pub escape_tolerance: f64,

    /// Evaluation pool width; 0 keeps everything on the calling thread.
    pub workers: usize,

    /// RNG seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gradient_threshold: 1e-3,
            plateau_window: 5,
            plateau_threshold: 1e-4,
            uncertainty_threshold: 0.5,
            learning_rate: 0.05,
            exploration_weight: 0.1,
            sigma: 0.3,
            n_noise_directions: 8,
            n_decode_samples: 5,
            decode_noise_scale: 0.05,
            max_iterations: 200,
            epsilon: 1e-8,
            fd_step: 1e-4,
            escape_tolerance: 1e-6,
            workers: 0,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_stagnation_thresholds(
        mut self,
        gradient: f64,
        plateau: f64,
        uncertainty: f64,
    ) -> Self {
        self.gradient_threshold = gradient;
        self.plateau_threshold = plateau;
        self.uncertainty_threshold = uncertainty;
        self
    }

    pub fn with_plateau_window(mut self, window: usize) -> Self {
        self.plateau_window = window;
        self
    }

    pub fn with_decode_samples(mut self, n: usize, noise_scale: f64) -> Self {
        self.n_decode_samples = n;
        self.decode_noise_scale = noise_scale;
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration invariants.
    ///
    /// Thresholds and noise scales must be non-negative, step sizes must be
    /// positive and finite, and the window/sample/iteration counts must be
    /// at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("gradient_threshold", self.gradient_threshold)?;
        non_negative("plateau_threshold", self.plateau_threshold)?;
        non_negative("uncertainty_threshold", self.uncertainty_threshold)?;
        non_negative("sigma", self.sigma)?;
        non_negative("decode_noise_scale", self.decode_noise_scale)?;
        non_negative("escape_tolerance", self.escape_tolerance)?;
        positive("learning_rate", self.learning_rate)?;
        positive("epsilon", self.epsilon)?;
        positive("fd_step", self.fd_step)?;
        at_least_one("plateau_window", self.plateau_window)?;
        at_least_one("n_decode_samples", self.n_decode_samples)?;
        at_least_one("max_iterations", self.max_iterations)?;
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < 0.0 {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(())
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(())
}

fn at_least_one(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::CountTooSmall { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_chain_overrides_defaults() {
        let config = EngineConfig::new()
            .with_learning_rate(0.2)
            .with_sigma(1.0)
            .with_max_iterations(50)
            .with_seed(7);
        assert_eq!(config.learning_rate, 0.2);
        assert_eq!(config.sigma, 1.0);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = EngineConfig::new().with_stagnation_thresholds(-0.1, 1e-4, 0.5);
        match config.validate() {
            Err(ConfigError::Negative { name, .. }) => assert_eq!(name, "gradient_threshold"),
            other => panic!("expected Negative error, got {other:?}"),
        }
    }

    #[test]
    fn zero_learning_rate_is_rejected() {
        let config = EngineConfig::new().with_learning_rate(0.0);
        match config.validate() {
            Err(ConfigError::NonPositive { name, .. }) => assert_eq!(name, "learning_rate"),
            other => panic!("expected NonPositive error, got {other:?}"),
        }
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = EngineConfig::new().with_plateau_window(0);
        match config.validate() {
            Err(ConfigError::CountTooSmall { name, .. }) => assert_eq!(name, "plateau_window"),
            other => panic!("expected CountTooSmall error, got {other:?}"),
        }
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let config = EngineConfig::new().with_sigma(f64::NAN);
        assert!(config.validate().is_err());
    }
}
