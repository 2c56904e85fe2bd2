//! Objective capability interface.
//!
//! The engine never owns an objective model; callers supply one through
//! [`LatentObjective`] (a capability-style seam, not a class hierarchy) and
//! the optimizer scores points through [`CombinedObjective`], which adds the
//! uncertainty-weighted exploration bonus.

use tn_types::{DynError, EvalStage, EvaluationFailure, LatentPoint, TnResult};

/// Caller-supplied objective surface over the latent space.
///
/// Both functions are expected to be pure and cheap enough to call
/// O(dim · iterations) times per run. Failures are propagated, never
/// retried.
pub trait LatentObjective: Send + Sync {
    /// Base objective score at `point`; higher is better.
    fn evaluate(&self, point: &LatentPoint) -> Result<f64, DynError>;

    /// Model uncertainty at `point`; higher means less trusted.
    fn uncertainty(&self, point: &LatentPoint) -> Result<f64, DynError>;
}

/// Adapter wrapping a pair of infallible closures as a [`LatentObjective`].
pub struct FnObjective<E, U> {
    evaluate: E,
    uncertainty: U,
}

impl<E, U> FnObjective<E, U>
where
    E: Fn(&LatentPoint) -> f64 + Send + Sync,
    U: Fn(&LatentPoint) -> f64 + Send + Sync,
{
    pub fn new(evaluate: E, uncertainty: U) -> Self {
        Self {
            evaluate,
            uncertainty,
        }
    }
}

impl<E, U> LatentObjective for FnObjective<E, U>
where
    E: Fn(&LatentPoint) -> f64 + Send + Sync,
    U: Fn(&LatentPoint) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: &LatentPoint) -> Result<f64, DynError> {
        Ok((self.evaluate)(point))
    }

    fn uncertainty(&self, point: &LatentPoint) -> Result<f64, DynError> {
        Ok((self.uncertainty)(point))
    }
}

/// Base objective plus an uncertainty-weighted exploration bonus.
///
/// Biases the search toward regions the model is unsure about, which is
/// what lets the detector distinguish a genuine optimum from a false wall.
pub struct CombinedObjective<'a, O> {
    objective: &'a O,
    exploration_weight: f64,
}

impl<'a, O: LatentObjective> CombinedObjective<'a, O> {
    pub fn new(objective: &'a O, exploration_weight: f64) -> Self {
        Self {
            objective,
            exploration_weight,
        }
    }

    /// Combined score at `point`, wrapping caller failures with the
    /// offending point attached.
    pub fn score(&self, point: &LatentPoint) -> TnResult<f64> {
        let base = self
            .objective
            .evaluate(point)
            .map_err(|source| EvaluationFailure::new(EvalStage::Objective, point.clone(), source))?;
        let uncertainty = self.objective.uncertainty(point).map_err(|source| {
            EvaluationFailure::new(EvalStage::Uncertainty, point.clone(), source)
        })?;
        Ok(base + self.exploration_weight * uncertainty)
    }
}
