//! Centered finite-difference gradient estimation.

use tn_types::{LatentPoint, TnResult};

use crate::pool::EvalPool;

/// Euclidean norm of a gradient vector.
pub fn l2_norm(vector: &[f64]) -> f64 {
    vector.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Finite-difference gradient estimator.
///
/// Two objective evaluations per axis, probing at `fd_step` (distinct from
/// the exploration noise scale). No smoothing is attempted over stochastic
/// objectives; single-shot estimates are treated as noisy by the caller.
pub struct GradientEstimator {
    fd_step: f64,
}

impl GradientEstimator {
    pub fn new(fd_step: f64) -> Self {
        Self { fd_step }
    }

    /// Estimate the gradient of `f` at `point`.
    ///
    /// A zero-dimensional point yields an empty gradient rather than an
    /// error; every other input produces a well-formed vector of matching
    /// dimension.
    pub fn estimate<F>(&self, point: &LatentPoint, f: &F, pool: &EvalPool) -> TnResult<Vec<f64>>
    where
        F: Fn(&LatentPoint) -> TnResult<f64> + Send + Sync,
    {
        let dim = point.dim();
        if dim == 0 {
            return Ok(Vec::new());
        }

        let mut probes = Vec::with_capacity(2 * dim);
        for axis in 0..dim {
            probes.push(point.axis_offset(axis, self.fd_step));
            probes.push(point.axis_offset(axis, -self.fd_step));
        }

        let scores = pool.score_batch(&probes, f)?;
        let gradient = (0..dim)
            .map(|axis| (scores[2 * axis] - scores[2 * axis + 1]) / (2.0 * self.fd_step))
            .collect();
        Ok(gradient)
    }
}
