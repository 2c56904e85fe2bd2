//! Escape-candidate generation around a stuck point.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use tn_types::{EngineConfig, LatentPoint, TnError, TnResult};

use crate::pool::EvalPool;

/// The best escape point found around a stuck point, with its combined
/// objective score.
#[derive(Debug, Clone, PartialEq)]
pub struct EscapeProposal {
    pub point: LatentPoint,
    pub score: f64,
    /// True when the winning candidate came from an axis probe rather than
    /// an isotropic draw.
    pub systematic: bool,
}

struct EscapeCandidate {
    point: LatentPoint,
    systematic: bool,
    distance: f64,
}

/// Proposes escape points around a stuck point.
///
/// Axis probes at ±2σ guarantee every coordinate direction is covered;
/// the isotropic Gaussian draws add directions no axis probe reaches, and
/// with enough of them the odds that at least one aligns with a true
/// improving direction approach certainty.
#[derive(Debug, Clone)]
pub struct Explorer {
    sigma: f64,
    n_noise_directions: usize,
}

impl Explorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sigma: config.sigma,
            n_noise_directions: config.n_noise_directions,
        }
    }

    /// Evaluate the full candidate set (systematic ∪ stochastic) and return
    /// the single best-scoring point.
    ///
    /// Read-only against the objective. Ties are broken deterministically:
    /// systematic candidates in axis order first, then the smallest
    /// distance from the stuck point, then generation order. `None` only
    /// when the candidate set is empty (zero dimensions and zero draws).
    pub fn propose<F, R>(
        &self,
        stuck: &LatentPoint,
        score_fn: &F,
        pool: &EvalPool,
        rng: &mut R,
    ) -> TnResult<Option<EscapeProposal>>
    where
        F: Fn(&LatentPoint) -> TnResult<f64> + Send + Sync,
        R: Rng,
    {
        let candidates = self.generate(stuck, rng)?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let points: Vec<LatentPoint> = candidates.iter().map(|c| c.point.clone()).collect();
        let scores = pool.score_batch(&points, score_fn)?;

        let mut best = 0usize;
        for idx in 1..candidates.len() {
            if prefer(&candidates[idx], scores[idx], &candidates[best], scores[best]) {
                best = idx;
            }
        }

        debug!(
            "explored {} candidates around {}: best score {:.6} ({})",
            candidates.len(),
            stuck,
            scores[best],
            if candidates[best].systematic {
                "systematic"
            } else {
                "stochastic"
            }
        );

        Ok(Some(EscapeProposal {
            point: candidates[best].point.clone(),
            score: scores[best],
            systematic: candidates[best].systematic,
        }))
    }

    /// Systematic ±2σ axis probes in axis order, then `n_noise_directions`
    /// isotropic draws at scale σ.
    fn generate<R: Rng>(
        &self,
        stuck: &LatentPoint,
        rng: &mut R,
    ) -> TnResult<Vec<EscapeCandidate>> {
        let dim = stuck.dim();
        let mut candidates = Vec::with_capacity(2 * dim + self.n_noise_directions);

        for axis in 0..dim {
            for delta in [2.0 * self.sigma, -2.0 * self.sigma] {
                let point = stuck.axis_offset(axis, delta);
                let distance = stuck.distance(&point);
                candidates.push(EscapeCandidate {
                    point,
                    systematic: true,
                    distance,
                });
            }
        }

        let normal = Normal::new(0.0, self.sigma)
            .map_err(|e| TnError::Internal(format!("invalid exploration scale: {e}")))?;
        for _ in 0..self.n_noise_directions {
            let delta: Vec<f64> = (0..dim).map(|_| normal.sample(rng)).collect();
            let point = stuck.translated(&delta);
            let distance = stuck.distance(&point);
            candidates.push(EscapeCandidate {
                point,
                systematic: false,
                distance,
            });
        }

        Ok(candidates)
    }
}

/// True when `candidate` should replace `best`.
///
/// Strictly better score wins; on an exact tie a systematic candidate beats
/// a stochastic one, two stochastic candidates compare by distance to the
/// stuck point, and otherwise the earlier-generated candidate is kept.
fn prefer(
    candidate: &EscapeCandidate,
    score: f64,
    best: &EscapeCandidate,
    best_score: f64,
) -> bool {
    if score != best_score {
        return score > best_score;
    }
    match (candidate.systematic, best.systematic) {
        (true, false) => true,
        (false, false) => candidate.distance < best.distance,
        _ => false,
    }
}
