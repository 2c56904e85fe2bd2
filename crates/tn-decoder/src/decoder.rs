//! Stochastic decoding of a latent optimum into discrete candidates.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde_json::Value;
use tracing::debug;

use tn_types::{
    Candidate, DynError, EngineConfig, EvalStage, EvaluationFailure, LatentPoint, TnError,
    TnResult,
};

use crate::constraints::OutputConstraint;

/// Caller-supplied mapping from latent points to discrete outputs.
///
/// Treated as a black box; decode failures are propagated with the
/// offending point attached, never retried.
pub trait LatentDecoder: Send + Sync {
    fn decode(&self, point: &LatentPoint) -> Result<Value, DynError>;
}

/// Adapter wrapping an infallible closure as a [`LatentDecoder`].
pub struct FnDecoder<F>(F);

impl<F> FnDecoder<F>
where
    F: Fn(&LatentPoint) -> Value + Send + Sync,
{
    pub fn new(decode: F) -> Self {
        Self(decode)
    }
}

impl<F> LatentDecoder for FnDecoder<F>
where
    F: Fn(&LatentPoint) -> Value + Send + Sync,
{
    fn decode(&self, point: &LatentPoint) -> Result<Value, DynError> {
        Ok((self.0)(point))
    }
}

/// Draws diverse discrete outputs from a single latent point.
///
/// Perturbs the point with independent Gaussian noise per sample, decodes
/// each draw, and flags constraint violations without dropping anything;
/// disposition of invalid candidates is the caller's call.
#[derive(Debug, Clone)]
pub struct CandidateDecoder {
    n_samples: usize,
    noise_scale: f64,
}

impl CandidateDecoder {
    pub fn new(n_samples: usize, noise_scale: f64) -> Self {
        Self {
            n_samples,
            noise_scale,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.n_decode_samples, config.decode_noise_scale)
    }

    /// Decode exactly `n_samples` candidates around `final_point`.
    ///
    /// The first sample always uses the unperturbed point, so a
    /// deterministic baseline candidate is present in every result set.
    pub fn decode_candidates<D, R>(
        &self,
        final_point: &LatentPoint,
        decoder: &D,
        constraints: &[OutputConstraint],
        rng: &mut R,
    ) -> TnResult<Vec<Candidate>>
    where
        D: LatentDecoder + ?Sized,
        R: Rng,
    {
        let normal = Normal::new(0.0, self.noise_scale)
            .map_err(|e| TnError::Internal(format!("invalid decode noise scale: {e}")))?;

        let mut candidates = Vec::with_capacity(self.n_samples);
        for sample in 0..self.n_samples {
            let point = if sample == 0 {
                final_point.clone()
            } else {
                let delta: Vec<f64> = (0..final_point.dim())
                    .map(|_| normal.sample(rng))
                    .collect();
                final_point.translated(&delta)
            };

            let output = decoder
                .decode(&point)
                .map_err(|source| EvaluationFailure::new(EvalStage::Decode, point.clone(), source))?;

            let violated: std::collections::BTreeSet<_> = constraints
                .iter()
                .filter(|c| !c.check(&output))
                .map(|c| c.kind().clone())
                .collect();
            let valid = violated.is_empty();
            if !valid {
                debug!(
                    "Candidate {} violates {} constraint(s)",
                    sample,
                    violated.len()
                );
            }

            candidates.push(Candidate {
                output,
                source: point,
                valid,
                violated,
            });
        }

        debug!(
            "Decoded {} candidates from {} ({} valid)",
            candidates.len(),
            final_point,
            candidates.iter().filter(|c| c.valid).count()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;
    use tn_types::ConstraintKind;

    /// Rounds each coordinate to a discrete step count.
    fn step_decoder() -> FnDecoder<impl Fn(&LatentPoint) -> Value + Send + Sync> {
        FnDecoder::new(|point: &LatentPoint| {
            let steps: Vec<i64> = point.coords().iter().map(|c| (c * 10.0).round() as i64).collect();
            json!({ "steps": steps })
        })
    }

    #[test]
    fn returns_exactly_n_samples() {
        let decoder = CandidateDecoder::new(7, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let candidates = decoder
            .decode_candidates(&LatentPoint::zeros(4), &step_decoder(), &[], &mut rng)
            .unwrap();
        assert_eq!(candidates.len(), 7);
    }

    #[test]
    fn first_candidate_is_the_unperturbed_baseline() {
        let final_point = LatentPoint::new(vec![0.31, -0.62]);
        let decoder = CandidateDecoder::new(3, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let candidates = decoder
            .decode_candidates(&final_point, &step_decoder(), &[], &mut rng)
            .unwrap();
        let direct = step_decoder().decode(&final_point).unwrap();
        assert_eq!(candidates[0].output, direct);
        assert_eq!(candidates[0].source, final_point);
    }

    #[test]
    fn violations_are_flagged_not_dropped() {
        let constraints = vec![
            OutputConstraint::new(ConstraintKind::new("non_negative_steps"), |output| {
                output["steps"]
                    .as_array()
                    .is_some_and(|steps| steps.iter().all(|s| s.as_i64().unwrap_or(-1) >= 0))
            }),
            OutputConstraint::new(ConstraintKind::new("always_fails"), |_| false),
        ];

        let decoder = CandidateDecoder::new(4, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let candidates = decoder
            .decode_candidates(&LatentPoint::zeros(2), &step_decoder(), &constraints, &mut rng)
            .unwrap();

        assert_eq!(candidates.len(), 4);
        for candidate in &candidates {
            assert!(!candidate.valid);
            assert!(candidate
                .violated
                .contains(&ConstraintKind::new("always_fails")));
        }
    }

    #[test]
    fn same_seed_reproduces_the_sample_set() {
        let final_point = LatentPoint::new(vec![1.0, 2.0, 3.0]);
        let decoder = CandidateDecoder::new(5, 0.2);

        let draw = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            decoder
                .decode_candidates(&final_point, &step_decoder(), &[], &mut rng)
                .unwrap()
        };
        assert_eq!(draw(99), draw(99));
    }

    #[test]
    fn decode_failure_carries_the_point() {
        struct Failing;
        impl LatentDecoder for Failing {
            fn decode(&self, _: &LatentPoint) -> Result<Value, DynError> {
                Err("decoder network unreachable".into())
            }
        }

        let decoder = CandidateDecoder::new(2, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = decoder
            .decode_candidates(&LatentPoint::zeros(2), &Failing, &[], &mut rng)
            .unwrap_err();
        match err {
            TnError::Evaluation(failure) => {
                assert_eq!(failure.stage, EvalStage::Decode);
                assert_eq!(failure.point, LatentPoint::zeros(2));
            }
            other => panic!("expected Evaluation, got {other:?}"),
        }
    }
}
