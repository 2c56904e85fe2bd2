//! The optimization loop: evaluate, step, detect stagnation, escape.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tn_types::{
    EngineConfig, EvalStage, EvaluationFailure, LatentPoint, TnError, TnResult, Trajectory,
    TrajectoryRecord,
};

use crate::explorer::Explorer;
use crate::gradient::{l2_norm, GradientEstimator};
use crate::objective::{CombinedObjective, LatentObjective};
use crate::pool::EvalPool;
use crate::stagnation::{StagnationDetector, StagnationEvent};

/// Cooperative cancellation handle, checked once per loop turn.
///
/// Cancelling stops the run after the current iteration completes;
/// mid-iteration cancellation is not needed since iterations are short,
/// pure numerical evaluations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Lifecycle state of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Escaping,
    /// Settled at a point no escape candidate improves on.
    Converged,
    /// Iteration budget reached; the result is best-effort, not an error.
    Exhausted,
    /// Stopped by a [`CancelToken`] after the current iteration.
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Cancelled)
    }
}

/// Final report of an optimization run.
///
/// The trajectory is returned whole for downstream diagnostics and
/// visualization; the engine itself emits only numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,
    pub state: RunState,
    pub trajectory: Trajectory,
    pub final_point: LatentPoint,
    /// Base objective score at the final point.
    pub final_objective: f64,
    /// False-wall detections that triggered an exploration.
    pub escape_attempts: usize,
    /// Explorations that found a strictly better point.
    pub escapes: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drives the optimization loop over a caller-supplied objective.
///
/// Construction validates the configuration and refuses to start on any
/// invariant violation. The first run fixes the latent dimensionality;
/// later runs with a different dimension fail per call.
pub struct Optimizer<O> {
    config: EngineConfig,
    objective: O,
    gradient: GradientEstimator,
    detector: StagnationDetector,
    explorer: Explorer,
    pool: EvalPool,
    cancel: CancelToken,
    dim: Option<usize>,
}

impl<O: LatentObjective> Optimizer<O> {
    pub fn new(config: EngineConfig, objective: O) -> TnResult<Self> {
        config.validate()?;
        let pool = EvalPool::new(config.workers)?;
        Ok(Self {
            gradient: GradientEstimator::new(config.fd_step),
            detector: StagnationDetector::from_config(&config),
            explorer: Explorer::from_config(&config),
            pool,
            cancel: CancelToken::new(),
            dim: None,
            config,
            objective,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle the caller can use to stop the run after the current turn.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the loop from `initial` until a terminal state is reached.
    pub fn run(&mut self, initial: LatentPoint) -> TnResult<RunReport> {
        let dim = initial.dim();
        match self.dim {
            Some(expected) if expected != dim => {
                return Err(TnError::DimensionMismatch {
                    expected,
                    actual: dim,
                })
            }
            None => self.dim = Some(dim),
            _ => {}
        }

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let combined = CombinedObjective::new(&self.objective, self.config.exploration_weight);
        let score_fn = |point: &LatentPoint| combined.score(point);

        info!(
            "Starting optimization run {} (dim {}, max {} iterations)",
            id, dim, self.config.max_iterations
        );

        let mut trajectory = Trajectory::new();
        let (objective, uncertainty) = self.evaluate_raw(&initial)?;
        let mut gradient = self.gradient.estimate(&initial, &score_fn, &self.pool)?;
        trajectory.push(TrajectoryRecord {
            iteration: 0,
            point: initial.clone(),
            objective,
            gradient_norm: l2_norm(&gradient),
            uncertainty,
        });

        let mut state = RunState::Running;
        let mut current = initial;
        let mut last_objective = objective;
        let mut escape_attempts = 0usize;
        let mut escapes = 0usize;
        // Live only between detection and the escape turn that consumes it.
        let mut pending_event: Option<StagnationEvent> = None;

        while matches!(state, RunState::Running | RunState::Escaping) {
            if trajectory.len() - 1 >= self.config.max_iterations {
                warn!(
                    "Run {} exhausted its iteration budget ({}) before convergence",
                    id, self.config.max_iterations
                );
                state = RunState::Exhausted;
                break;
            }
            if self.cancel.is_cancelled() {
                info!("Run {} cancelled by caller", id);
                state = RunState::Cancelled;
                break;
            }

            match state {
                RunState::Running => {
                    // Normalized ascent: step size is decoupled from the
                    // gradient magnitude, which shrinks to zero exactly at
                    // the stationary points this engine has to cross.
                    let norm = l2_norm(&gradient);
                    let scale = self.config.learning_rate / (norm + self.config.epsilon);
                    let delta: Vec<f64> = gradient.iter().map(|g| g * scale).collect();
                    let next = current.translated(&delta);

                    let (objective, uncertainty) = self.evaluate_raw(&next)?;
                    gradient = self.gradient.estimate(&next, &score_fn, &self.pool)?;
                    let iteration = trajectory.len();
                    trajectory.push(TrajectoryRecord {
                        iteration,
                        point: next.clone(),
                        objective,
                        gradient_norm: l2_norm(&gradient),
                        uncertainty,
                    });
                    current = next;
                    last_objective = objective;
                    debug!(
                        "Iteration {}: objective {:.6}, gradient norm {:.6}, uncertainty {:.4}",
                        iteration,
                        objective,
                        l2_norm(&gradient),
                        uncertainty
                    );

                    if let Some(assessment) = self.detector.assess(&trajectory) {
                        if let Some(event) = self.detector.detect(&trajectory) {
                            info!(
                                "False wall detected at iteration {}; switching to escape",
                                event.iteration
                            );
                            pending_event = Some(event);
                            state = RunState::Escaping;
                        } else if assessment.is_settled() {
                            info!(
                                "Run {} converged at iteration {} (objective {:.6})",
                                id, iteration, objective
                            );
                            state = RunState::Converged;
                        }
                    }
                }
                RunState::Escaping => {
                    escape_attempts += 1;
                    let stuck = match pending_event.take() {
                        Some(event) => event.point,
                        None => current.clone(),
                    };
                    let current_score = score_fn(&stuck)?;
                    let proposal =
                        self.explorer
                            .propose(&stuck, &score_fn, &self.pool, &mut rng)?;

                    match proposal {
                        Some(p) if p.score > current_score + self.config.escape_tolerance => {
                            let (objective, uncertainty) = self.evaluate_raw(&p.point)?;
                            gradient = self.gradient.estimate(&p.point, &score_fn, &self.pool)?;
                            let iteration = trajectory.len();
                            trajectory.push(TrajectoryRecord {
                                iteration,
                                point: p.point.clone(),
                                objective,
                                gradient_norm: l2_norm(&gradient),
                                uncertainty,
                            });
                            info!(
                                "Escaped at iteration {}: combined score {:.6} -> {:.6}",
                                iteration, current_score, p.score
                            );
                            current = p.point;
                            last_objective = objective;
                            escapes += 1;
                            state = RunState::Running;
                        }
                        _ => {
                            info!(
                                "Run {} converged: no escape candidate improves on the current point",
                                id
                            );
                            state = RunState::Converged;
                        }
                    }
                }
                _ => unreachable!("loop only runs in non-terminal states"),
            }
        }

        let finished_at = Utc::now();
        info!(
            "Run {} finished in state {:?} after {} iterations ({} escapes from {} attempts)",
            id,
            state,
            trajectory.len() - 1,
            escapes,
            escape_attempts
        );

        Ok(RunReport {
            id,
            state,
            trajectory,
            final_point: current,
            final_objective: last_objective,
            escape_attempts,
            escapes,
            started_at,
            finished_at,
        })
    }

    /// Base objective and uncertainty at `point`, with caller failures
    /// wrapped and the offending point attached.
    fn evaluate_raw(&self, point: &LatentPoint) -> TnResult<(f64, f64)> {
        let objective = self
            .objective
            .evaluate(point)
            .map_err(|source| EvaluationFailure::new(EvalStage::Objective, point.clone(), source))?;
        let uncertainty = self.objective.uncertainty(point).map_err(|source| {
            EvaluationFailure::new(EvalStage::Uncertainty, point.clone(), source)
        })?;
        Ok((objective, uncertainty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::FnObjective;
    use tn_types::ConfigError;

    fn flat_objective() -> FnObjective<
        impl Fn(&LatentPoint) -> f64 + Send + Sync,
        impl Fn(&LatentPoint) -> f64 + Send + Sync,
    > {
        FnObjective::new(|_: &LatentPoint| 0.0, |_: &LatentPoint| 0.0)
    }

    #[test]
    fn invalid_config_refuses_to_construct() {
        let config = EngineConfig::new().with_learning_rate(-1.0);
        match Optimizer::new(config, flat_objective()) {
            Err(TnError::Config(ConfigError::NonPositive { name, .. })) => {
                assert_eq!(name, "learning_rate")
            }
            other => panic!("expected Config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn dimension_is_fixed_by_the_first_run() {
        let config = EngineConfig::new().with_max_iterations(1).with_seed(5);
        let mut optimizer = Optimizer::new(config, flat_objective()).unwrap();

        optimizer.run(LatentPoint::zeros(3)).unwrap();
        let err = optimizer.run(LatentPoint::zeros(2)).unwrap_err();
        match err {
            TnError::DimensionMismatch { expected, actual } => {
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn pre_cancelled_run_stops_before_stepping() {
        let config = EngineConfig::new().with_seed(5);
        let mut optimizer = Optimizer::new(config, flat_objective()).unwrap();
        optimizer.cancel_token().cancel();

        let report = optimizer.run(LatentPoint::zeros(2)).unwrap();
        assert_eq!(report.state, RunState::Cancelled);
        // Only the initial record was taken.
        assert_eq!(report.trajectory.len(), 1);
        assert_eq!(report.final_point, LatentPoint::zeros(2));
    }

    #[test]
    fn run_state_terminal_classification() {
        assert!(!RunState::Running.is_terminal());
        assert!(!RunState::Escaping.is_terminal());
        assert!(RunState::Converged.is_terminal());
        assert!(RunState::Exhausted.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
    }
}
