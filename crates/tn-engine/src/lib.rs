//! # tn-engine
//!
//! Latent-space optimization loop for TrueNorth: finite-difference gradient
//! ascent over a caller-supplied objective, false-wall (spurious stationary
//! point) detection, systematic-plus-stochastic escape exploration, and a
//! bounded evaluation pool.

mod explorer;
mod gradient;
mod objective;
mod optimizer;
mod pool;
mod stagnation;

pub use explorer::{EscapeProposal, Explorer};
pub use gradient::{l2_norm, GradientEstimator};
pub use objective::{CombinedObjective, FnObjective, LatentObjective};
pub use optimizer::{CancelToken, Optimizer, RunReport, RunState};
pub use pool::EvalPool;
pub use stagnation::{StagnationAssessment, StagnationDetector, StagnationEvent};
