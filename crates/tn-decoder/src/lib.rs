//! # tn-decoder
//!
//! Stochastic decoding for TrueNorth: draws perturbed samples around a
//! final latent point, maps each through a caller-supplied decode function,
//! and checks the resulting discrete outputs against validity constraints.

mod constraints;
mod decoder;

pub use constraints::OutputConstraint;
pub use decoder::{CandidateDecoder, FnDecoder, LatentDecoder};
