//! # tn-types
//!
//! Core types and data structures for TrueNorth: latent points, run
//! trajectories, engine configuration, decoded candidates, and the shared
//! error taxonomy.

pub mod candidate;
pub mod config;
pub mod errors;
pub mod latent;
pub mod trajectory;

pub use candidate::*;
pub use config::*;
pub use errors::*;
pub use latent::*;
pub use trajectory::*;
