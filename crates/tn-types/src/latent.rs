//! Latent-space point representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable point in the engine's continuous latent space.
///
/// Dimensionality is fixed when the point is created; every optimizer
/// iteration produces a new `LatentPoint` rather than mutating one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentPoint {
    coords: Vec<f64>,
}

impl LatentPoint {
    pub fn new(coords: Vec<f64>) -> Self {
        Self { coords }
    }

    /// The origin of a `dim`-dimensional latent space.
    pub fn zeros(dim: usize) -> Self {
        Self {
            coords: vec![0.0; dim],
        }
    }

    /// Dimensionality of the point.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// New point displaced by `delta` along a single coordinate axis.
    pub fn axis_offset(&self, axis: usize, delta: f64) -> Self {
        debug_assert!(axis < self.coords.len());
        let mut coords = self.coords.clone();
        coords[axis] += delta;
        Self { coords }
    }

    /// New point translated by a full delta vector of the same dimension.
    pub fn translated(&self, delta: &[f64]) -> Self {
        debug_assert_eq!(delta.len(), self.coords.len());
        let coords = self
            .coords
            .iter()
            .zip(delta.iter())
            .map(|(c, d)| c + d)
            .collect();
        Self { coords }
    }

    /// Euclidean norm of the point seen as a vector.
    pub fn l2_norm(&self) -> f64 {
        self.coords.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &LatentPoint) -> f64 {
        debug_assert_eq!(self.dim(), other.dim());
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f64>> for LatentPoint {
    fn from(coords: Vec<f64>) -> Self {
        Self::new(coords)
    }
}

impl fmt::Display for LatentPoint {
    /// Compact rendering for logs; long vectors are truncated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 6;
        write!(f, "[")?;
        for (i, c) in self.coords.iter().take(SHOWN).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c:.4}")?;
        }
        if self.coords.len() > SHOWN {
            write!(f, ", .. {} more", self.coords.len() - SHOWN)?;
        }
        write!(f, "]")
    }
}
