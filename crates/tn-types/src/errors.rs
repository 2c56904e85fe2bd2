//! Error taxonomy shared across the TrueNorth crates.

use std::fmt;
use thiserror::Error;

use crate::latent::LatentPoint;

/// Boxed error type accepted from caller-supplied objective and decode
/// functions.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the TrueNorth engine.
#[derive(Error, Debug)]
pub enum TnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Evaluation failure: {0}")]
    Evaluation(#[from] EvaluationFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration invariant violations, raised at construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be at least 1, got {value}")]
    CountTooSmall { name: &'static str, value: usize },
}

/// Which caller-supplied function failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalStage {
    Objective,
    Uncertainty,
    Decode,
}

impl fmt::Display for EvalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Objective => write!(f, "objective"),
            Self::Uncertainty => write!(f, "uncertainty"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// A caller-supplied function failed.
///
/// The engine does not retry these; the offending point is attached for
/// diagnostics and the source error is preserved.
#[derive(Error, Debug)]
#[error("{stage} evaluation failed at {point}: {source}")]
pub struct EvaluationFailure {
    pub stage: EvalStage,
    pub point: LatentPoint,
    #[source]
    pub source: DynError,
}

impl EvaluationFailure {
    pub fn new(stage: EvalStage, point: LatentPoint, source: DynError) -> Self {
        Self {
            stage,
            point,
            source,
        }
    }
}

/// Result type alias for TrueNorth operations.
pub type TnResult<T> = Result<T, TnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_failure_display_includes_stage_and_point() {
        let failure = EvaluationFailure::new(
            EvalStage::Decode,
            LatentPoint::new(vec![1.0, 2.0]),
            "model unavailable".into(),
        );
        let rendered = failure.to_string();
        assert!(rendered.contains("decode"));
        assert!(rendered.contains("1.0000"));
        assert!(rendered.contains("model unavailable"));
    }

    #[test]
    fn config_error_converts_into_engine_error() {
        let err: TnError = ConfigError::CountTooSmall {
            name: "plateau_window",
            value: 0,
        }
        .into();
        match err {
            TnError::Config(_) => {}
            other => panic!("expected Config, got {other:?}"),
        }
    }
}
