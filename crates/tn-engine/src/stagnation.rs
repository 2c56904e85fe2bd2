//! False-wall detection over the live trajectory.
//!
//! A vanishing gradient alone is consistent with a genuine optimum; the
//! detector also requires a plateaued objective and high model uncertainty
//! before classifying the current point as a false wall worth escaping.

use serde::{Deserialize, Serialize};

use tn_types::{EngineConfig, LatentPoint, Trajectory};

/// Outcome of evaluating the three stagnation criteria at the newest
/// trajectory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagnationAssessment {
    /// Gradient norm below the configured threshold.
    pub gradient_vanished: bool,
    /// Objective within the plateau threshold of its value a full window ago.
    pub plateaued: bool,
    /// Uncertainty above the configured threshold.
    pub uncertainty_high: bool,
}

impl StagnationAssessment {
    /// All three criteria hold: stuck at a spurious stationary point.
    pub fn is_false_wall(&self) -> bool {
        self.gradient_vanished && self.plateaued && self.uncertainty_high
    }

    /// Gradient and objective have settled while the model stays confident:
    /// a genuine optimum rather than a false wall.
    pub fn is_settled(&self) -> bool {
        self.gradient_vanished && self.plateaued && !self.uncertainty_high
    }
}

/// Record of a false-wall detection, handed to the explorer and discarded
/// once the escape attempt resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagnationEvent {
    pub iteration: usize,
    pub point: LatentPoint,
    pub assessment: StagnationAssessment,
}

/// Classifies the optimizer state from recent trajectory history.
///
/// Pure read-only checks; the detector never mutates the trajectory.
#[derive(Debug, Clone)]
pub struct StagnationDetector {
    gradient_threshold: f64,
    plateau_window: usize,
    plateau_threshold: f64,
    uncertainty_threshold: f64,
}

impl StagnationDetector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            gradient_threshold: config.gradient_threshold,
            plateau_window: config.plateau_window,
            plateau_threshold: config.plateau_threshold,
            uncertainty_threshold: config.uncertainty_threshold,
        }
    }

    /// Evaluate the three criteria against the newest record.
    ///
    /// The plateau criterion needs a record a full window back; with fewer
    /// records it is unsatisfied, so early iterations always proceed
    /// normally. `None` only for an empty trajectory.
    pub fn assess(&self, trajectory: &Trajectory) -> Option<StagnationAssessment> {
        let last = trajectory.last()?;
        let plateaued = trajectory
            .look_back(self.plateau_window)
            .map(|earlier| (last.objective - earlier.objective).abs() < self.plateau_threshold)
            .unwrap_or(false);

        Some(StagnationAssessment {
            gradient_vanished: last.gradient_norm < self.gradient_threshold,
            plateaued,
            uncertainty_high: last.uncertainty > self.uncertainty_threshold,
        })
    }

    /// A [`StagnationEvent`] when all three criteria hold at the newest
    /// record.
    pub fn detect(&self, trajectory: &Trajectory) -> Option<StagnationEvent> {
        let assessment = self.assess(trajectory)?;
        if !assessment.is_false_wall() {
            return None;
        }
        let last = trajectory.last()?;
        Some(StagnationEvent {
            iteration: last.iteration,
            point: last.point.clone(),
            assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_types::TrajectoryRecord;

    fn detector() -> StagnationDetector {
        StagnationDetector::from_config(
            &EngineConfig::new()
                .with_stagnation_thresholds(1e-3, 1e-4, 0.5)
                .with_plateau_window(3),
        )
    }

    fn push(t: &mut Trajectory, objective: f64, gradient_norm: f64, uncertainty: f64) {
        t.push(TrajectoryRecord {
            iteration: t.len(),
            point: LatentPoint::zeros(2),
            objective,
            gradient_norm,
            uncertainty,
        });
    }

    /// A trajectory where all three criteria hold at the newest record.
    fn stuck_trajectory() -> Trajectory {
        let mut t = Trajectory::new();
        for _ in 0..4 {
            push(&mut t, 1.0, 1e-5, 0.9);
        }
        t
    }

    #[test]
    fn fires_when_all_criteria_hold() {
        let event = detector().detect(&stuck_trajectory()).unwrap();
        assert_eq!(event.iteration, 3);
        assert!(event.assessment.is_false_wall());
    }

    #[test]
    fn silent_below_window_regardless_of_other_criteria() {
        let mut t = Trajectory::new();
        for _ in 0..3 {
            push(&mut t, 1.0, 1e-5, 0.9);
        }
        // 3 records, window 3: no record a full window back yet.
        assert!(detector().detect(&t).is_none());
    }

    #[test]
    fn silent_when_gradient_is_live() {
        let mut t = stuck_trajectory();
        push(&mut t, 1.0, 0.5, 0.9);
        let assessment = detector().assess(&t).unwrap();
        assert!(!assessment.gradient_vanished);
        assert!(detector().detect(&t).is_none());
    }

    #[test]
    fn silent_when_objective_still_moves() {
        let mut t = Trajectory::new();
        for i in 0..4 {
            push(&mut t, i as f64, 1e-5, 0.9);
        }
        let assessment = detector().assess(&t).unwrap();
        assert!(!assessment.plateaued);
        assert!(detector().detect(&t).is_none());
    }

    #[test]
    fn silent_when_model_is_confident() {
        let mut t = Trajectory::new();
        for _ in 0..4 {
            push(&mut t, 1.0, 1e-5, 0.1);
        }
        let assessment = detector().assess(&t).unwrap();
        assert!(!assessment.uncertainty_high);
        assert!(assessment.is_settled());
        assert!(detector().detect(&t).is_none());
    }

    #[test]
    fn assess_on_empty_trajectory_is_none() {
        assert!(detector().assess(&Trajectory::new()).is_none());
    }
}
