//! Validity constraints over decoded outputs.

use std::fmt;

use serde_json::Value;
use tn_types::ConstraintKind;

/// A caller-supplied validity predicate tagged with the constraint it
/// enforces (dose range, categorical feasibility, ...).
pub struct OutputConstraint {
    kind: ConstraintKind,
    predicate: Box<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl OutputConstraint {
    pub fn new(
        kind: ConstraintKind,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            predicate: Box::new(predicate),
        }
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// True when `output` satisfies the constraint.
    pub fn check(&self, output: &Value) -> bool {
        (self.predicate)(output)
    }
}

impl fmt::Debug for OutputConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputConstraint")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
