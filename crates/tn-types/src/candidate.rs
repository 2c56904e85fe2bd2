//! Decoded candidate outputs and their validity tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::latent::LatentPoint;

/// Identifies a validity constraint applied to decoded outputs.
///
/// Constraint vocabularies are caller-defined (dose ranges, categorical
/// feasibility, ...), so the kind is an open tag rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintKind(String);

impl ConstraintKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decoded, constraint-checked discrete output derived from a latent
/// point.
///
/// The output is opaque JSON so the engine does not depend on caller-side
/// output models. Constraint violations are data, not errors: failing
/// candidates are flagged with the violated kinds and never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub output: serde_json::Value,
    /// The (possibly perturbed) latent point the output was decoded from.
    pub source: LatentPoint,
    pub valid: bool,
    pub violated: BTreeSet<ConstraintKind>,
}
