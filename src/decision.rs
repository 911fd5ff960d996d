//! Threshold policy over ranked candidates.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::result::MatchCandidate;

/// Final outcome class of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// One candidate is above threshold and clear of the runner-up.
    Matched,
    /// Two or more candidates are too close to call.
    Ambiguous,
    /// Nothing reached the threshold.
    Unmatched,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Deduplicates by entity id, keeping the most confident entry, then orders by
/// confidence descending and id ascending.
///
/// A former identity that resolved to its successor and the successor itself
/// collapse into one entry here.
#[must_use]
pub fn rank(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut best: HashMap<EntityId, MatchCandidate> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        match best.get(&candidate.entity_id) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            _ => {
                best.insert(candidate.entity_id, candidate);
            }
        }
    }

    let mut ranked: Vec<MatchCandidate> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    ranked
}

/// Applies the threshold policy to an already ranked list.
#[must_use]
pub fn decide(ranked: &[MatchCandidate], match_threshold: f64, tie_margin: f64) -> Decision {
    let Some(top) = ranked.first() else {
        return Decision::Unmatched;
    };
    if top.confidence < match_threshold {
        return Decision::Unmatched;
    }
    match ranked.get(1) {
        Some(second) if top.confidence - second.confidence < tie_margin => Decision::Ambiguous,
        _ => Decision::Matched,
    }
}
