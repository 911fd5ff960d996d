//! Resolution results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::alias::NameChangeEvidence;
use crate::decision::Decision;
use crate::entity::{CanonicalEntity, EntityId, QueryEntity};
use crate::error::DirectoryIntegrityError;
use crate::similarity::MetricScores;

/// One scored directory entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Entity this candidate stands for, after any name-change substitution.
    pub entity_id: EntityId,

    /// Canonical name of that entity.
    pub canonical_name: String,

    /// Per-metric scores of the query against the entity that was scored.
    ///
    /// After a name-change substitution these remain the scores against the
    /// former identity; the evidence explains the substitution.
    pub scores: MetricScores,

    /// Aggregate confidence in [0, 1].
    pub confidence: f64,

    /// Set when this candidate was reached through alias links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_change: Option<NameChangeEvidence>,
}

impl MatchCandidate {
    /// A directly scored candidate.
    #[must_use]
    pub fn new(entity: &CanonicalEntity, scores: MetricScores, confidence: f64) -> Self {
        Self {
            entity_id: entity.id,
            canonical_name: entity.canonical_name.clone(),
            scores,
            confidence: confidence.clamp(0.0, 1.0),
            name_change: None,
        }
    }

    /// Replaces this candidate by the current identity it resolved to.
    #[must_use]
    pub fn resolved_to(self, current: &CanonicalEntity, evidence: NameChangeEvidence) -> Self {
        Self {
            entity_id: current.id,
            canonical_name: current.canonical_name.clone(),
            scores: self.scores,
            confidence: evidence.confidence,
            name_change: Some(evidence),
        }
    }
}

/// Outcome of resolving one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    /// The mention that was resolved.
    pub query: QueryEntity,

    /// Set only when `decision` is `Matched`.
    pub resolved_entity_id: Option<EntityId>,

    /// Canonical name of the resolved entity.
    pub resolved_name: Option<String>,

    /// Confidence of the top-ranked candidate, 0 when there were none.
    pub confidence: f64,

    /// Resolution outcome.
    pub decision: Decision,

    /// Present when the match went through a rename, acquisition or merger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_change: Option<NameChangeEvidence>,

    /// Ranked candidates, best first.
    pub candidates: Vec<MatchCandidate>,

    /// Directory problems met while resolving. Resolution still completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrity_issues: Vec<DirectoryIntegrityError>,

    /// Fingerprint of the directory snapshot the result was produced against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl MappingResult {
    /// True when a human should look at this mapping.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.decision != Decision::Matched || !self.integrity_issues.is_empty()
    }

    /// True when a name-change chain produced the match.
    #[must_use]
    pub fn name_change_detected(&self) -> bool {
        self.name_change.is_some()
    }

    /// One-line description for logs and review queues.
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MappingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.decision, self.query.name)?;
        match (self.decision, &self.resolved_name) {
            (Decision::Matched, Some(name)) => write!(f, " -> {name} ({:.2})", self.confidence)?,
            (Decision::Ambiguous, _) => write!(
                f,
                " between {} candidates (top {:.2})",
                self.candidates.len(),
                self.confidence
            )?,
            _ => write!(f, " (best {:.2})", self.confidence)?,
        }
        if let Some(change) = &self.name_change {
            write!(f, " via {change}")?;
        }
        if !self.integrity_issues.is_empty() {
            write!(f, " [{} directory issue(s)]", self.integrity_issues.len())?;
        }
        Ok(())
    }
}
