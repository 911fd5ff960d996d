//! Multi-metric similarity scoring.
//!
//! Each metric targets one noise class and is a pure function of two
//! normalized names. A candidate is scored against every name it is known by
//! and each metric reports its best value.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{CanonicalEntity, EntityType};
use crate::normalize::NormalizedName;

/// Score given to a non-exact acronym correspondence, scaled by how close the
/// letters are. Kept well below the clamp threshold so a near-miss acronym
/// never overrides the other metrics.
const PARTIAL_ACRONYM_WEIGHT: f64 = 0.5;

/// Ceiling on a non-exact alias comparison. Only an exact alias hit may reach
/// the clamp threshold; a shared prefix alone never does.
const NEAR_ALIAS_WEIGHT: f64 = 0.8;

/// Factor applied to every metric when two names carry different numbers.
/// "Globe Freight Lines 12" and "... 13" are different branches, and
/// "BOL-2024-000123" and "...124" different shipments.
const NUMBER_CONFLICT_PENALTY: f64 = 0.5;

/// A similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Order-insensitive token overlap.
    TokenSet,
    /// Levenshtein similarity normalized by the longer string.
    EditDistance,
    /// Acronym correspondence in either direction.
    Acronym,
    /// Direct string comparison against every known alias.
    AliasString,
}

impl Metric {
    /// Every metric, in declaration order.
    pub const ALL: [Self; 4] = [Self::TokenSet, Self::EditDistance, Self::Acronym, Self::AliasString];

    /// Stable snake_case name, as used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TokenSet => "token_set",
            Self::EditDistance => "edit_distance",
            Self::Acronym => "acronym",
            Self::AliasString => "alias_string",
        }
    }

    /// Parses a configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Metrics that make sense for mentions of the given type.
    #[must_use]
    pub fn for_entity_type(entity_type: EntityType) -> &'static [Self] {
        match entity_type {
            EntityType::Company | EntityType::Other => &Self::ALL,
            EntityType::Person | EntityType::Location => {
                &[Self::TokenSet, Self::EditDistance, Self::AliasString]
            }
            // Token order carries meaning in reference numbers.
            EntityType::ShipmentReference => &[Self::EditDistance, Self::AliasString],
        }
    }

    /// Computes this metric for one pair of names.
    #[must_use]
    pub fn compute(&self, a: &NormalizedName, b: &NormalizedName) -> f64 {
        match self {
            Self::TokenSet => token_set_similarity(a, b),
            Self::EditDistance => edit_similarity(a, b),
            Self::Acronym => acronym_similarity(a, b),
            Self::AliasString => alias_string_similarity(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric name to score in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricScores(BTreeMap<Metric, f64>);

impl MetricScores {
    /// Creates an empty score set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a score, clamped to [0, 1]. Non-finite scores record as 0.
    pub fn insert(&mut self, metric: Metric, score: f64) {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        self.0.insert(metric, score);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, metric: Metric, score: f64) -> Self {
        self.insert(metric, score);
        self
    }

    /// Score of a metric, if it was computed.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    /// Iterates scores in metric order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(m, s)| (*m, *s))
    }

    /// Highest-scoring metric. Earlier metrics win ties.
    #[must_use]
    pub fn best(&self) -> Option<(Metric, f64)> {
        self.iter()
            .fold(None, |best: Option<(Metric, f64)>, (m, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((m, s)),
            })
    }

    /// Number of metrics scored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no metric was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Dice coefficient over distinct tokens.
#[must_use]
pub fn token_set_similarity(a: &NormalizedName, b: &NormalizedName) -> f64 {
    if a == b {
        return 1.0;
    }
    let left = a.token_set();
    let right = b.token_set();
    let total = left.len() + right.len();
    if total == 0 {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    #[allow(clippy::cast_precision_loss)]
    let score = (2 * shared) as f64 / total as f64;
    score
}

/// Levenshtein similarity, length-invariant.
#[must_use]
pub fn edit_similarity(a: &NormalizedName, b: &NormalizedName) -> f64 {
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a.as_str(), b.as_str())
}

/// Acronym correspondence checked in both directions.
#[must_use]
pub fn acronym_similarity(a: &NormalizedName, b: &NormalizedName) -> f64 {
    if a == b {
        return 1.0;
    }
    one_way_acronym(a, b).max(one_way_acronym(b, a))
}

fn one_way_acronym(short: &NormalizedName, long: &NormalizedName) -> f64 {
    let Some(form) = short.acronym_form() else {
        return 0.0;
    };
    long.derived_acronyms()
        .iter()
        .map(|derived| {
            if *derived == form {
                1.0
            } else {
                PARTIAL_ACRONYM_WEIGHT * strsim::normalized_levenshtein(&form, derived)
            }
        })
        .fold(0.0, f64::max)
}

/// Direct comparison against an alias.
///
/// An exact normalized match scores 1.0. Anything else gets a prefix-weighted
/// Jaro-Winkler score capped at [`NEAR_ALIAS_WEIGHT`], suited to truncated or
/// shortened aliases.
#[must_use]
pub fn alias_string_similarity(a: &NormalizedName, b: &NormalizedName) -> f64 {
    if a == b {
        return 1.0;
    }
    NEAR_ALIAS_WEIGHT * strsim::jaro_winkler(a.as_str(), b.as_str())
}

/// True when both names carry all-digit tokens and those tokens differ.
///
/// A name without numbers never conflicts, so "Globe Freight Lines" still
/// compares freely against "Globe Freight Lines 12".
#[must_use]
pub fn numbers_conflict(a: &NormalizedName, b: &NormalizedName) -> bool {
    let numbers = |name: &NormalizedName| -> BTreeSet<String> {
        name.tokens()
            .iter()
            .filter(|t| t.chars().all(char::is_numeric))
            .cloned()
            .collect()
    };
    let left = numbers(a);
    let right = numbers(b);
    !left.is_empty() && !right.is_empty() && left != right
}

/// Scores a query against a set of names, keeping each metric's maximum.
///
/// A name whose numbers conflict with the query's scores at
/// [`NUMBER_CONFLICT_PENALTY`] of its raw value on every metric.
#[must_use]
pub fn score_names<'a>(
    query: &NormalizedName,
    entity_type: EntityType,
    names: impl IntoIterator<Item = &'a NormalizedName>,
) -> MetricScores {
    let metrics = Metric::for_entity_type(entity_type);
    let mut best = [0.0f64; Metric::ALL.len()];
    for name in names {
        let factor = if numbers_conflict(query, name) { NUMBER_CONFLICT_PENALTY } else { 1.0 };
        for (slot, metric) in metrics.iter().enumerate() {
            best[slot] = best[slot].max(factor * metric.compute(query, name));
        }
    }

    let mut scores = MetricScores::new();
    for (slot, metric) in metrics.iter().enumerate() {
        scores.insert(*metric, best[slot]);
    }
    scores
}

/// Every name a directory record can be mentioned by: canonical name, aliases,
/// and the former names recorded on its outbound alias links.
#[must_use]
pub fn candidate_names(entity: &CanonicalEntity) -> Vec<NormalizedName> {
    let mut names: Vec<NormalizedName> = entity.known_names().map(NormalizedName::new).collect();
    for link in &entity.alias_links {
        let former = NormalizedName::new(&link.previous_name);
        if !names.contains(&former) {
            names.push(former);
        }
    }
    names
}

/// Scores a query against one directory record.
#[must_use]
pub fn score_candidate(query: &NormalizedName, entity_type: EntityType, entity: &CanonicalEntity) -> MetricScores {
    score_names(query, entity_type, &candidate_names(entity))
}
