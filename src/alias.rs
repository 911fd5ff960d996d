//! Name-change chain resolution.
//!
//! A scored candidate may be a former identity: renamed, acquired, or merged
//! into another directory entity. Its outbound alias links are walked to the
//! current identity. The walk is bounded by depth and keeps a visited set, so a
//! malformed directory (cycle, dangling target, runaway chain) aborts the walk
//! instead of looping or panicking.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::confidence::aggregate;
use crate::config::ResolverConfig;
use crate::directory::ReferenceDirectory;
use crate::entity::{AliasLink, CanonicalEntity, EntityId, EntityType, LinkKind};
use crate::error::DirectoryIntegrityError;
use crate::normalize::NormalizedName;
use crate::similarity::score_names;

/// One followed alias link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainHop {
    /// Entity the link leaves.
    pub from: EntityId,
    /// Entity the link points at.
    pub to: EntityId,
    /// Former name recorded on the link.
    pub previous_name: String,
    /// Kind of identity change.
    pub kind: LinkKind,
    /// When the change took effect, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    /// How well the link's previous name matched at this hop.
    pub match_score: f64,
}

/// Why a candidate was substituted by a different current identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameChangeEvidence {
    /// Previous name on the first followed link.
    pub previous_name: String,

    /// Canonical name of the terminal entity.
    pub current_name: String,

    /// Kind of the terminal hop.
    pub kind: LinkKind,

    /// Confidence that the terminal entity is the one the query meant.
    pub confidence: f64,

    /// Effective date of the terminal hop, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,

    /// Every followed link, first to last.
    pub hops: Vec<ChainHop>,
}

impl NameChangeEvidence {
    /// Number of links followed.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.hops.len()
    }
}

impl fmt::Display for NameChangeEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.previous_name, self.current_name, self.kind)
    }
}

/// Result of walking a candidate's alias links.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// No link applies; the candidate is its own current identity.
    NoChange,

    /// The candidate resolves to a different current entity.
    Resolved {
        /// The terminal, current entity.
        entity: Arc<CanonicalEntity>,
        /// How the chain got there.
        evidence: NameChangeEvidence,
    },

    /// The directory is malformed along this chain.
    Aborted(DirectoryIntegrityError),
}

fn pair_score(a: &NormalizedName, b: &NormalizedName, entity_type: EntityType, config: &ResolverConfig) -> f64 {
    aggregate(&score_names(a, entity_type, [b]), config)
}

/// Highest-scoring link at or above the threshold.
///
/// Ties go to the later effective date, then to directory order.
fn best_link(
    links: Vec<AliasLink>,
    threshold: f64,
    mut score: impl FnMut(&AliasLink) -> f64,
) -> Option<(AliasLink, f64)> {
    let mut best: Option<(AliasLink, f64)> = None;
    for link in links {
        let s = score(&link);
        if s < threshold {
            continue;
        }
        let better = match &best {
            None => true,
            Some((current, current_score)) => {
                s > *current_score || (s == *current_score && link.effective_date > current.effective_date)
            }
        };
        if better {
            best = Some((link, s));
        }
    }
    best
}

/// Walks `start`'s alias links towards its current identity.
///
/// The first hop applies when the query matches the link's previous name at
/// `name_change_threshold`. Later hops apply when the previous name matches
/// the reached entity's own names or the query.
pub fn resolve_chain<D: ReferenceDirectory + ?Sized>(
    query: &NormalizedName,
    entity_type: EntityType,
    start: &Arc<CanonicalEntity>,
    directory: &D,
    config: &ResolverConfig,
) -> ChainOutcome {
    let threshold = config.name_change_threshold;

    let first = best_link(directory.get_alias_links(start.id), threshold, |link| {
        pair_score(query, &NormalizedName::new(&link.previous_name), entity_type, config)
    });
    let Some((mut link, first_score)) = first else {
        return ChainOutcome::NoChange;
    };

    let mut visited: HashSet<EntityId> = HashSet::from([start.id]);
    let mut hops: Vec<ChainHop> = Vec::new();
    let mut from = start.id;
    let mut score = first_score;

    let terminal = loop {
        if hops.len() >= config.max_alias_chain_depth {
            return ChainOutcome::Aborted(DirectoryIntegrityError::ChainTooDeep {
                start: start.id,
                max_depth: config.max_alias_chain_depth,
            });
        }

        let target = link.current_entity_id;
        if visited.contains(&target) {
            return ChainOutcome::Aborted(DirectoryIntegrityError::AliasCycle {
                start: start.id,
                repeated: target,
            });
        }
        let Some(reached) = directory.get_entity(target) else {
            return ChainOutcome::Aborted(DirectoryIntegrityError::DanglingLink {
                start: start.id,
                from,
                target,
            });
        };

        trace!(from = %from, to = %target, kind = %link.kind, score, "alias hop");
        visited.insert(target);
        hops.push(ChainHop {
            from,
            to: target,
            previous_name: link.previous_name,
            kind: link.kind,
            effective_date: link.effective_date,
            match_score: score,
        });

        let own_names: Vec<NormalizedName> = reached
            .known_names()
            .map(NormalizedName::new)
            .chain(std::iter::once(query.clone()))
            .collect();
        let next = best_link(directory.get_alias_links(reached.id), threshold, |candidate| {
            let previous = NormalizedName::new(&candidate.previous_name);
            own_names
                .iter()
                .map(|name| pair_score(&previous, name, entity_type, config))
                .fold(0.0, f64::max)
        });

        match next {
            Some((next_link, next_score)) => {
                from = reached.id;
                link = next_link;
                score = next_score;
            }
            None => break reached,
        }
    };

    let (Some(first_hop), Some(last_hop)) = (hops.first(), hops.last()) else {
        return ChainOutcome::NoChange;
    };
    let previous_name = first_hop.previous_name.clone();
    let (kind, effective_date) = (last_hop.kind, last_hop.effective_date);
    let evidence = NameChangeEvidence {
        previous_name,
        current_name: terminal.canonical_name.clone(),
        kind,
        confidence: (first_score * config.name_change_discount).clamp(0.0, 1.0),
        effective_date,
        hops,
    };
    ChainOutcome::Resolved {
        entity: terminal,
        evidence,
    }
}
