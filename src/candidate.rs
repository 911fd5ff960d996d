//! Candidate generation.
//!
//! Blocking keys are coarse on purpose: a true match shares at least one token
//! initial with the query under any realistic noise, so it is never pruned.
//! When a block is larger than the candidate cap, a cheap affinity check
//! decides who survives, so the cap never drops an exact or acronym hit.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::directory::ReferenceDirectory;
use crate::entity::{CanonicalEntity, EntityId, EntityType};
use crate::normalize::NormalizedName;
use crate::similarity::{acronym_similarity, candidate_names, token_set_similarity};

/// Cheap closeness of a query to an entity's names, computed before full scoring.
#[derive(Debug, Clone, Copy, Default)]
struct Affinity {
    exact: bool,
    acronym: bool,
    overlap: f64,
}

impl Affinity {
    fn of(query: &NormalizedName, entity: &CanonicalEntity) -> Self {
        candidate_names(entity).iter().fold(Self::default(), |best, name| Self {
            exact: best.exact || name == query,
            acronym: best.acronym || acronym_similarity(query, name) >= 1.0,
            overlap: best.overlap.max(token_set_similarity(query, name)),
        })
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.exact
            .cmp(&other.exact)
            .then(self.acronym.cmp(&other.acronym))
            .then(self.overlap.total_cmp(&other.overlap))
    }
}

/// Collects at most `max_candidates` entities of `entity_type` sharing a
/// blocking key with `query`.
///
/// When more entities share a key than fit, they rank by exact name match,
/// then exact acronym match, then token overlap, then shared key count. Ties
/// break by id so truncation is deterministic.
#[must_use]
pub fn generate<D: ReferenceDirectory + ?Sized>(
    query: &NormalizedName,
    entity_type: EntityType,
    directory: &D,
    max_candidates: usize,
) -> Vec<Arc<CanonicalEntity>> {
    let mut hits: HashMap<EntityId, (Arc<CanonicalEntity>, usize)> = HashMap::new();

    for key in query.blocking_keys(entity_type) {
        let mut seen: HashSet<EntityId> = HashSet::new();
        for entity in directory.list_candidates(entity_type, key) {
            if entity.entity_type != entity_type || !seen.insert(entity.id) {
                continue;
            }
            hits.entry(entity.id).or_insert_with(|| (Arc::clone(&entity), 0)).1 += 1;
        }
    }

    let total = hits.len();
    let truncating = total > max_candidates;
    let mut ranked: Vec<(Arc<CanonicalEntity>, usize, Affinity)> = hits
        .into_values()
        .map(|(entity, count)| {
            let affinity = if truncating { Affinity::of(query, &entity) } else { Affinity::default() };
            (entity, count, affinity)
        })
        .collect();
    ranked.sort_by(|(a, a_hits, a_affinity), (b, b_hits, b_affinity)| {
        b_affinity
            .compare(a_affinity)
            .then_with(|| b_hits.cmp(a_hits))
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(max_candidates);

    trace!(query = %query, total, kept = ranked.len(), "candidate generation");
    ranked.into_iter().map(|(entity, _, _)| entity).collect()
}
