//! Resolution entry points.
//!
//! One resolution is a pure function of (query, directory snapshot, config).
//! Batches fan out over scoped worker threads fed by a crossbeam channel and
//! come back in input order.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, debug_span, warn};

use crate::alias::{resolve_chain, ChainOutcome};
use crate::candidate;
use crate::confidence::aggregate;
use crate::config::ResolverConfig;
use crate::decision::{decide, rank, Decision};
use crate::directory::{InMemoryDirectory, ReferenceDirectory};
use crate::entity::QueryEntity;
use crate::error::{DirectoryIntegrityError, ResolveError, ResolveResult};
use crate::normalize::NormalizedName;
use crate::result::{MappingResult, MatchCandidate};
use crate::similarity::score_candidate;

type BatchReply = (usize, ResolveResult<MappingResult>);

/// Resolves one extracted mention against a directory snapshot.
///
/// # Errors
///
/// - `ResolveError::Config` if `config` fails validation
/// - `ResolveError::Input` for an empty or oversized name
///
/// Directory integrity problems are not errors; they are reported on the
/// result and in the log.
pub fn resolve<D: ReferenceDirectory + ?Sized>(
    query: &QueryEntity,
    directory: &D,
    config: &ResolverConfig,
) -> ResolveResult<MappingResult> {
    config.validate()?;
    resolve_validated(query, directory, config)
}

/// Resolves many mentions, preserving input order.
///
/// The outer error is reserved for configuration problems, which fail the
/// whole batch before any work starts. Each query then succeeds or fails on
/// its own.
///
/// # Errors
///
/// `ResolveError::Config` if `config` fails validation.
pub fn resolve_batch<D: ReferenceDirectory + ?Sized>(
    queries: &[QueryEntity],
    directory: &D,
    config: &ResolverConfig,
) -> ResolveResult<Vec<ResolveResult<MappingResult>>> {
    config.validate()?;
    if queries.is_empty() {
        return Ok(Vec::new());
    }

    let (job_tx, job_rx) = bounded::<usize>(queries.len());
    for idx in 0..queries.len() {
        job_tx
            .send(idx)
            .map_err(|_| ResolveError::internal("batch job queue closed before dispatch"))?;
    }
    drop(job_tx);

    let (reply_tx, reply_rx) = unbounded::<BatchReply>();
    let workers = config.batch_workers.min(queries.len());

    let drain = |jobs: Receiver<usize>, replies: Sender<BatchReply>| {
        for idx in jobs.iter() {
            let Some(query) = queries.get(idx) else { continue };
            if replies.send((idx, resolve_validated(query, directory, config))).is_err() {
                break;
            }
        }
    };

    thread::scope(|scope| {
        // The calling thread is one of the workers.
        for worker in 1..workers {
            let jobs = job_rx.clone();
            let replies = reply_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("entity-mapper-batch-{worker}"))
                .spawn_scoped(scope, move || drain(jobs, replies));
            if let Err(e) = spawned {
                warn!(worker, error = %e, "failed to spawn batch worker");
            }
        }
        drain(job_rx, reply_tx);
    });

    let mut slots: Vec<Option<ResolveResult<MappingResult>>> = (0..queries.len()).map(|_| None).collect();
    for (idx, result) in reply_rx.try_iter() {
        if let Some(slot) = slots.get_mut(idx) {
            *slot = Some(result);
        }
    }

    Ok(slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.unwrap_or_else(|| Err(ResolveError::internal(format!("no result for batch entry {idx}")))))
        .collect())
}

fn resolve_validated<D: ReferenceDirectory + ?Sized>(
    query: &QueryEntity,
    directory: &D,
    config: &ResolverConfig,
) -> ResolveResult<MappingResult> {
    query.validate()?;

    let span = debug_span!("resolve", name = %query.name, entity_type = %query.entity_type);
    let _enter = span.enter();

    let normalized = NormalizedName::new(&query.name);
    let entities = candidate::generate(&normalized, query.entity_type, directory, config.max_candidates);

    let mut integrity_issues: Vec<DirectoryIntegrityError> = Vec::new();
    let mut candidates: Vec<MatchCandidate> = Vec::with_capacity(entities.len());

    for entity in &entities {
        let scores = score_candidate(&normalized, query.entity_type, entity);
        let confidence = aggregate(&scores, config);
        let direct = MatchCandidate::new(entity, scores, confidence);

        match resolve_chain(&normalized, query.entity_type, entity, directory, config) {
            ChainOutcome::NoChange => candidates.push(direct),
            ChainOutcome::Resolved { entity: current, evidence } => {
                debug!(from = %entity.id, to = %current.id, %evidence, "name change followed");
                candidates.push(direct.resolved_to(&current, evidence));
            }
            ChainOutcome::Aborted(issue) => {
                warn!(%issue, candidate = %entity.id, "alias chain aborted; keeping pre-chain candidate");
                if !integrity_issues.contains(&issue) {
                    integrity_issues.push(issue);
                }
                candidates.push(direct);
            }
        }
    }

    let mut ranked = rank(candidates);
    let decision = decide(&ranked, config.match_threshold, config.tie_margin);
    let confidence = ranked.first().map_or(0.0, |top| top.confidence);

    let (resolved_entity_id, resolved_name, name_change) = match (decision, ranked.first()) {
        (Decision::Matched, Some(top)) => (
            Some(top.entity_id),
            Some(top.canonical_name.clone()),
            top.name_change.clone(),
        ),
        _ => (None, None, None),
    };
    ranked.truncate(config.max_reported_candidates);

    debug!(
        candidates = entities.len(),
        %decision,
        confidence,
        issues = integrity_issues.len(),
        "resolution complete"
    );

    Ok(MappingResult {
        query: query.clone(),
        resolved_entity_id,
        resolved_name,
        confidence,
        decision,
        name_change,
        candidates: ranked,
        integrity_issues,
        snapshot: directory.snapshot_fingerprint(),
    })
}

/// A directory snapshot paired with a validated configuration.
///
/// # Examples
///
/// ```
/// use entity_mapper::{CanonicalEntity, Decision, EntityMapper, EntityType, InMemoryDirectory, QueryEntity, ResolverConfig};
///
/// let directory = InMemoryDirectory::build(vec![
///     CanonicalEntity::new("Acme Trucking Company", EntityType::Company),
/// ])
/// .unwrap();
/// let mapper = EntityMapper::new(directory, ResolverConfig::default()).unwrap();
///
/// let result = mapper.resolve(&QueryEntity::company("Acme Trucking Co")).unwrap();
/// assert_eq!(result.decision, Decision::Matched);
/// ```
#[derive(Debug)]
pub struct EntityMapper<D: ReferenceDirectory + ?Sized = InMemoryDirectory> {
    directory: Arc<D>,
    config: ResolverConfig,
}

impl<D: ReferenceDirectory> EntityMapper<D> {
    /// Takes ownership of a snapshot.
    ///
    /// # Errors
    ///
    /// `ResolveError::Config` if `config` fails validation.
    pub fn new(directory: D, config: ResolverConfig) -> ResolveResult<Self> {
        Self::from_shared(Arc::new(directory), config)
    }
}

impl<D: ReferenceDirectory + ?Sized> EntityMapper<D> {
    /// Shares an existing snapshot, e.g. one taken from a `DirectoryHandle`.
    ///
    /// # Errors
    ///
    /// `ResolveError::Config` if `config` fails validation.
    pub fn from_shared(directory: Arc<D>, config: ResolverConfig) -> ResolveResult<Self> {
        config.validate()?;
        Ok(Self { directory, config })
    }

    /// The snapshot this mapper resolves against.
    #[must_use]
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Settings applied to every call.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves one mention.
    ///
    /// # Errors
    ///
    /// `ResolveError::Input` for an empty or oversized name.
    pub fn resolve(&self, query: &QueryEntity) -> ResolveResult<MappingResult> {
        resolve_validated(query, &*self.directory, &self.config)
    }

    /// Resolves many mentions, preserving input order.
    ///
    /// # Errors
    ///
    /// Only internal failures; per-query errors are in the returned vector.
    pub fn resolve_batch(&self, queries: &[QueryEntity]) -> ResolveResult<Vec<ResolveResult<MappingResult>>> {
        resolve_batch(queries, &*self.directory, &self.config)
    }
}
