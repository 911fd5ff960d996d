//! In-memory directory snapshot.
//!
//! The index is built once per snapshot and never mutated afterwards. Reloads
//! go through [`DirectoryHandle`], which swaps whole snapshots behind an
//! `RwLock<Arc<_>>` so readers keep whatever snapshot they already hold.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::directory::document::DirectoryDocument;
use crate::directory::traits::ReferenceDirectory;
use crate::entity::{AliasLink, CanonicalEntity, EntityId, EntityType};
use crate::error::{DirectoryError, DirectoryIntegrityError};
use crate::normalize::BlockingKey;
use crate::similarity::candidate_names;

const FIELD_SEPARATOR: &[u8] = &[0x1f];

fn lock_err(context: &'static str) -> DirectoryError {
    DirectoryError::Poisoned { context }
}

fn index_keys(entity: &CanonicalEntity) -> BTreeSet<BlockingKey> {
    candidate_names(entity)
        .iter()
        .flat_map(|name| name.blocking_keys(entity.entity_type))
        .collect()
}

fn fingerprint(by_id: &HashMap<EntityId, Arc<CanonicalEntity>>) -> String {
    let mut ids: Vec<&EntityId> = by_id.keys().collect();
    ids.sort();

    let mut hasher = blake3::Hasher::new();
    for id in ids {
        let Some(entity) = by_id.get(id) else { continue };
        hasher.update(entity.id.as_uuid().as_bytes());
        hasher.update(entity.canonical_name.as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(entity.entity_type.as_str().as_bytes());
        hasher.update(FIELD_SEPARATOR);
        for alias in &entity.aliases {
            hasher.update(alias.as_bytes());
            hasher.update(FIELD_SEPARATOR);
        }
        for link in &entity.alias_links {
            hasher.update(link.previous_name.as_bytes());
            hasher.update(FIELD_SEPARATOR);
            hasher.update(link.current_entity_id.as_uuid().as_bytes());
            hasher.update(link.kind.to_string().as_bytes());
            if let Some(date) = link.effective_date {
                hasher.update(date.to_string().as_bytes());
            }
            hasher.update(FIELD_SEPARATOR);
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Immutable, indexed directory snapshot.
#[derive(Debug)]
pub struct InMemoryDirectory {
    by_id: HashMap<EntityId, Arc<CanonicalEntity>>,
    blocks: HashMap<(EntityType, BlockingKey), Vec<EntityId>>,
    fingerprint: String,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        let by_id = HashMap::new();
        let fingerprint = fingerprint(&by_id);
        Self {
            by_id,
            blocks: HashMap::new(),
            fingerprint,
        }
    }
}

impl InMemoryDirectory {
    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot and its blocking index.
    ///
    /// # Errors
    ///
    /// - `DuplicateEntity` if two records share an id
    /// - `EmptyCanonicalName` if a record has a blank canonical name
    pub fn build(entities: impl IntoIterator<Item = CanonicalEntity>) -> Result<Self, DirectoryError> {
        let mut by_id: HashMap<EntityId, Arc<CanonicalEntity>> = HashMap::new();
        let mut blocks: HashMap<(EntityType, BlockingKey), Vec<EntityId>> = HashMap::new();

        for entity in entities {
            if entity.canonical_name.trim().is_empty() {
                return Err(DirectoryError::EmptyCanonicalName { id: entity.id });
            }
            if by_id.contains_key(&entity.id) {
                return Err(DirectoryError::DuplicateEntity { id: entity.id });
            }
            for key in index_keys(&entity) {
                blocks.entry((entity.entity_type, key)).or_default().push(entity.id);
            }
            by_id.insert(entity.id, Arc::new(entity));
        }

        for ids in blocks.values_mut() {
            ids.sort();
            ids.dedup();
        }

        let fingerprint = fingerprint(&by_id);
        Ok(Self {
            by_id,
            blocks,
            fingerprint,
        })
    }

    /// Builds a snapshot from a parsed directory document.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn from_document(document: DirectoryDocument) -> Result<Self, DirectoryError> {
        let directory = Self::build(document.into_entities())?;
        for issue in directory.audit() {
            warn!(%issue, "directory integrity problem in loaded document");
        }
        info!(
            entities = directory.len(),
            fingerprint = %directory.fingerprint,
            "directory snapshot built"
        );
        Ok(directory)
    }

    /// Parses and builds a snapshot from JSON text.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, otherwise as [`build`](Self::build).
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        Self::from_document(DirectoryDocument::from_json_str(json)?)
    }

    /// Reads, parses and builds a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`from_json_str`](Self::from_json_str).
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, DirectoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_document(DirectoryDocument::from_reader(std::io::BufReader::new(file))?)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// blake3 digest over every record, stable across builds of the same data.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All entities, ordered by id.
    #[must_use]
    pub fn entities(&self) -> Vec<Arc<CanonicalEntity>> {
        let mut all: Vec<Arc<CanonicalEntity>> = self.by_id.values().cloned().collect();
        all.sort_by_key(|e| e.id);
        all
    }

    /// Scans every alias link for dangling targets and cycles.
    ///
    /// Resolution detects these lazily on the paths it walks; this is the
    /// whole-directory report for the maintainer.
    #[must_use]
    pub fn audit(&self) -> Vec<DirectoryIntegrityError> {
        let mut ids: Vec<EntityId> = self.by_id.keys().copied().collect();
        ids.sort();

        let mut issues = Vec::new();
        for id in &ids {
            for link in self.links_of(*id) {
                if !self.by_id.contains_key(&link.current_entity_id) {
                    issues.push(DirectoryIntegrityError::DanglingLink {
                        start: *id,
                        from: *id,
                        target: link.current_entity_id,
                    });
                }
            }
        }
        issues.extend(self.find_cycles(&ids));
        issues
    }

    fn links_of(&self, id: EntityId) -> &[AliasLink] {
        self.by_id.get(&id).map(|e| e.alias_links.as_slice()).unwrap_or(&[])
    }

    fn find_cycles(&self, ids: &[EntityId]) -> Vec<DirectoryIntegrityError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<EntityId, Mark> = HashMap::new();
        let mut issues = Vec::new();

        for &root in ids {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Active);
            let mut stack: Vec<(EntityId, usize)> = vec![(root, 0)];

            while let Some(&(id, idx)) = stack.last() {
                let links = self.links_of(id);
                let Some(link) = links.get(idx) else {
                    marks.insert(id, Mark::Done);
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                let target = link.current_entity_id;
                match marks.get(&target) {
                    Some(Mark::Active) => issues.push(DirectoryIntegrityError::AliasCycle {
                        start: root,
                        repeated: target,
                    }),
                    Some(Mark::Done) => {}
                    None if self.by_id.contains_key(&target) => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, 0));
                    }
                    // Dangling targets are reported by `audit` directly.
                    None => {}
                }
            }
        }
        issues
    }
}

impl ReferenceDirectory for InMemoryDirectory {
    fn list_candidates(&self, entity_type: EntityType, key: BlockingKey) -> Vec<Arc<CanonicalEntity>> {
        self.blocks
            .get(&(entity_type, key))
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn get_alias_links(&self, id: EntityId) -> Vec<AliasLink> {
        self.links_of(id).to_vec()
    }

    fn get_entity(&self, id: EntityId) -> Option<Arc<CanonicalEntity>> {
        self.by_id.get(&id).cloned()
    }

    fn snapshot_fingerprint(&self) -> Option<String> {
        Some(self.fingerprint.clone())
    }
}

/// Swappable holder of the current snapshot.
///
/// Resolutions take a snapshot up front and keep it; `replace` never affects
/// a snapshot that is already out.
#[derive(Debug)]
pub struct DirectoryHandle {
    current: RwLock<Arc<InMemoryDirectory>>,
}

impl DirectoryHandle {
    /// Wraps an initial snapshot.
    #[must_use]
    pub fn new(directory: InMemoryDirectory) -> Self {
        Self {
            current: RwLock::new(Arc::new(directory)),
        }
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// `Poisoned` if a writer panicked while holding the lock.
    pub fn snapshot(&self) -> Result<Arc<InMemoryDirectory>, DirectoryError> {
        let guard = self.current.read().map_err(|_| lock_err("directory.snapshot"))?;
        Ok(Arc::clone(&guard))
    }

    /// Installs a new snapshot and returns the one it replaced.
    ///
    /// # Errors
    ///
    /// `Poisoned` if a writer panicked while holding the lock.
    pub fn replace(&self, directory: InMemoryDirectory) -> Result<Arc<InMemoryDirectory>, DirectoryError> {
        let next = Arc::new(directory);
        let mut guard = self.current.write().map_err(|_| lock_err("directory.replace"))?;
        let previous = std::mem::replace(&mut *guard, Arc::clone(&next));
        drop(guard);
        info!(
            previous = %previous.fingerprint(),
            current = %next.fingerprint(),
            entities = next.len(),
            "directory snapshot replaced"
        );
        Ok(previous)
    }
}
