//! The contract the resolver consumes from the directory collaborator.

use std::sync::Arc;

use crate::entity::{AliasLink, CanonicalEntity, EntityId, EntityType};
use crate::normalize::BlockingKey;

/// Read-only view of the canonical directory.
///
/// Implementations must behave as an immutable snapshot for the lifetime of
/// the borrow: every call during one resolution sees the same data. Lookups are
/// infallible because any I/O happens before the snapshot is handed over.
pub trait ReferenceDirectory: Send + Sync {
    /// Entities of `entity_type` indexed under `key`. Order is irrelevant.
    fn list_candidates(&self, entity_type: EntityType, key: BlockingKey) -> Vec<Arc<CanonicalEntity>>;

    /// Outbound alias links of an entity, in directory order.
    ///
    /// Unknown ids yield an empty sequence.
    fn get_alias_links(&self, id: EntityId) -> Vec<AliasLink>;

    /// Looks up one entity.
    fn get_entity(&self, id: EntityId) -> Option<Arc<CanonicalEntity>>;

    /// Identifies the snapshot for audit trails, if the backend can.
    fn snapshot_fingerprint(&self) -> Option<String> {
        None
    }
}

impl<D: ReferenceDirectory + ?Sized> ReferenceDirectory for Arc<D> {
    fn list_candidates(&self, entity_type: EntityType, key: BlockingKey) -> Vec<Arc<CanonicalEntity>> {
        (**self).list_candidates(entity_type, key)
    }

    fn get_alias_links(&self, id: EntityId) -> Vec<AliasLink> {
        (**self).get_alias_links(id)
    }

    fn get_entity(&self, id: EntityId) -> Option<Arc<CanonicalEntity>> {
        (**self).get_entity(id)
    }

    fn snapshot_fingerprint(&self) -> Option<String> {
        (**self).snapshot_fingerprint()
    }
}
