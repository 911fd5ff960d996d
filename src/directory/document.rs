//! JSON directory documents.
//!
//! ```json
//! {
//!   "entities": [
//!     {"id": "comp004", "name": "Steve Trucking Company", "type": "company", "aliases": ["Steve Trucking"]}
//!   ],
//!   "name_changes": [
//!     {"previous_name": "Steve's Trucking", "entity_id": "comp004",
//!      "change_date": "2020-01-15", "change_reason": "rebranding"}
//!   ]
//! }
//! ```
//!
//! Ids may be UUIDs or any stable key; keys map to UUID v5. Name changes can be
//! attached to the entity that changed (`name_changes` inside a record) or
//! listed at the top level. A top-level change has no record for the former
//! identity, so one is synthesized: a retired entity named after the previous
//! name, linking to the current entity.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::{AliasLink, CanonicalEntity, EntityId, EntityType, LinkKind};
use crate::error::DirectoryError;

const RETIRED_KEY_PREFIX: &str = "retired:";

fn default_entity_type() -> EntityType {
    EntityType::Company
}

/// Top-level directory document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDocument {
    /// Every canonical entity.
    #[serde(default)]
    pub entities: Vec<EntityRecord>,

    /// Changes whose former identity has no record of its own.
    #[serde(default)]
    pub name_changes: Vec<NameChangeRecord>,
}

/// One canonical entity as stored in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Directory key; hashed into a stable [`EntityId`](crate::EntityId).
    pub id: String,

    /// Canonical name.
    pub name: String,

    /// Entity category, serialized as `type`. Defaults to company.
    #[serde(rename = "type", default = "default_entity_type")]
    pub entity_type: EntityType,

    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Outbound changes: this entity became `entity_id`.
    #[serde(default)]
    pub name_changes: Vec<NameChangeRecord>,
}

/// A recorded rename, acquisition or merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameChangeRecord {
    /// Name the identity was known under before the change.
    pub previous_name: String,

    /// Id of the entity carrying the identity now.
    #[serde(alias = "current_entity_id")]
    pub entity_id: String,

    /// Informational only; the current name is read from the target record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_name: Option<String>,

    /// When the change took effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_date: Option<NaiveDate>,

    /// Free-form reason; `acquisition`/`merger` map to their kinds, anything
    /// else is a rename.
    #[serde(default, alias = "kind", skip_serializing_if = "Option::is_none")]
    pub change_reason: Option<String>,
}

impl NameChangeRecord {
    /// Relationship kind implied by the recorded reason.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        let reason = self.change_reason.as_deref().map(str::trim).unwrap_or_default();
        match reason.to_ascii_lowercase().as_str() {
            "acquisition" | "acquired" => LinkKind::Acquisition,
            "merger" | "merged" => LinkKind::Merger,
            _ => LinkKind::Rename,
        }
    }

    fn to_link(&self) -> AliasLink {
        let link = AliasLink::new(
            self.previous_name.clone(),
            EntityId::from_key(&self.entity_id),
            self.kind(),
        );
        match self.change_date {
            Some(date) => link.with_effective_date(date),
            None => link,
        }
    }
}

impl DirectoryDocument {
    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// `DirectoryError::Parse` on malformed JSON or unknown entity types.
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        serde_json::from_str(json).map_err(|e| DirectoryError::Parse { message: e.to_string() })
    }

    /// Parses a document from a reader.
    ///
    /// # Errors
    ///
    /// `DirectoryError::Parse` on malformed JSON.
    pub fn from_reader(reader: impl Read) -> Result<Self, DirectoryError> {
        serde_json::from_reader(reader).map_err(|e| DirectoryError::Parse { message: e.to_string() })
    }

    /// Converts records into directory entities.
    ///
    /// Duplicate ids and blank names are passed through untouched so snapshot
    /// construction can reject them.
    #[must_use]
    pub fn into_entities(self) -> Vec<CanonicalEntity> {
        let types: HashMap<EntityId, EntityType> = self
            .entities
            .iter()
            .map(|r| (EntityId::from_key(&r.id), r.entity_type))
            .collect();

        let mut entities: Vec<CanonicalEntity> = self
            .entities
            .into_iter()
            .map(|record| {
                let mut entity =
                    CanonicalEntity::with_id(EntityId::from_key(&record.id), record.name, record.entity_type);
                for alias in record.aliases {
                    entity.add_alias(alias);
                }
                entity.alias_links = record.name_changes.iter().map(NameChangeRecord::to_link).collect();
                entity
            })
            .collect();

        // Top-level changes sharing a previous name become one retired record.
        let mut retired: BTreeMap<String, CanonicalEntity> = BTreeMap::new();
        for change in self.name_changes {
            let link = change.to_link();
            let entity_type = types
                .get(&link.current_entity_id)
                .copied()
                .unwrap_or(EntityType::Company);
            let key = format!("{RETIRED_KEY_PREFIX}{}", change.previous_name.trim().to_lowercase());
            retired
                .entry(key)
                .or_insert_with_key(|key| {
                    CanonicalEntity::with_id(EntityId::from_key(key), change.previous_name.clone(), entity_type)
                })
                .alias_links
                .push(link);
        }
        entities.extend(retired.into_values());
        entities
    }
}
