//! Entity types and identity records.
//!
//! A [`CanonicalEntity`] is the authoritative directory record an extracted
//! name should resolve to. Historical identity changes are explicit
//! [`AliasLink`] edges rather than loose name lists, so the resolver can walk
//! them with a bounded traversal.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InputError;

/// Namespace for ids derived from directory keys (`comp001`, tax ids, ...).
const ENTITY_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a9e_41d7_4c5b_9b0e_8d3f_52a1_c7e4);

/// Upper bound on an extracted name. Longer input is almost always a
/// mis-segmented paragraph from the extractor.
pub const MAX_QUERY_NAME_LENGTH: usize = 512;

/// Globally unique, stable entity identifier.
///
/// # Examples
///
/// ```
/// use entity_mapper::EntityId;
///
/// let a = EntityId::from_key("comp004");
/// let b = EntityId::from_key("comp004");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derives a deterministic ID from an external directory key.
    ///
    /// Keys that already parse as a UUID are used verbatim.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match Uuid::parse_str(key) {
            Ok(uuid) => Self(uuid),
            Err(_) => Self(Uuid::new_v5(&ENTITY_KEY_NAMESPACE, key.as_bytes())),
        }
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Classification of entity mentions.
///
/// This is a closed set: blocking and metric selection match on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A company: carrier, shipper, broker, consignee.
    Company,
    /// A named person (driver, contact).
    Person,
    /// A pickup/delivery location or facility.
    Location,
    /// A shipment reference (BOL, PRO, load number).
    ShipmentReference,
    /// Anything else the extractor could not classify.
    Other,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Company,
        Self::Person,
        Self::Location,
        Self::ShipmentReference,
        Self::Other,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
            Self::Location => "location",
            Self::ShipmentReference => "shipment_reference",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of historical identity change recorded on an [`AliasLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Same business, new name (rebranding).
    Rename,
    /// Absorbed by another entity.
    Acquisition,
    /// Combined with another entity into the current one.
    Merger,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Acquisition => write!(f, "acquisition"),
            Self::Merger => write!(f, "merger"),
        }
    }
}

/// Directed record that a previous identity became a different current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasLink {
    /// Name the entity was known under before the change.
    pub previous_name: String,

    /// Entity that carries the identity now.
    pub current_entity_id: EntityId,

    /// Rename, acquisition or merger.
    pub kind: LinkKind,

    /// When the change took effect, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
}

impl AliasLink {
    /// Creates a link without an effective date.
    #[must_use]
    pub fn new(previous_name: impl Into<String>, current_entity_id: EntityId, kind: LinkKind) -> Self {
        Self {
            previous_name: previous_name.into(),
            current_entity_id,
            kind,
            effective_date: None,
        }
    }

    /// Sets the date the change took effect.
    #[must_use]
    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }
}

/// The authoritative directory record.
///
/// # Examples
///
/// ```
/// use entity_mapper::{CanonicalEntity, EntityType};
///
/// let entity = CanonicalEntity::new("GT Express Incorporated", EntityType::Company)
///     .with_alias("GTE")
///     .with_alias("GT Express");
/// assert_eq!(entity.alias_count(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Stable directory id.
    pub id: EntityId,

    /// Authoritative display name.
    pub canonical_name: String,

    /// Category the entity is matched within.
    pub entity_type: EntityType,

    /// Alternative names, abbreviations and acronyms.
    #[serde(default)]
    pub aliases: BTreeSet<String>,

    /// Outbound identity changes, in directory order.
    #[serde(default)]
    pub alias_links: Vec<AliasLink>,
}

impl CanonicalEntity {
    /// Creates an entity with a fresh random id.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self::with_id(EntityId::new(), name, entity_type)
    }

    /// Creates an entity with a specific id.
    #[must_use]
    pub fn with_id(id: EntityId, name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id,
            canonical_name: name.into(),
            entity_type,
            aliases: BTreeSet::new(),
            alias_links: Vec::new(),
        }
    }

    /// Adds an alias, builder style.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.add_alias(alias);
        self
    }

    /// Adds an outbound alias link, builder style.
    #[must_use]
    pub fn with_link(mut self, link: AliasLink) -> Self {
        self.alias_links.push(link);
        self
    }

    /// Adds an alias. Blank aliases are ignored.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if !alias.trim().is_empty() {
            self.aliases.insert(alias);
        }
    }

    /// Canonical name followed by every alias.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Returns the number of aliases.
    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

impl PartialEq for CanonicalEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CanonicalEntity {}

impl std::hash::Hash for CanonicalEntity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Role the mention played in its source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// Party sending the goods.
    Shipper,
    /// Party moving the goods.
    Carrier,
    /// Party receiving the goods.
    Consignee,
    /// Intermediary arranging transport.
    Broker,
    /// Party the freight charges are billed to.
    BillTo,
    /// Any role not listed, as printed.
    Other(String),
}

/// Optional attributes the extractor captured next to the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Address printed next to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Role of the party in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<DocumentRole>,
}

/// An extracted entity mention awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEntity {
    /// Raw name as extracted.
    pub name: String,
    /// Category to resolve within.
    pub entity_type: EntityType,
    /// Optional attributes found near the name.
    #[serde(default)]
    pub context: QueryContext,
}

impl QueryEntity {
    /// Creates a mention with no context attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            context: QueryContext::default(),
        }
    }

    /// Shorthand for a company mention.
    #[must_use]
    pub fn company(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Company)
    }

    /// Attaches the address the extractor found next to the name.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.context.address = Some(address.into());
        self
    }

    /// Attaches the document role of the mention.
    #[must_use]
    pub fn with_role(mut self, role: DocumentRole) -> Self {
        self.context.role = Some(role);
        self
    }

    /// Checks the mention can be resolved at all.
    ///
    /// # Errors
    ///
    /// Returns `InputError::EmptyName` for empty or whitespace-only names and
    /// `InputError::NameTooLong` past [`MAX_QUERY_NAME_LENGTH`] characters.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.name.trim().is_empty() {
            return Err(InputError::EmptyName);
        }
        if self.name.chars().count() > MAX_QUERY_NAME_LENGTH {
            return Err(InputError::NameTooLong {
                max_length: MAX_QUERY_NAME_LENGTH,
            });
        }
        Ok(())
    }
}
