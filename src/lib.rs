//! # entity-mapper - Entity Resolution Core
//!
//! Maps free-text entity names extracted from documents (carriers, shippers,
//! consignees) onto canonical records in a reference directory, even when the
//! extracted name is abbreviated, noisy, or refers to a company that has since
//! been renamed or acquired.
//!
//! ## Pipeline
//!
//! - **Candidate generation**: coarse blocking narrows the directory to plausible records
//! - **Similarity scoring**: token overlap, edit distance, acronym and alias metrics
//! - **Confidence aggregation**: weighted mean with a clamp-up for near-exact evidence
//! - **Name-change resolution**: bounded walk of rename/acquisition/merger links
//! - **Decision**: Matched, Ambiguous, or Unmatched, with full score provenance
//!
//! ## Usage
//!
//! ```rust
//! use entity_mapper::{
//!     resolve, AliasLink, CanonicalEntity, Decision, EntityId, EntityType, InMemoryDirectory,
//!     LinkKind, QueryEntity, ResolverConfig,
//! };
//!
//! let current = CanonicalEntity::with_id(EntityId::from_key("comp004"), "Steve Trucking Company", EntityType::Company);
//! let former = CanonicalEntity::new("Steve's Trucking", EntityType::Company)
//!     .with_link(AliasLink::new("Steve's Trucking", current.id, LinkKind::Acquisition));
//! let directory = InMemoryDirectory::build(vec![current, former])?;
//!
//! let result = resolve(&QueryEntity::company("Steve's Trucking"), &directory, &ResolverConfig::default())?;
//! assert_eq!(result.decision, Decision::Matched);
//! assert_eq!(result.resolved_entity_id, Some(EntityId::from_key("comp004")));
//! assert!(result.name_change.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod entity;
pub mod error;
pub mod normalize;

// Scoring
pub mod confidence;
pub mod config;
pub mod similarity;

// Directory and resolution
pub mod alias;
pub mod candidate;
pub mod decision;
pub mod directory;
pub mod resolver;
pub mod result;

// Re-export primary types at crate root for convenience
pub use alias::{ChainHop, ChainOutcome, NameChangeEvidence};
pub use config::{MetricWeights, ResolverConfig};
pub use decision::Decision;
pub use directory::{DirectoryDocument, DirectoryHandle, InMemoryDirectory, ReferenceDirectory};
pub use entity::{
    AliasLink, CanonicalEntity, DocumentRole, EntityId, EntityType, LinkKind, QueryContext, QueryEntity,
};
pub use error::{ConfigError, DirectoryError, DirectoryIntegrityError, InputError, ResolveError, ResolveResult};
pub use normalize::{BlockingKey, NormalizedName};
pub use resolver::{resolve, resolve_batch, EntityMapper};
pub use result::{MappingResult, MatchCandidate};
pub use similarity::{Metric, MetricScores};
