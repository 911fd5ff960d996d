//! Error types for the resolution core.
//!
//! Errors are strongly typed using thiserror so callers can pattern match on
//! the failure class. Directory integrity problems are deliberately separate:
//! they never abort a resolution, they are attached to the result as flags.

use thiserror::Error;

use crate::entity::EntityId;

/// Problems with a query entity handed to the resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Name is blank after trimming.
    #[error("Query entity name cannot be empty")]
    EmptyName,

    /// Name is longer than the resolver accepts.
    #[error("Query entity name exceeds maximum length of {max_length} characters")]
    NameTooLong {
        /// Limit in characters.
        max_length: usize,
    },
}

/// Invalid resolver configuration. Raised before any resolution work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A fractional setting outside its range.
    #[error("Configuration value '{field}' = {value} is out of range {expected}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Value given.
        value: f64,
        /// Accepted interval.
        expected: &'static str,
    },

    /// A count below its minimum.
    #[error("Configuration value '{field}' = {value} must be at least {min}")]
    TooSmall {
        /// Setting name.
        field: &'static str,
        /// Value given.
        value: usize,
        /// Smallest accepted value.
        min: usize,
    },

    /// A weight names a metric that does not exist.
    #[error("Unknown metric '{name}' in metric_weights")]
    UnknownMetric {
        /// Name as written.
        name: String,
    },

    /// A weight is negative or not finite.
    #[error("Weight for metric '{metric}' must be finite and non-negative, got {value}")]
    InvalidWeight {
        /// Metric name.
        metric: String,
        /// Weight given.
        value: f64,
    },

    /// Every weight is zero.
    #[error("At least one scoring metric must carry a positive weight")]
    NoPositiveWeight,

    /// Malformed TOML.
    #[error("Failed to parse configuration: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
}

/// Errors raised while building or loading a directory snapshot.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Two records share an id.
    #[error("Duplicate entity id in directory: {id}")]
    DuplicateEntity {
        /// The repeated id.
        id: EntityId,
    },

    /// A record has a blank canonical name.
    #[error("Entity {id} has an empty canonical name")]
    EmptyCanonicalName {
        /// The offending record.
        id: EntityId,
    },

    /// Malformed JSON document.
    #[error("Failed to parse directory document: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The document could not be read.
    #[error("Failed to read directory document: {0}")]
    Io(#[from] std::io::Error),

    /// A writer panicked while holding the handle lock.
    #[error("Poisoned directory handle lock: {context}")]
    Poisoned {
        /// Operation that found the lock poisoned.
        context: &'static str,
    },
}

/// Data-integrity conditions found while walking alias links.
///
/// These are recoverable: traversal stops, the pre-chain candidate is kept and
/// the condition is reported on the result so the directory maintainer can act.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryIntegrityError {
    /// The walk reached an entity it had already visited.
    #[error("Alias chain starting at {start} revisits entity {repeated}")]
    AliasCycle {
        /// Candidate the walk began at.
        start: EntityId,
        /// Entity reached twice.
        repeated: EntityId,
    },

    /// A link points at an id the directory does not hold.
    #[error("Alias chain starting at {start} has a link from {from} to missing entity {target}")]
    DanglingLink {
        /// Candidate the walk began at.
        start: EntityId,
        /// Entity holding the broken link.
        from: EntityId,
        /// Missing id the link points at.
        target: EntityId,
    },

    /// The walk passed the configured depth bound.
    #[error("Alias chain starting at {start} exceeds maximum depth of {max_depth}")]
    ChainTooDeep {
        /// Candidate the walk began at.
        start: EntityId,
        /// Bound that was exceeded.
        max_depth: usize,
    },
}

impl DirectoryIntegrityError {
    /// The entity the aborted traversal started from.
    #[must_use]
    pub const fn start(&self) -> EntityId {
        match self {
            Self::AliasCycle { start, .. } | Self::DanglingLink { start, .. } | Self::ChainTooDeep { start, .. } => {
                *start
            }
        }
    }
}

/// Top-level error type for resolution calls.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Rejected query.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Rejected configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Directory could not be built or read.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Unexpected failure inside the resolver.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl ResolveError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is an input error.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a directory error.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
