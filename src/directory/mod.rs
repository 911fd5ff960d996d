//! Reference directory interface and the in-memory snapshot implementation.
//!
//! The directory is owned by an external collaborator. The resolver only ever
//! reads through [`ReferenceDirectory`], and callers hand it an immutable
//! snapshot so a concurrent reload can never tear a resolution in half.

mod document;
mod memory;
mod traits;

pub use document::{DirectoryDocument, EntityRecord, NameChangeRecord};
pub use memory::{DirectoryHandle, InMemoryDirectory};
pub use traits::ReferenceDirectory;
