//! # planvet-entities
//!
//! The persisted entity graph for planning applications.
//!
//! This crate provides:
//! - Entity types: `Application`, `Submission` (version tree), `Document`,
//!   `ExtractedField`, `Evidence`, `GeometryFeature`, `ChangeSet`/`ChangeItem`,
//!   and `ValidationCheck` (the persisted finding row)
//! - `EntityStore` (canonical in-memory state with deterministic queries)
//! - JSONL read/write (portable persistence, one tagged record per line)
//! - Lock-scoped atomic mutation for concurrent writers
//!
//! It intentionally does not evaluate rules or decide escalation. Those
//! concerns live in `planvet-engine`.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one tagged record per line)
//!     ↕  hydrate / flush
//! EntityStore (deterministic in-memory projection)
//! ```

pub mod application;
pub mod atomic_store;
pub mod change;
pub mod check;
pub mod document;
pub mod evidence;
pub mod extraction;
pub mod geometry;
pub mod jsonl;
pub mod store;
pub mod submission;

pub use application::Application;
pub use atomic_store::{AtomicStoreMutationError, mutate_store_jsonl, store_lock_path};
pub use change::{ChangeItem, ChangeKind, ChangeSet};
pub use check::ValidationCheck;
pub use document::{Document, ExtractedField};
pub use evidence::{Evidence, EvidenceRefs, MAX_SNIPPET_CHARS};
pub use extraction::ExtractionOutput;
pub use geometry::GeometryFeature;
pub use jsonl::{
    EntityRecord, JsonlError, read_records, read_records_from_path, write_records,
    write_records_to_path,
};
pub use store::{EntityStore, StoreError};
pub use submission::{
    META_RESOLUTION_CALL_COUNT, META_RESOLVED_FIELDS, Submission, SubmissionStatus,
};

use uuid::Uuid;

/// Mint a new entity ID with a type prefix, e.g. `doc_1f0c…`.
pub fn new_entity_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
