//! # planvet-catalogue
//!
//! The compliance rule catalogue: rule definitions, per-category typed
//! configuration, and the loader.
//!
//! This crate provides:
//! - `Rule` and its closed `RuleCategory` taxonomy
//! - `CategoryConfig` (typed thresholds, validated at load time)
//! - `Catalogue` (ordered, immutable, digest-addressed rule set)
//!
//! It intentionally does not evaluate anything. Evaluation semantics live
//! in `planvet-engine`; this crate only guarantees that every rule handed
//! to the engine is structurally sound.

pub mod config;
pub mod loader;
pub mod rule;

pub use config::{
    BiodiversityOffsetConfig, CategoryConfig, ConstraintConfig, DocumentRequiredConfig, FeeConfig,
    FeeRange, OwnershipConfig, PlanQualityConfig, PriorApprovalConfig, SpatialConfig,
};
pub use loader::{CATALOGUE_SCHEMA, Catalogue, CatalogueError};
pub use rule::{EvidenceExpectation, Rule, RuleCategory, Severity};
