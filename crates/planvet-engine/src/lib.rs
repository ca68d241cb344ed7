//! # planvet-engine
//!
//! The validation decision engine: given a rule catalogue, an extraction
//! payload, and the entity graph, decide what passes, what fails, what
//! needs an officer's eye, and whether the costly external resolution
//! step is warranted.
//!
//! ## Architecture
//!
//! ```text
//! Catalogue + ExtractionOutput + EvalContext
//!     │
//! Orchestrator            ← applies_to filter, presence semantics,
//!     │                     category dispatch, needs_llm accumulation
//! Category validators     ← pure (rule, extraction, ctx) -> Finding?
//!     │
//! ValidationOutcome       ← summary + findings + skips
//!     │
//! EscalationGate          ← reads/writes ResolutionCache, counts calls
//!     │
//! Runner                  ← persists ValidationCheck rows
//! ```
//!
//! The delta engine (`delta`) sits beside this flow: it maps a
//! resubmission's ChangeSet onto the subset of catalogue rules worth
//! re-running.

pub mod cache;
pub mod context;
pub mod delta;
pub mod error;
pub mod escalation;
pub mod finding;
pub mod orchestrator;
pub mod outcome;
pub mod presence;
pub mod runner;
pub mod validators;

pub use cache::ResolutionCache;
pub use context::{ContextEcho, EvalContext};
pub use delta::{compute_impacted_rules, significance_score};
pub use error::EngineError;
pub use escalation::{
    EscalationGate, FieldResolver, ResolutionRequest, ResolvedFields, ResolverError,
    outstanding_fields,
};
pub use finding::{Finding, FindingStatus, MAX_FINDING_EVIDENCE, compute_check_id};
pub use orchestrator::{evaluate, evaluate_filtered};
pub use outcome::{RuleOutcome, SkipReason, SkippedRule, ValidationOutcome, ValidationSummary};
pub use runner::{RunRequest, run_validation};
