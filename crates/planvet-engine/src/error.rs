//! Error types for engine operations.

use planvet_catalogue::CatalogueError;
use planvet_entities::StoreError;

use crate::escalation::ResolverError;

/// Errors arising from validation runs, cache writes, or escalation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Catalogue load/validation failure: fatal, a run cannot proceed.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("changeset not found: {0}")]
    ChangeSetNotFound(String),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}
