//! Application type: the root of the entity graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planning application. Submissions version its material; the
/// application itself only carries identity and classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: String,

    /// Council reference, e.g. `DA-2026-0412`.
    pub reference: String,

    /// Declared application type, e.g. `householder`, `commercial`.
    /// Drives fee schedules and document-requirement lookups.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_type: String,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Application {
    pub fn new(id: impl Into<String>, reference: impl Into<String>, application_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            application_type: application_type.into(),
            created_at: Utc::now(),
        }
    }
}
