//! Document and extracted-field types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One submitted document within a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub submission_id: String,
    pub filename: String,

    /// Classified document type, e.g. `site_plan`, `fee_receipt`.
    /// Classification happens upstream; empty means unclassified.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_type: String,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        submission_id: impl Into<String>,
        filename: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            submission_id: submission_id.into(),
            filename: filename.into(),
            document_type: document_type.into(),
            created_at: Utc::now(),
        }
    }
}

/// One named field value extracted from a document by the upstream
/// field-mapping collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedField {
    pub id: String,
    pub document_id: String,
    pub field_name: String,
    pub value: Value,
    #[serde(default)]
    pub confidence: f64,
}

impl ExtractedField {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        field_name: impl Into<String>,
        value: Value,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            field_name: field_name.into(),
            value,
            confidence,
        }
    }
}
