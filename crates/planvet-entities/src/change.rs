//! ChangeSet and ChangeItem: the computed delta between a modification
//! submission and its parent.
//!
//! A ChangeSet belongs to exactly one (child, parent) submission pair and
//! is created once, immediately after the modification's fields, documents
//! and spatial metrics are extracted. It is read thereafter by the delta
//! engine and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which kind of entity one atomic change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    FieldDelta,
    DocumentDelta,
    SpatialMetricDelta,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::FieldDelta => "field_delta",
            ChangeKind::DocumentDelta => "document_delta",
            ChangeKind::SpatialMetricDelta => "spatial_metric_delta",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One atomic difference between submission versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeItem {
    pub kind: ChangeKind,

    /// The changed entity: a field name, a document type, or a spatial
    /// metric name, depending on `kind`.
    pub entity_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,

    /// Per-item significance weight in [0, 1].
    #[serde(default)]
    pub significance: f64,
}

impl ChangeItem {
    pub fn new(
        kind: ChangeKind,
        entity_name: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        significance: f64,
    ) -> Self {
        Self {
            kind,
            entity_name: entity_name.into(),
            old_value,
            new_value,
            significance: significance.clamp(0.0, 1.0),
        }
    }
}

/// The full delta between a modification submission and its parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeSet {
    pub id: String,
    pub submission_id: String,
    pub parent_submission_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ChangeItem>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl ChangeSet {
    pub fn new(
        id: impl Into<String>,
        submission_id: impl Into<String>,
        parent_submission_id: impl Into<String>,
        items: Vec<ChangeItem>,
    ) -> Self {
        Self {
            id: id.into(),
            submission_id: submission_id.into(),
            parent_submission_id: parent_submission_id.into(),
            items,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
