//! Submission type: one version of an application's material.
//!
//! Versions form a strict tree rooted at V0 (the original lodgement);
//! V1+ are modifications and must reference a parent. Submissions are
//! never deleted, only superseded by child versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the resolved-field cache for this submission.
pub const META_RESOLVED_FIELDS: &str = "resolved_fields";

/// Metadata key holding the cumulative external-resolution call count.
pub const META_RESOLUTION_CALL_COUNT: &str = "resolution_call_count";

/// Processing lifecycle of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// Whether the lifecycle permits moving to `next`.
    ///
    /// pending → processing → completed | failed. Terminal states only
    /// re-enter processing (a re-run of a completed or failed version).
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (SubmissionStatus::Pending, SubmissionStatus::Processing)
                | (SubmissionStatus::Processing, SubmissionStatus::Completed)
                | (SubmissionStatus::Processing, SubmissionStatus::Failed)
                | (SubmissionStatus::Completed, SubmissionStatus::Processing)
                | (SubmissionStatus::Failed, SubmissionStatus::Processing)
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One version of an application's submitted material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub application_id: String,

    /// 0 for the original lodgement, 1+ for modifications.
    pub version: u32,

    /// Parent submission for modifications; `None` only for V0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub status: SubmissionStatus,

    /// Small persistent key-value bag. Holds the resolved-field cache
    /// (`resolved_fields`) and escalation counters
    /// (`resolution_call_count`). Mutated by the orchestrator and the
    /// escalation gate throughout a run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Submission {
    /// Create the original V0 submission for an application.
    pub fn original(id: impl Into<String>, application_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            application_id: application_id.into(),
            version: 0,
            parent_id: None,
            status: SubmissionStatus::Pending,
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a modification submission superseding `parent`.
    pub fn modification(id: impl Into<String>, parent: &Submission) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            application_id: parent.application_id.clone(),
            version: parent.version + 1,
            parent_id: Some(parent.id.clone()),
            status: SubmissionStatus::Pending,
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this is the original (V0) submission.
    pub fn is_original(&self) -> bool {
        self.version == 0
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Resolved-field cache entries stored on this submission.
    pub fn resolved_fields(&self) -> BTreeMap<String, Value> {
        match self.metadata.get(META_RESOLVED_FIELDS) {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Merge resolved-field updates into this submission's cache entry.
    /// Incoming values win key collisions.
    pub fn merge_resolved_fields(&mut self, updates: &BTreeMap<String, Value>) {
        if updates.is_empty() {
            return;
        }
        let mut merged = self.resolved_fields();
        for (key, value) in updates {
            merged.insert(key.clone(), value.clone());
        }
        let object: serde_json::Map<String, Value> = merged.into_iter().collect();
        self.metadata
            .insert(META_RESOLVED_FIELDS.to_string(), Value::Object(object));
        self.touch_updated_at();
    }

    /// Cumulative external-resolution calls recorded on this submission.
    pub fn resolution_call_count(&self) -> u64 {
        self.metadata
            .get(META_RESOLUTION_CALL_COUNT)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Record one completed external-resolution call.
    pub fn increment_resolution_call_count(&mut self) {
        let next = self.resolution_call_count() + 1;
        self.metadata
            .insert(META_RESOLUTION_CALL_COUNT.to_string(), Value::from(next));
        self.touch_updated_at();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle_transitions() {
        let s = SubmissionStatus::Pending;
        assert!(s.can_transition_to(SubmissionStatus::Processing));
        assert!(!s.can_transition_to(SubmissionStatus::Completed));
        assert!(SubmissionStatus::Processing.can_transition_to(SubmissionStatus::Failed));
        assert!(SubmissionStatus::Completed.can_transition_to(SubmissionStatus::Processing));
        assert!(!SubmissionStatus::Completed.can_transition_to(SubmissionStatus::Failed));
    }

    #[test]
    fn modification_chains_from_parent() {
        let v0 = Submission::original("sub_0", "app_1");
        assert!(v0.is_original());
        assert_eq!(v0.parent_id, None);

        let v1 = Submission::modification("sub_1", &v0);
        assert_eq!(v1.version, 1);
        assert_eq!(v1.parent_id.as_deref(), Some("sub_0"));
        assert_eq!(v1.application_id, "app_1");
        assert!(!v1.is_original());
    }

    #[test]
    fn resolved_fields_merge_prefers_incoming() {
        let mut sub = Submission::original("sub_0", "app_1");
        sub.merge_resolved_fields(&BTreeMap::from([
            ("proposed_use".to_string(), json!("dwelling")),
            ("storeys".to_string(), json!(2)),
        ]));
        sub.merge_resolved_fields(&BTreeMap::from([(
            "proposed_use".to_string(),
            json!("dual occupancy"),
        )]));

        let resolved = sub.resolved_fields();
        assert_eq!(resolved["proposed_use"], json!("dual occupancy"));
        assert_eq!(resolved["storeys"], json!(2));
    }

    #[test]
    fn call_count_starts_at_zero_and_increments() {
        let mut sub = Submission::original("sub_0", "app_1");
        assert_eq!(sub.resolution_call_count(), 0);
        sub.increment_resolution_call_count();
        sub.increment_resolution_call_count();
        assert_eq!(sub.resolution_call_count(), 2);
    }
}
