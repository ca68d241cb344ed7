//! Finding: the result of evaluating one rule in one context.
//!
//! Findings are append-only facts. They are never mutated after
//! creation, only superseded by a later run's finding for the same rule.

use planvet_catalogue::Severity;
use planvet_entities::Evidence;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Evidence entries carried by one finding, at most.
pub const MAX_FINDING_EVIDENCE: usize = 5;

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pass,
    Fail,
    NeedsReview,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Pass => "pass",
            FindingStatus::Fail => "fail",
            FindingStatus::NeedsReview => "needs_review",
        }
    }

    /// Failure status for a missing upstream field, by rule severity:
    /// an error-severity rule fails hard, a warning degrades to review.
    pub fn failure_for(severity: Severity) -> Self {
        match severity {
            Severity::Error => FindingStatus::Fail,
            Severity::Warning => FindingStatus::NeedsReview,
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of evaluating one rule against one context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub status: FindingStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        status: FindingStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            status,
            message: message.into(),
            missing_fields: Vec::new(),
            evidence: Vec::new(),
            details: None,
        }
    }

    pub fn pass(rule_id: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(rule_id, severity, FindingStatus::Pass, message)
    }

    pub fn with_missing_fields(mut self, missing_fields: Vec<String>) -> Self {
        self.missing_fields = missing_fields;
        self
    }

    /// Attach evidence, truncated to the finding bound.
    pub fn with_evidence(mut self, mut evidence: Vec<Evidence>) -> Self {
        evidence.truncate(MAX_FINDING_EVIDENCE);
        self.evidence = evidence;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether this finding should raise the run-level escalation flag.
    pub fn triggers_escalation(&self) -> bool {
        self.severity == Severity::Error && self.status != FindingStatus::Pass
    }

    /// Ordering key: rule, then status, for deterministic reports.
    fn sort_key(&self) -> (&str, FindingStatus) {
        (&self.rule_id, self.status)
    }
}

impl Eq for Finding {}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Deterministic check-row ID over (run, rule, document, submission).
///
/// Two evaluations of the same rule against the same scope within the
/// same run produce the same ID, which is what makes persisted check
/// rows "one row per rule per document per run": a re-write within a run
/// replaces, a new run appends under a fresh run ID.
pub fn compute_check_id(
    run_id: &str,
    rule_id: &str,
    document_id: Option<&str>,
    submission_id: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        run_id,
        rule_id,
        document_id.unwrap_or(""),
        submission_id.unwrap_or(""),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("vc1_{:x}", hasher.finalize())
}
