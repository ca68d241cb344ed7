//! Rule outcomes and the run-level validation summary.
//!
//! Skip-vs-fail is distinguished in the type, not by exception: a
//! validator that cannot decide for lack of context returns a
//! `SkipReason`, and the orchestrator records it without failing the
//! run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::ContextEcho;
use crate::finding::{Finding, FindingStatus};

/// Why a rule was not evaluated in this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No persistence handle in the context (ad-hoc single-document mode).
    MissingStore,
    /// The context names no submission.
    MissingSubmissionId,
    /// The named submission is not in the store.
    SubmissionNotFound(String),
    /// The rule needs an application type and none could be resolved.
    MissingApplicationType,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingStore => write!(f, "no entity store in context"),
            SkipReason::MissingSubmissionId => write!(f, "no submission id in context"),
            SkipReason::SubmissionNotFound(id) => write!(f, "submission not found: {id}"),
            SkipReason::MissingApplicationType => {
                write!(f, "no application type could be resolved")
            }
        }
    }
}

/// Result of dispatching one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// The rule was evaluated and produced a finding.
    Finding(Finding),
    /// The rule plainly does not apply in this context (e.g. a fee rule
    /// for an exempt application type). Nothing to report.
    NotApplicable,
    /// The rule could not be evaluated for lack of context.
    Skipped(SkipReason),
}

/// One skipped rule, as surfaced in the validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedRule {
    pub rule_id: String,
    pub reason: String,
}

/// Count-by-status summary: the machine-checkable contract consumed by
/// persistence, reporting, and the escalation gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationSummary {
    /// Total rules in the catalogue considered for this evaluation.
    pub rule_count: usize,
    pub pass: usize,
    pub fail: usize,
    pub needs_review: usize,
    pub skipped: usize,
    /// OR-accumulated across all rules: any error-severity finding that
    /// is not a pass sets this. The escalation gate consults this flag,
    /// not individual findings.
    pub needs_llm: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub catalogue_digest: String,
}

impl ValidationSummary {
    /// Fold one finding into the counts and the escalation flag.
    pub fn absorb(&mut self, finding: &Finding) {
        match finding.status {
            FindingStatus::Pass => self.pass += 1,
            FindingStatus::Fail => self.fail += 1,
            FindingStatus::NeedsReview => self.needs_review += 1,
        }
        if finding.triggers_escalation() {
            self.needs_llm = true;
        }
    }
}

/// The full result of one validation run over one document context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationOutcome {
    pub summary: ValidationSummary,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRule>,
    pub context: ContextEcho,
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_catalogue::Severity;

    #[test]
    fn summary_absorbs_statuses_and_flag() {
        let mut summary = ValidationSummary::default();
        summary.absorb(&Finding::pass("r.a", Severity::Error, "ok"));
        summary.absorb(&Finding::new(
            "r.b",
            Severity::Warning,
            FindingStatus::Fail,
            "late fee",
        ));
        assert_eq!((summary.pass, summary.fail), (1, 1));
        assert!(!summary.needs_llm, "warning severity must not escalate");

        summary.absorb(&Finding::new(
            "r.c",
            Severity::Error,
            FindingStatus::NeedsReview,
            "unclear",
        ));
        assert!(summary.needs_llm);
    }

    #[test]
    fn skip_reason_messages() {
        assert_eq!(
            SkipReason::SubmissionNotFound("sub_9".to_string()).to_string(),
            "submission not found: sub_9"
        );
        assert_eq!(
            SkipReason::MissingStore.to_string(),
            "no entity store in context"
        );
    }
}
