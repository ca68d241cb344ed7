//! Rule type: one compliance rule as loaded from a catalogue.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::config::CategoryConfig;

/// Severity of a rule violation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The closed set of rule categories.
///
/// `FieldRequired` is the default: generic presence semantics handled by
/// the orchestrator. Every other variant dispatches to a dedicated
/// category validator. The set is closed so dispatch is exhaustively
/// checkable; there is no "unknown category" at evaluation time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    #[default]
    FieldRequired,
    DocumentRequired,
    Consistency,
    Modification,
    Spatial,
    Fee,
    Ownership,
    PriorApproval,
    Constraint,
    BiodiversityOffset,
    PlanQuality,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::FieldRequired => "field_required",
            RuleCategory::DocumentRequired => "document_required",
            RuleCategory::Consistency => "consistency",
            RuleCategory::Modification => "modification",
            RuleCategory::Spatial => "spatial",
            RuleCategory::Fee => "fee",
            RuleCategory::Ownership => "ownership",
            RuleCategory::PriorApproval => "prior_approval",
            RuleCategory::Constraint => "constraint",
            RuleCategory::BiodiversityOffset => "biodiversity_offset",
            RuleCategory::PlanQuality => "plan_quality",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of evidence a rule expects to see behind its fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EvidenceExpectation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub min_confidence: f64,
}

/// One compliance rule.
///
/// Immutable once loaded. `config` is already typed per category; a rule
/// that reaches the engine never carries an unparsed threshold map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub rule_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub required_fields_any: bool,
    #[serde(default, skip_serializing_if = "evidence_is_empty")]
    pub evidence: EvidenceExpectation,
    #[serde(default)]
    pub severity: Severity,
    /// Document-type filter; empty means the rule applies to all documents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, rename = "rule_category")]
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "CategoryConfig::is_none")]
    pub config: CategoryConfig,
}

fn evidence_is_empty(evidence: &EvidenceExpectation) -> bool {
    evidence.source_types.is_empty()
        && evidence.keywords.is_empty()
        && evidence.min_confidence == 0.0
}

fn rule_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("rule-id regex must compile"))
}

impl Rule {
    /// Whether `rule_id` is a well-formed catalogue identifier.
    pub fn valid_rule_id(id: &str) -> bool {
        rule_id_re().is_match(id)
    }

    /// Whether this rule applies to a document of the given classified type.
    ///
    /// An empty `applies_to` list is unrestricted. A missing document type
    /// only passes the filter when the rule is unrestricted.
    pub fn applies_to_document(&self, document_type: Option<&str>) -> bool {
        if self.applies_to.is_empty() {
            return true;
        }
        match document_type {
            Some(doc_type) => self.applies_to.iter().any(|t| t == doc_type),
            None => false,
        }
    }
}
