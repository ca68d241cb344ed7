//! Category validators: one pure evaluator per rule category.
//!
//! Every validator has the same shape,
//! `(rule, extraction, ctx) -> Result<Option<Finding>, SkipReason>`:
//!
//! - `Ok(Some(finding))` — the rule was evaluated
//! - `Ok(None)` — the rule plainly does not apply in this context
//! - `Err(skip)` — the rule needs context the caller did not supply
//!
//! Dispatch is a closed match over `RuleCategory`, so the category set is
//! exhaustively checked at compile time; there is no unknown-category
//! path at runtime.

pub mod biodiversity_offset;
pub mod consistency;
pub mod constraint;
pub mod document_required;
pub mod fee;
pub mod modification;
pub mod ownership;
pub mod plan_quality;
pub mod prior_approval;
pub mod spatial;

use planvet_catalogue::{Rule, RuleCategory};
use planvet_entities::ExtractionOutput;
use serde_json::Value;

use crate::context::EvalContext;
use crate::finding::Finding;
use crate::outcome::{RuleOutcome, SkipReason};
use crate::presence::evaluate_presence;

pub type ValidatorResult = Result<Option<Finding>, SkipReason>;

/// Route one rule to its category validator.
pub fn dispatch(rule: &Rule, extraction: &ExtractionOutput, ctx: &EvalContext) -> RuleOutcome {
    let result = match rule.category {
        RuleCategory::FieldRequired => Ok(Some(evaluate_presence(rule, extraction))),
        RuleCategory::DocumentRequired => document_required::evaluate(rule, extraction, ctx),
        RuleCategory::Consistency => consistency::evaluate(rule, extraction, ctx),
        RuleCategory::Modification => modification::evaluate(rule, extraction, ctx),
        RuleCategory::Spatial => spatial::evaluate(rule, extraction, ctx),
        RuleCategory::Fee => fee::evaluate(rule, extraction, ctx),
        RuleCategory::Ownership => ownership::evaluate(rule, extraction, ctx),
        RuleCategory::PriorApproval => prior_approval::evaluate(rule, extraction, ctx),
        RuleCategory::Constraint => constraint::evaluate(rule, extraction, ctx),
        RuleCategory::BiodiversityOffset => biodiversity_offset::evaluate(rule, extraction, ctx),
        RuleCategory::PlanQuality => plan_quality::evaluate(rule, extraction, ctx),
    };

    match result {
        Ok(Some(finding)) => RuleOutcome::Finding(finding),
        Ok(None) => RuleOutcome::NotApplicable,
        Err(reason) => RuleOutcome::Skipped(reason),
    }
}

/// Coerce an extracted value to a number, accepting formatted strings
/// (`"$1,250.00"`, `"950 sqm"` does not qualify — only currency/grouping
/// punctuation is stripped).
pub(crate) fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

/// Whether an extracted value reads as a set flag.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "yes" | "y" | "true" | "1" | "affected" | "present"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_coercion() {
        assert_eq!(numeric_value(&json!(285.0)), Some(285.0));
        assert_eq!(numeric_value(&json!("$1,250.00")), Some(1250.0));
        assert_eq!(numeric_value(&json!("285")), Some(285.0));
        assert_eq!(numeric_value(&json!("n/a")), None);
        assert_eq!(numeric_value(&json!(true)), None);
    }

    #[test]
    fn truthy_flags() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!("Yes")));
        assert!(truthy(&json!(1)));
        assert!(!truthy(&json!("no")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
    }
}
