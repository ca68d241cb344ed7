//! Constraint validator: a flagged planning constraint needs supporting
//! evidence text, otherwise an officer has to look.

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::json;

use super::{ValidatorResult, truthy};
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, _ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::Constraint(config) = &rule.config else {
        return Ok(None);
    };

    let triggered: Vec<String> = config
        .trigger_fields
        .iter()
        .filter(|field| {
            extraction
                .fields
                .get(field.as_str())
                .is_some_and(truthy)
        })
        .cloned()
        .collect();

    if triggered.is_empty() {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            "no constraint flags set",
        )));
    }

    let keywords: &[String] = if config.evidence_keywords.is_empty() {
        &rule.evidence.keywords
    } else {
        &config.evidence_keywords
    };

    let supporting: Vec<Evidence> = extraction
        .evidence_index
        .values()
        .flat_map(|refs| refs.as_slice())
        .filter(|evidence| {
            let snippet = evidence.snippet.to_lowercase();
            keywords
                .iter()
                .any(|keyword| snippet.contains(&keyword.to_lowercase()))
        })
        .cloned()
        .collect();

    if supporting.is_empty() {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::NeedsReview,
                format!(
                    "constraint flag(s) set ({}) without supporting evidence text",
                    triggered.join(", ")
                ),
            )
            .with_details(json!({ "triggered": triggered })),
        ));
    }

    Ok(Some(
        Finding::pass(
            &rule.rule_id,
            rule.severity,
            format!("constraint flag(s) supported by evidence: {}", triggered.join(", ")),
        )
        .with_evidence(supporting)
        .with_details(json!({ "triggered": triggered })),
    ))
}
