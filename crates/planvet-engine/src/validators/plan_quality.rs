//! Plan-quality validator: the declared drawing scale must be one of
//! the acceptable presentation scales.

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::{Value, json};

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, _ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::PlanQuality(config) = &rule.config else {
        return Ok(None);
    };

    let declared = match extraction.fields.get(config.scale_field.as_str()) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            return Ok(Some(
                Finding::new(
                    &rule.rule_id,
                    rule.severity,
                    FindingStatus::failure_for(rule.severity),
                    format!("plan scale field '{}' not extracted", config.scale_field),
                )
                .with_missing_fields(vec![config.scale_field.clone()]),
            ));
        }
    };

    let acceptable = config
        .acceptable_scales
        .iter()
        .any(|scale| normalize_scale(scale) == normalize_scale(&declared));

    if acceptable {
        return Ok(Some(
            Finding::pass(
                &rule.rule_id,
                rule.severity,
                format!("plan scale '{}' is acceptable", declared.trim()),
            )
            .with_evidence(extraction.evidence_for(&config.scale_field).to_vec()),
        ));
    }

    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::failure_for(rule.severity),
            format!(
                "plan scale '{}' is not acceptable (expected one of: {})",
                declared.trim(),
                config.acceptable_scales.join(", ")
            ),
        )
        .with_evidence(vec![Evidence::new(
            format!("acceptable scales: {}", config.acceptable_scales.join(", ")),
            None,
            1.0,
        )])
        .with_details(json!({
            "declared": declared.trim(),
            "acceptable": config.acceptable_scales,
        })),
    ))
}

/// Scales compare without whitespace and case: `1 : 100` == `1:100`.
fn normalize_scale(scale: &str) -> String {
    scale
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_catalogue::{EvidenceExpectation, PlanQualityConfig, RuleCategory, Severity};
    use std::collections::BTreeMap;

    fn rule(severity: Severity) -> Rule {
        Rule {
            rule_id: "plan.scale".to_string(),
            title: "Plan scale acceptable".to_string(),
            description: String::new(),
            required_fields: vec![],
            required_fields_any: false,
            evidence: EvidenceExpectation::default(),
            severity,
            applies_to: vec![],
            tags: vec![],
            category: RuleCategory::PlanQuality,
            config: CategoryConfig::PlanQuality(PlanQualityConfig {
                scale_field: "plan_scale".to_string(),
                acceptable_scales: vec!["1:100".to_string(), "1:200".to_string()],
            }),
        }
    }

    fn extraction(scale: Value) -> ExtractionOutput {
        ExtractionOutput {
            fields: BTreeMap::from([("plan_scale".to_string(), scale)]),
            ..ExtractionOutput::default()
        }
    }

    #[test]
    fn whitespace_variant_is_accepted() {
        let finding = evaluate(
            &rule(Severity::Error),
            &extraction(json!("1 : 100")),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
    }

    #[test]
    fn unacceptable_scale_fails_with_expected_list() {
        let finding = evaluate(
            &rule(Severity::Error),
            &extraction(json!("1:500")),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::Fail);
        assert!(finding.evidence[0].snippet.contains("1:100, 1:200"));
    }

    #[test]
    fn missing_scale_degrades_by_severity() {
        let finding = evaluate(
            &rule(Severity::Warning),
            &ExtractionOutput::default(),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert_eq!(finding.missing_fields, vec!["plan_scale".to_string()]);
    }
}
