//! Fee validator: the declared fee against the schedule for the
//! application type.

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::json;

use super::{ValidatorResult, numeric_value};
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::Fee(config) = &rule.config else {
        return Ok(None);
    };
    let Some(fee_field) = rule.required_fields.first() else {
        return Ok(None);
    };

    // An application type outside the schedule (and no default range) is
    // exempt: the rule does not apply.
    let app_type = ctx
        .effective_application_type()
        .unwrap_or_else(|| "default".to_string());
    let Some(range) = config.range_for(&app_type) else {
        return Ok(None);
    };

    let Some(raw) = extraction.fields.get(fee_field.as_str()) else {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::failure_for(rule.severity),
                format!("fee field '{fee_field}' not extracted"),
            )
            .with_missing_fields(vec![fee_field.clone()]),
        ));
    };
    let Some(fee) = numeric_value(raw) else {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            format!("fee field '{fee_field}' is not numeric: {raw}"),
        )));
    };

    if fee >= range.min && fee <= range.max {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            format!("fee {fee} within the {app_type} schedule"),
        )));
    }

    // Out-of-schedule fees go to an officer rather than hard-failing:
    // concessions and staged payments are decided outside this engine.
    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            format!("declared fee {fee} is outside the {app_type} schedule"),
        )
        .with_evidence(vec![Evidence::new(
            format!(
                "expected fee between {} and {} for '{app_type}', declared {fee}",
                range.min, range.max
            ),
            None,
            1.0,
        )])
        .with_details(json!({
            "declared": fee,
            "expected_min": range.min,
            "expected_max": range.max,
            "application_type": app_type,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_catalogue::{EvidenceExpectation, FeeConfig, FeeRange, RuleCategory, Severity};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rule() -> Rule {
        Rule {
            rule_id: "fee.schedule".to_string(),
            title: "Fee within schedule".to_string(),
            description: String::new(),
            required_fields: vec!["fee_paid".to_string()],
            required_fields_any: false,
            evidence: EvidenceExpectation::default(),
            severity: Severity::Warning,
            applies_to: vec![],
            tags: vec![],
            category: RuleCategory::Fee,
            config: CategoryConfig::Fee(FeeConfig {
                ranges: BTreeMap::from([(
                    "householder".to_string(),
                    FeeRange {
                        min: 100.0,
                        max: 500.0,
                    },
                )]),
                default_range: None,
            }),
        }
    }

    fn extraction(fee: serde_json::Value) -> ExtractionOutput {
        ExtractionOutput {
            fields: BTreeMap::from([("fee_paid".to_string(), fee)]),
            ..ExtractionOutput::default()
        }
    }

    fn householder_ctx() -> EvalContext<'static> {
        EvalContext {
            application_type: Some("householder"),
            ..EvalContext::default()
        }
    }

    #[test]
    fn below_minimum_needs_review_with_range_in_evidence() {
        let finding = evaluate(&rule(), &extraction(json!(50)), &householder_ctx())
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert_eq!(finding.severity, Severity::Warning);
        assert!(finding.evidence[0].snippet.contains("between 100 and 500"));
    }

    #[test]
    fn in_range_passes() {
        let finding = evaluate(&rule(), &extraction(json!("$285.00")), &householder_ctx())
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
    }

    #[test]
    fn exempt_type_is_inapplicable() {
        let ctx = EvalContext {
            application_type: Some("subdivision"),
            ..EvalContext::default()
        };
        assert_eq!(evaluate(&rule(), &extraction(json!(50)), &ctx).unwrap(), None);
    }

    #[test]
    fn non_numeric_fee_needs_review() {
        let finding = evaluate(&rule(), &extraction(json!("waived")), &householder_ctx())
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert!(finding.message.contains("not numeric"));
    }

    #[test]
    fn missing_fee_reports_missing_field() {
        let finding = evaluate(&rule(), &ExtractionOutput::default(), &householder_ctx())
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert_eq!(finding.missing_fields, vec!["fee_paid".to_string()]);
    }
}
