//! Biodiversity-offset validator: vegetation clearing above the trigger
//! threshold must be matched by an adequate offset.

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::json;

use super::{ValidatorResult, numeric_value};
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, _ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::BiodiversityOffset(config) = &rule.config else {
        return Ok(None);
    };

    // No clearing declared at all: nothing to offset.
    let Some(raw_clearing) = extraction.fields.get(config.clearing_field.as_str()) else {
        return Ok(None);
    };
    let Some(clearing) = numeric_value(raw_clearing) else {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            format!(
                "clearing field '{}' is not numeric: {raw_clearing}",
                config.clearing_field
            ),
        )));
    };

    if clearing < config.trigger_threshold_sqm {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            format!(
                "declared clearing {clearing} sqm is below the offset trigger ({} sqm)",
                config.trigger_threshold_sqm
            ),
        )));
    }

    let offset_area = config
        .offset_fields
        .iter()
        .find_map(|field| extraction.fields.get(field.as_str()).and_then(numeric_value));
    let Some(offset_area) = offset_area else {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::NeedsReview,
                format!(
                    "clearing {clearing} sqm exceeds the offset trigger but no offset area is declared"
                ),
            )
            .with_missing_fields(config.offset_fields.clone()),
        ));
    };

    let required = clearing * config.offset_ratio;
    if offset_area >= required {
        return Ok(Some(
            Finding::pass(
                &rule.rule_id,
                rule.severity,
                format!("offset {offset_area} sqm covers the required {required} sqm"),
            )
            .with_details(json!({
                "clearing_sqm": clearing,
                "offset_sqm": offset_area,
                "required_sqm": required,
            })),
        ));
    }

    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::Fail,
            format!(
                "offset {offset_area} sqm is below the required {required} sqm ({}x clearing)",
                config.offset_ratio
            ),
        )
        .with_evidence(vec![Evidence::new(
            format!(
                "clearing {clearing} sqm at ratio {} requires {required} sqm, declared {offset_area} sqm",
                config.offset_ratio
            ),
            None,
            1.0,
        )])
        .with_details(json!({
            "clearing_sqm": clearing,
            "offset_sqm": offset_area,
            "required_sqm": required,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_catalogue::{BiodiversityOffsetConfig, EvidenceExpectation, RuleCategory, Severity};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn rule() -> Rule {
        Rule {
            rule_id: "offset.vegetation".to_string(),
            title: "Vegetation clearing offset".to_string(),
            description: String::new(),
            required_fields: vec![],
            required_fields_any: false,
            evidence: EvidenceExpectation::default(),
            severity: Severity::Error,
            applies_to: vec![],
            tags: vec![],
            category: RuleCategory::BiodiversityOffset,
            config: CategoryConfig::BiodiversityOffset(BiodiversityOffsetConfig {
                clearing_field: "clearing_area_sqm".to_string(),
                trigger_threshold_sqm: 500.0,
                offset_ratio: 2.0,
                offset_fields: vec!["offset_area_sqm".to_string()],
            }),
        }
    }

    fn extraction(fields: Vec<(&str, Value)>) -> ExtractionOutput {
        ExtractionOutput {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
            ..ExtractionOutput::default()
        }
    }

    #[test]
    fn no_clearing_declared_is_inapplicable() {
        assert_eq!(
            evaluate(&rule(), &ExtractionOutput::default(), &EvalContext::default()).unwrap(),
            None
        );
    }

    #[test]
    fn below_trigger_passes() {
        let finding = evaluate(
            &rule(),
            &extraction(vec![("clearing_area_sqm", json!(120))]),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
    }

    #[test]
    fn above_trigger_without_offset_needs_review() {
        let finding = evaluate(
            &rule(),
            &extraction(vec![("clearing_area_sqm", json!(800))]),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert_eq!(finding.missing_fields, vec!["offset_area_sqm".to_string()]);
    }

    #[test]
    fn inadequate_offset_fails_with_ratio_in_evidence() {
        let finding = evaluate(
            &rule(),
            &extraction(vec![
                ("clearing_area_sqm", json!(800)),
                ("offset_area_sqm", json!(1000)),
            ]),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::Fail);
        assert!(finding.evidence[0].snippet.contains("requires 1600"));
    }

    #[test]
    fn adequate_offset_passes() {
        let finding = evaluate(
            &rule(),
            &extraction(vec![
                ("clearing_area_sqm", json!(800)),
                ("offset_area_sqm", json!(1600)),
            ]),
            &EvalContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
    }
}
