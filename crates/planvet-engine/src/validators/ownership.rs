//! Ownership validator: the lodged ownership certificate must be an
//! accepted type.

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::ExtractionOutput;
use serde_json::{Value, json};

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, _ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::Ownership(config) = &rule.config else {
        return Ok(None);
    };

    let Some(value) = extraction.fields.get(config.certificate_field.as_str()) else {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::failure_for(rule.severity),
                format!(
                    "ownership certificate field '{}' not extracted",
                    config.certificate_field
                ),
            )
            .with_missing_fields(vec![config.certificate_field.clone()]),
        ));
    };

    let declared = match value {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Ok(Some(Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::NeedsReview,
                format!(
                    "ownership certificate field '{}' has no usable value: {value}",
                    config.certificate_field
                ),
            )));
        }
    };

    let accepted = config
        .accepted_certificates
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&declared));

    if accepted {
        return Ok(Some(
            Finding::pass(
                &rule.rule_id,
                rule.severity,
                format!("ownership certificate '{declared}' is accepted"),
            )
            .with_evidence(extraction.evidence_for(&config.certificate_field).to_vec()),
        ));
    }

    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::failure_for(rule.severity),
            format!(
                "ownership certificate '{declared}' is not an accepted type ({})",
                config.accepted_certificates.join(", ")
            ),
        )
        .with_evidence(extraction.evidence_for(&config.certificate_field).to_vec())
        .with_details(json!({
            "declared": declared,
            "accepted": config.accepted_certificates,
        })),
    ))
}
