//! Prior-approval validator: a claimed earlier consent must carry a
//! reference and must not have lapsed.

use chrono::{NaiveDate, Utc};
use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::ExtractionOutput;
use serde_json::{Value, json};

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};
use crate::presence::field_present;

pub fn evaluate(rule: &Rule, extraction: &ExtractionOutput, _ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::PriorApproval(config) = &rule.config else {
        return Ok(None);
    };

    let decision = extraction.fields.get(config.decision_field.as_str());
    if !field_present(decision) {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::NeedsReview,
                format!(
                    "prior-approval decision field '{}' not extracted",
                    config.decision_field
                ),
            )
            .with_missing_fields(vec![config.decision_field.clone()]),
        ));
    }

    if !field_present(extraction.fields.get(config.reference_field.as_str())) {
        return Ok(Some(
            Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::failure_for(rule.severity),
                format!(
                    "prior approval claimed without a reference in '{}'",
                    config.reference_field
                ),
            )
            .with_missing_fields(vec![config.reference_field.clone()]),
        ));
    }

    if let Some(expiry_field) = &config.expiry_field
        && let Some(raw) = extraction.fields.get(expiry_field.as_str())
        && field_present(Some(raw))
    {
        let Some(expiry) = parse_date(raw) else {
            return Ok(Some(Finding::new(
                &rule.rule_id,
                rule.severity,
                FindingStatus::NeedsReview,
                format!("prior-approval expiry '{raw}' is not a recognisable date"),
            )));
        };
        let today = Utc::now().date_naive();
        if expiry < today {
            return Ok(Some(
                Finding::new(
                    &rule.rule_id,
                    rule.severity,
                    FindingStatus::Fail,
                    format!("prior approval lapsed on {expiry}"),
                )
                .with_details(json!({ "expired_on": expiry.to_string() })),
            ));
        }
    }

    Ok(Some(Finding::pass(
        &rule.rule_id,
        rule.severity,
        "prior approval referenced and current",
    )))
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .ok()
}
