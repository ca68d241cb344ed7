//! Cross-document consistency validator: the same field should not tell
//! two different stories across the documents of one submission.

use planvet_catalogue::Rule;
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, _extraction: &ExtractionOutput, ctx: &EvalContext) -> ValidatorResult {
    let (store, submission) = ctx.submission()?;

    let mut conflicting_fields: Vec<String> = Vec::new();
    let mut evidence: Vec<Evidence> = Vec::new();

    for field in &rule.required_fields {
        let values = store.field_values_across_submission(&submission.id, field);

        // Group by canonical value; zero or one group is agreement.
        let mut groups: BTreeMap<String, Vec<(&str, &Value)>> = BTreeMap::new();
        for (document, value) in values {
            groups
                .entry(canonical(value))
                .or_default()
                .push((document.filename.as_str(), value));
        }
        if groups.len() <= 1 {
            continue;
        }

        conflicting_fields.push(field.clone());
        for members in groups.values() {
            for (filename, value) in members {
                evidence.push(Evidence::new(
                    format!("{filename}: {field} = {value}"),
                    None,
                    1.0,
                ));
            }
        }
    }

    if conflicting_fields.is_empty() {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            "no cross-document conflicts",
        )));
    }

    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            format!(
                "conflicting values across documents for: {}",
                conflicting_fields.join(", ")
            ),
        )
        .with_evidence(evidence)
        .with_details(json!({ "conflicting_fields": conflicting_fields })),
    ))
}

/// Canonical comparison form: strings compare trimmed, whitespace-folded
/// and case-insensitive; everything else compares by JSON rendering.
fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
        other => other.to_string(),
    }
}
