//! Generic presence semantics: the default `field_required` category.

use planvet_catalogue::Rule;
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::Value;

use crate::finding::{Finding, FindingStatus, MAX_FINDING_EVIDENCE};

/// Whether an extracted value counts as present: a non-null scalar
/// (strings non-blank), a non-empty list, or a non-empty object.
pub fn field_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
    }
}

/// Evaluate AND/OR presence semantics over a rule's required fields.
pub fn evaluate_presence(rule: &Rule, extraction: &ExtractionOutput) -> Finding {
    if rule.required_fields.is_empty() {
        return Finding::pass(&rule.rule_id, rule.severity, "no required fields configured");
    }

    let missing: Vec<String> = rule
        .required_fields
        .iter()
        .filter(|field| !field_present(extraction.fields.get(field.as_str())))
        .cloned()
        .collect();

    if rule.required_fields_any {
        // OR semantics: one present field satisfies the rule; otherwise
        // the finding reports the full configured list, not a subset.
        if missing.len() < rule.required_fields.len() {
            return Finding::pass(
                &rule.rule_id,
                rule.severity,
                format!("at least one of [{}] is present", rule.required_fields.join(", ")),
            );
        }
        return failure(rule, extraction, rule.required_fields.clone());
    }

    // AND semantics: the finding reports exactly the absent subset.
    if missing.is_empty() {
        return Finding::pass(&rule.rule_id, rule.severity, "all required fields present");
    }
    failure(rule, extraction, missing)
}

fn failure(rule: &Rule, extraction: &ExtractionOutput, missing: Vec<String>) -> Finding {
    let message = format!("missing required fields: {}", missing.join(", "));
    let evidence = assemble_evidence(rule, extraction);
    Finding::new(
        &rule.rule_id,
        rule.severity,
        FindingStatus::failure_for(rule.severity),
        message,
    )
    .with_missing_fields(missing)
    .with_evidence(evidence)
}

/// Assemble up to five grounding snippets for a failed presence check.
///
/// Field-keyed index entries come first, then generic hits that match
/// the rule's evidence keywords, then remaining generic hits — both
/// generic tiers gated on the rule's minimum confidence.
pub fn assemble_evidence(rule: &Rule, extraction: &ExtractionOutput) -> Vec<Evidence> {
    let mut out: Vec<Evidence> = Vec::new();

    for field in &rule.required_fields {
        for evidence in extraction.evidence_for(field) {
            if out.len() >= MAX_FINDING_EVIDENCE {
                return out;
            }
            out.push(evidence.clone());
        }
    }

    let min_confidence = rule.evidence.min_confidence;
    let keyword_match = |snippet: &str| {
        rule.evidence
            .keywords
            .iter()
            .any(|keyword| snippet.to_lowercase().contains(&keyword.to_lowercase()))
    };

    let source_ok = |evidence: &Evidence| {
        rule.evidence.source_types.is_empty()
            || evidence
                .source_type
                .as_deref()
                .is_some_and(|s| rule.evidence.source_types.iter().any(|t| t == s))
    };
    let generic: Vec<&Evidence> = extraction
        .evidence_index
        .iter()
        .filter(|(key, _)| !rule.required_fields.iter().any(|f| f == *key))
        .flat_map(|(_, refs)| refs.as_slice())
        .filter(|evidence| evidence.confidence >= min_confidence && source_ok(evidence))
        .collect();

    for evidence in generic.iter().filter(|e| keyword_match(&e.snippet)) {
        if out.len() >= MAX_FINDING_EVIDENCE {
            return out;
        }
        out.push((*evidence).clone());
    }
    for evidence in generic.iter().filter(|e| !keyword_match(&e.snippet)) {
        if out.len() >= MAX_FINDING_EVIDENCE {
            return out;
        }
        out.push((*evidence).clone());
    }

    out
}
