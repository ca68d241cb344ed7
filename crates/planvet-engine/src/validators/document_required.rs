//! Document-requirement validator: are the mandatory document types
//! actually present for the submission?

use planvet_catalogue::{CategoryConfig, Rule};
use planvet_entities::{Evidence, ExtractionOutput};
use std::collections::BTreeSet;

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};
use crate::outcome::SkipReason;

pub fn evaluate(rule: &Rule, _extraction: &ExtractionOutput, ctx: &EvalContext) -> ValidatorResult {
    let (store, submission) = ctx.submission()?;

    let expected: Vec<String> = match &rule.config {
        CategoryConfig::DocumentRequired(config)
            if !config.application_type_required_fields.is_empty() =>
        {
            let app_type = ctx
                .effective_application_type()
                .ok_or(SkipReason::MissingApplicationType)?;
            match config
                .application_type_required_fields
                .get(&app_type)
                .or_else(|| config.application_type_required_fields.get("default"))
            {
                Some(types) => types.clone(),
                // Neither the application type nor a default entry is
                // configured: the rule does not cover this application.
                None => return Ok(None),
            }
        }
        _ => rule.required_fields.clone(),
    };
    if expected.is_empty() {
        return Ok(None);
    }

    let present = store.document_types_of_submission(&submission.id);
    let missing: Vec<String> = expected
        .iter()
        .filter(|doc_type| !present.contains(*doc_type))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            format!("all {} required document types present", expected.len()),
        )));
    }

    let evidence = present_document_evidence(store, &submission.id);
    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::failure_for(rule.severity),
            format!("missing required documents: {}", missing.join(", ")),
        )
        .with_missing_fields(missing)
        .with_evidence(evidence),
    ))
}

/// Snippets describing what *is* lodged, for officer context.
fn present_document_evidence(
    store: &planvet_entities::EntityStore,
    submission_id: &str,
) -> Vec<Evidence> {
    let mut seen = BTreeSet::new();
    store
        .documents_of_submission(submission_id)
        .into_iter()
        .filter(|doc| seen.insert(doc.id.clone()))
        .map(|doc| {
            Evidence::new(
                format!("present: {} ({})", doc.filename, doc.document_type),
                None,
                1.0,
            )
            .with_source_type("document_inventory")
        })
        .collect()
}
