//! Validation orchestrator: dispatch every catalogue rule, aggregate
//! findings into a summary, accumulate the escalation flag.

use planvet_catalogue::Catalogue;
use planvet_entities::ExtractionOutput;
use std::collections::BTreeSet;
use tracing::warn;

use crate::context::EvalContext;
use crate::outcome::{RuleOutcome, SkippedRule, ValidationOutcome, ValidationSummary};
use crate::validators;

/// Evaluate the full catalogue against one document context.
pub fn evaluate(
    extraction: &ExtractionOutput,
    catalogue: &Catalogue,
    ctx: &EvalContext,
) -> ValidationOutcome {
    evaluate_filtered(extraction, catalogue, ctx, None)
}

/// Evaluate the catalogue, optionally restricted to a rule-ID subset
/// (targeted re-validation after a delta).
///
/// `needs_llm` is OR-accumulated across every evaluated rule: one
/// error-severity finding that is not a pass sets it for the whole run,
/// no matter what is evaluated afterwards.
pub fn evaluate_filtered(
    extraction: &ExtractionOutput,
    catalogue: &Catalogue,
    ctx: &EvalContext,
    rule_filter: Option<&BTreeSet<String>>,
) -> ValidationOutcome {
    let mut summary = ValidationSummary {
        rule_count: catalogue.len(),
        catalogue_digest: catalogue.digest(),
        ..ValidationSummary::default()
    };
    let mut findings = Vec::new();
    let mut skipped = Vec::new();

    for rule in catalogue.rules() {
        if let Some(filter) = rule_filter {
            if !filter.contains(&rule.rule_id) {
                continue;
            }
        }
        // A rule scoped to other document types is silently filtered:
        // not evaluated, not a skip worth warning about.
        if !rule.applies_to_document(ctx.document_type) {
            continue;
        }

        match validators::dispatch(rule, extraction, ctx) {
            RuleOutcome::Finding(finding) => {
                summary.absorb(&finding);
                findings.push(finding);
            }
            RuleOutcome::NotApplicable => {}
            RuleOutcome::Skipped(reason) => {
                warn!(
                    rule_id = %rule.rule_id,
                    %reason,
                    "rule skipped: required context absent"
                );
                summary.skipped += 1;
                skipped.push(SkippedRule {
                    rule_id: rule.rule_id.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    findings.sort();

    ValidationOutcome {
        summary,
        findings,
        skipped,
        context: ctx.echo(),
    }
}
