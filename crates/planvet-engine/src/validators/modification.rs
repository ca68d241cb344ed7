//! Modification validator: a resubmission must carry a computed delta.

use planvet_catalogue::Rule;
use planvet_entities::ExtractionOutput;
use serde_json::json;

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, _extraction: &ExtractionOutput, ctx: &EvalContext) -> ValidatorResult {
    let (store, submission) = ctx.submission()?;

    // The original lodgement has no parent and no delta to check.
    if submission.is_original() {
        return Ok(Some(Finding::pass(
            &rule.rule_id,
            rule.severity,
            "original submission; no modification delta expected",
        )));
    }

    if submission.parent_id.is_none() {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            format!(
                "modification V{} has no parent submission reference",
                submission.version
            ),
        )));
    }

    let Some(changeset) = store.changeset_for_submission(&submission.id) else {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            "no changeset recorded for this modification; delta not yet computed",
        )));
    };

    if changeset.is_empty() {
        // An empty delta for a resubmission means the computation is
        // incomplete, not that nothing changed.
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            "changeset has no change items; delta computation judged incomplete",
        )));
    }

    Ok(Some(
        Finding::pass(
            &rule.rule_id,
            rule.severity,
            format!(
                "modification delta recorded with {} change item(s)",
                changeset.items.len()
            ),
        )
        .with_details(json!({
            "changeset_id": changeset.id,
            "change_count": changeset.items.len(),
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_catalogue::{CategoryConfig, EvidenceExpectation, RuleCategory, Severity};
    use planvet_entities::{
        Application, ChangeItem, ChangeKind, ChangeSet, EntityStore, Submission,
    };

    fn rule() -> Rule {
        Rule {
            rule_id: "modification.delta".to_string(),
            title: "Modification delta recorded".to_string(),
            description: String::new(),
            required_fields: vec![],
            required_fields_any: false,
            evidence: EvidenceExpectation::default(),
            severity: Severity::Error,
            applies_to: vec![],
            tags: vec![],
            category: RuleCategory::Modification,
            config: CategoryConfig::None,
        }
    }

    fn store_with_versions() -> EntityStore {
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        let v0 = Submission::original("sub_0", "app_1");
        store.upsert_submission(v0.clone()).unwrap();
        store
            .upsert_submission(Submission::modification("sub_1", &v0))
            .unwrap();
        store
    }

    fn ctx<'a>(store: &'a EntityStore, submission_id: &'a str) -> EvalContext<'a> {
        EvalContext {
            store: Some(store),
            submission_id: Some(submission_id),
            ..EvalContext::default()
        }
    }

    #[test]
    fn original_always_passes() {
        let store = store_with_versions();
        let finding = evaluate(&rule(), &ExtractionOutput::default(), &ctx(&store, "sub_0"))
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
    }

    #[test]
    fn missing_changeset_needs_review() {
        let store = store_with_versions();
        let finding = evaluate(&rule(), &ExtractionOutput::default(), &ctx(&store, "sub_1"))
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert!(finding.message.contains("no changeset"));
    }

    #[test]
    fn empty_changeset_never_passes() {
        let mut store = store_with_versions();
        store.upsert_changeset(ChangeSet::new("chg_1", "sub_1", "sub_0", vec![]));
        let finding = evaluate(&rule(), &ExtractionOutput::default(), &ctx(&store, "sub_1"))
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::NeedsReview);
        assert!(finding.message.contains("incomplete"));
    }

    #[test]
    fn populated_changeset_passes() {
        let mut store = store_with_versions();
        store.upsert_changeset(ChangeSet::new(
            "chg_1",
            "sub_1",
            "sub_0",
            vec![ChangeItem::new(
                ChangeKind::FieldDelta,
                "building_height_m",
                Some(serde_json::json!(8.5)),
                Some(serde_json::json!(9.5)),
                0.8,
            )],
        ));
        let finding = evaluate(&rule(), &ExtractionOutput::default(), &ctx(&store, "sub_1"))
            .unwrap()
            .unwrap();
        assert_eq!(finding.status, FindingStatus::Pass);
        assert_eq!(finding.details.unwrap()["change_count"], 1);
    }
}
