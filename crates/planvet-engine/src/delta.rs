//! Delta engine: map a resubmission's changeset onto the catalogue
//! rules worth re-running, and score how impactful the delta is.

use planvet_catalogue::{CategoryConfig, Catalogue, Rule};
use planvet_entities::{ChangeItem, ChangeKind, ChangeSet, EntityStore};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::EngineError;

/// Rules impacted by the changes in one changeset: the union, across
/// change items, of every rule whose required fields, document
/// requirements, or spatial-metric thresholds reference the changed
/// entity. An empty changeset impacts nothing.
pub fn compute_impacted_rules(
    store: &EntityStore,
    changeset_id: &str,
    catalogue: &Catalogue,
) -> Result<BTreeSet<String>, EngineError> {
    let changeset = store
        .changeset(changeset_id)
        .ok_or_else(|| EngineError::ChangeSetNotFound(changeset_id.to_string()))?;

    let mut impacted = BTreeSet::new();
    for item in &changeset.items {
        for rule in catalogue.rules() {
            if rule_impacted_by(rule, item) {
                impacted.insert(rule.rule_id.clone());
            }
        }
    }
    Ok(impacted)
}

fn rule_impacted_by(rule: &Rule, item: &ChangeItem) -> bool {
    match item.kind {
        ChangeKind::FieldDelta => rule_references_field(rule, &item.entity_name),
        ChangeKind::DocumentDelta => rule_references_document_type(rule, &item.entity_name),
        ChangeKind::SpatialMetricDelta => rule_references_metric(rule, &item.entity_name),
    }
}

fn rule_references_field(rule: &Rule, field: &str) -> bool {
    if rule.required_fields.iter().any(|f| f == field) {
        return true;
    }
    match &rule.config {
        CategoryConfig::Ownership(config) => config.certificate_field == field,
        CategoryConfig::PriorApproval(config) => {
            config.decision_field == field
                || config.reference_field == field
                || config.expiry_field.as_deref() == Some(field)
        }
        CategoryConfig::Constraint(config) => {
            config.trigger_fields.iter().any(|f| f == field)
        }
        CategoryConfig::BiodiversityOffset(config) => {
            config.clearing_field == field || config.offset_fields.iter().any(|f| f == field)
        }
        CategoryConfig::PlanQuality(config) => config.scale_field == field,
        _ => false,
    }
}

fn rule_references_document_type(rule: &Rule, doc_type: &str) -> bool {
    if rule.applies_to.iter().any(|t| t == doc_type) {
        return true;
    }
    match &rule.config {
        CategoryConfig::DocumentRequired(config) => config
            .application_type_required_fields
            .values()
            .any(|types| types.iter().any(|t| t == doc_type)),
        // Document-required rules without a per-type map expect the
        // types listed in required_fields.
        _ => {
            rule.category == planvet_catalogue::RuleCategory::DocumentRequired
                && rule.required_fields.iter().any(|t| t == doc_type)
        }
    }
}

fn rule_references_metric(rule: &Rule, metric: &str) -> bool {
    let CategoryConfig::Spatial(config) = &rule.config else {
        return false;
    };
    (config.min_setback_m.is_some() && metric.contains("setback"))
        || (config.max_height_m.is_some() && metric.contains("height"))
        || ((config.min_area_sqm.is_some() || config.max_area_sqm.is_some())
            && metric.contains("area"))
}

fn safety_relevant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)height|setback|fire|flood|structural|heritage|contaminat")
            .expect("safety-relevance regex must compile")
    })
}

/// Weighted significance of a changeset in [0, 1].
///
/// Safety-relevant entities (heights, setbacks, fire/flood exposure …)
/// weigh double. Reporting signal only: targeted re-validation always
/// covers the full impacted-rule set regardless of this score.
pub fn significance_score(changeset: &ChangeSet) -> f64 {
    if changeset.items.is_empty() {
        return 0.0;
    }

    let mut weighted = 0.0;
    let mut weights = 0.0;
    for item in &changeset.items {
        let weight = if safety_relevant_re().is_match(&item.entity_name) {
            2.0
        } else {
            1.0
        };
        weighted += item.significance.clamp(0.0, 1.0) * weight;
        weights += weight;
    }
    (weighted / weights).clamp(0.0, 1.0)
}
