//! Spatial-threshold validator: derived geometry metrics against
//! configured setback/height/area bounds.

use planvet_catalogue::{CategoryConfig, Rule, SpatialConfig};
use planvet_entities::{Evidence, ExtractionOutput};
use serde_json::json;

use super::ValidatorResult;
use crate::context::EvalContext;
use crate::finding::{Finding, FindingStatus};

pub fn evaluate(rule: &Rule, _extraction: &ExtractionOutput, ctx: &EvalContext) -> ValidatorResult {
    let CategoryConfig::Spatial(config) = &rule.config else {
        return Ok(None);
    };
    let (store, submission) = ctx.submission()?;

    let features = store.geometry_of_submission(&submission.id);
    if features.is_empty() {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            "no geometry features recorded for the submission; spatial thresholds cannot be validated",
        )));
    }

    let metrics: Vec<(String, f64)> = features
        .iter()
        .flat_map(|feature| {
            feature
                .metrics
                .iter()
                .map(|(name, value)| (name.clone(), *value))
        })
        .collect();
    if metrics.is_empty() {
        return Ok(Some(Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::NeedsReview,
            "geometry features carry no derived metrics; spatial thresholds cannot be validated",
        )));
    }

    let checks = threshold_checks(config);
    let mut violations: Vec<String> = Vec::new();
    let mut evidence: Vec<Evidence> = Vec::new();
    for (name, value) in &metrics {
        for check in &checks {
            if !name.contains(check.metric_substring) {
                continue;
            }
            if (check.violated)(*value) {
                violations.push(format!(
                    "{name} = {value} violates {} {}",
                    check.label, check.bound
                ));
                evidence.push(Evidence::new(
                    format!("{name} = {value} ({} {})", check.label, check.bound),
                    None,
                    1.0,
                ));
            } else {
                evidence.push(Evidence::new(
                    format!("{name} = {value} within {} {}", check.label, check.bound),
                    None,
                    1.0,
                ));
            }
        }
    }

    if violations.is_empty() {
        return Ok(Some(
            Finding::pass(&rule.rule_id, rule.severity, "all spatial thresholds satisfied")
                .with_evidence(evidence),
        ));
    }

    Ok(Some(
        Finding::new(
            &rule.rule_id,
            rule.severity,
            FindingStatus::Fail,
            format!("spatial threshold violations: {}", violations.join("; ")),
        )
        .with_evidence(evidence)
        .with_details(json!({ "violations": violations })),
    ))
}

struct ThresholdCheck {
    metric_substring: &'static str,
    label: &'static str,
    bound: f64,
    violated: Box<dyn Fn(f64) -> bool>,
}

fn threshold_checks(config: &SpatialConfig) -> Vec<ThresholdCheck> {
    let mut checks: Vec<ThresholdCheck> = Vec::new();
    if let Some(min) = config.min_setback_m {
        checks.push(ThresholdCheck {
            metric_substring: "setback",
            label: "minimum setback",
            bound: min,
            violated: Box::new(move |v| v < min),
        });
    }
    if let Some(max) = config.max_height_m {
        checks.push(ThresholdCheck {
            metric_substring: "height",
            label: "maximum height",
            bound: max,
            violated: Box::new(move |v| v > max),
        });
    }
    if let Some(min) = config.min_area_sqm {
        checks.push(ThresholdCheck {
            metric_substring: "area",
            label: "minimum area",
            bound: min,
            violated: Box::new(move |v| v < min),
        });
    }
    if let Some(max) = config.max_area_sqm {
        checks.push(ThresholdCheck {
            metric_substring: "area",
            label: "maximum area",
            bound: max,
            violated: Box::new(move |v| v > max),
        });
    }
    checks
}
