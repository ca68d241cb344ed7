//! Typed per-category rule configuration.
//!
//! Catalogue sources carry an open `config` map per rule. That map is
//! parsed into one of these structures at load time, keyed by the rule's
//! category. A malformed threshold rejects the whole catalogue at load,
//! never a single rule at evaluation time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::rule::RuleCategory;

/// A closed fee range in the application's fee currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeeRange {
    pub min: f64,
    pub max: f64,
}

/// Expected document types per application type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DocumentRequiredConfig {
    /// Keyed by application type; the `default` key is the fallback set.
    #[serde(default)]
    pub application_type_required_fields: BTreeMap<String, Vec<String>>,
}

/// Spatial metric thresholds. All optional, at least one must be set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SpatialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_setback_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area_sqm: Option<f64>,
}

impl SpatialConfig {
    pub fn is_empty(&self) -> bool {
        self.min_setback_m.is_none()
            && self.max_height_m.is_none()
            && self.min_area_sqm.is_none()
            && self.max_area_sqm.is_none()
    }
}

/// Acceptable fee ranges by declared application type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FeeConfig {
    #[serde(default)]
    pub ranges: BTreeMap<String, FeeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_range: Option<FeeRange>,
}

impl FeeConfig {
    /// Resolve the range for an application type, falling back to the
    /// default range.
    pub fn range_for(&self, application_type: &str) -> Option<FeeRange> {
        self.ranges
            .get(application_type)
            .copied()
            .or(self.default_range)
    }
}

/// Ownership certificate expectations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OwnershipConfig {
    pub certificate_field: String,
    pub accepted_certificates: Vec<String>,
}

/// Prior-approval decision expectations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PriorApprovalConfig {
    pub decision_field: String,
    pub reference_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_field: Option<String>,
}

/// Constraint-flag expectations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConstraintConfig {
    pub trigger_fields: Vec<String>,
    /// Keywords expected in supporting evidence. Empty falls back to the
    /// rule-level evidence keywords.
    #[serde(default)]
    pub evidence_keywords: Vec<String>,
}

/// Ecological-offset expectations for vegetation clearing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BiodiversityOffsetConfig {
    pub clearing_field: String,
    pub trigger_threshold_sqm: f64,
    pub offset_ratio: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offset_fields: Vec<String>,
}

/// Plan presentation expectations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanQualityConfig {
    pub scale_field: String,
    pub acceptable_scales: Vec<String>,
}

/// Typed per-category configuration attached to a rule.
///
/// `None` is the empty configuration carried by categories that need no
/// thresholds (presence, consistency, modification).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CategoryConfig {
    #[default]
    None,
    DocumentRequired(DocumentRequiredConfig),
    Spatial(SpatialConfig),
    Fee(FeeConfig),
    Ownership(OwnershipConfig),
    PriorApproval(PriorApprovalConfig),
    Constraint(ConstraintConfig),
    BiodiversityOffset(BiodiversityOffsetConfig),
    PlanQuality(PlanQualityConfig),
}

impl CategoryConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, CategoryConfig::None)
    }

    /// Parse and validate the raw config map for a rule category.
    ///
    /// Categories without thresholds reject a non-empty map so that stale
    /// or misspelled configuration is caught at load, not silently
    /// ignored.
    pub fn from_raw(category: RuleCategory, raw: Option<&Value>) -> Result<Self, String> {
        let raw = match raw {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(value) => Some(value),
        };

        match category {
            RuleCategory::FieldRequired
            | RuleCategory::Consistency
            | RuleCategory::Modification => match raw {
                None => Ok(CategoryConfig::None),
                Some(_) => Err(format!(
                    "category '{category}' takes no config, found a non-empty map"
                )),
            },
            RuleCategory::DocumentRequired => match raw {
                None => Ok(CategoryConfig::DocumentRequired(
                    DocumentRequiredConfig::default(),
                )),
                Some(value) => {
                    let config: DocumentRequiredConfig = parse(value)?;
                    for (app_type, fields) in &config.application_type_required_fields {
                        if fields.is_empty() {
                            return Err(format!(
                                "document-required config for '{app_type}' lists no document types"
                            ));
                        }
                    }
                    Ok(CategoryConfig::DocumentRequired(config))
                }
            },
            RuleCategory::Spatial => {
                let config: SpatialConfig = parse(required(raw, category)?)?;
                if config.is_empty() {
                    return Err("spatial config sets no thresholds".to_string());
                }
                for (label, bound) in [
                    ("min_setback_m", config.min_setback_m),
                    ("max_height_m", config.max_height_m),
                    ("min_area_sqm", config.min_area_sqm),
                    ("max_area_sqm", config.max_area_sqm),
                ] {
                    if let Some(value) = bound
                        && value < 0.0
                    {
                        return Err(format!("spatial threshold '{label}' must be non-negative"));
                    }
                }
                Ok(CategoryConfig::Spatial(config))
            }
            RuleCategory::Fee => {
                let config: FeeConfig = parse(required(raw, category)?)?;
                if config.ranges.is_empty() && config.default_range.is_none() {
                    return Err("fee config declares no ranges".to_string());
                }
                for (app_type, range) in config
                    .ranges
                    .iter()
                    .map(|(k, v)| (k.as_str(), v))
                    .chain(config.default_range.iter().map(|v| ("default", v)))
                {
                    if range.min > range.max {
                        return Err(format!(
                            "fee range for '{app_type}' has min {} above max {}",
                            range.min, range.max
                        ));
                    }
                }
                Ok(CategoryConfig::Fee(config))
            }
            RuleCategory::Ownership => {
                let config: OwnershipConfig = parse(required(raw, category)?)?;
                if config.certificate_field.trim().is_empty() {
                    return Err("ownership config needs a certificate_field".to_string());
                }
                if config.accepted_certificates.is_empty() {
                    return Err("ownership config lists no accepted certificates".to_string());
                }
                Ok(CategoryConfig::Ownership(config))
            }
            RuleCategory::PriorApproval => {
                let config: PriorApprovalConfig = parse(required(raw, category)?)?;
                if config.decision_field.trim().is_empty()
                    || config.reference_field.trim().is_empty()
                {
                    return Err(
                        "prior-approval config needs decision_field and reference_field"
                            .to_string(),
                    );
                }
                Ok(CategoryConfig::PriorApproval(config))
            }
            RuleCategory::Constraint => {
                let config: ConstraintConfig = parse(required(raw, category)?)?;
                if config.trigger_fields.is_empty() {
                    return Err("constraint config lists no trigger fields".to_string());
                }
                Ok(CategoryConfig::Constraint(config))
            }
            RuleCategory::BiodiversityOffset => {
                let config: BiodiversityOffsetConfig = parse(required(raw, category)?)?;
                if config.clearing_field.trim().is_empty() {
                    return Err("biodiversity-offset config needs a clearing_field".to_string());
                }
                if config.trigger_threshold_sqm <= 0.0 {
                    return Err("biodiversity-offset trigger threshold must be positive".to_string());
                }
                if config.offset_ratio < 0.0 {
                    return Err("biodiversity-offset ratio must be non-negative".to_string());
                }
                Ok(CategoryConfig::BiodiversityOffset(config))
            }
            RuleCategory::PlanQuality => {
                let config: PlanQualityConfig = parse(required(raw, category)?)?;
                if config.scale_field.trim().is_empty() {
                    return Err("plan-quality config needs a scale_field".to_string());
                }
                if config.acceptable_scales.is_empty() {
                    return Err("plan-quality config lists no acceptable scales".to_string());
                }
                Ok(CategoryConfig::PlanQuality(config))
            }
        }
    }
}

fn required(raw: Option<&Value>, category: RuleCategory) -> Result<&Value, String> {
    raw.ok_or_else(|| format!("category '{category}' requires a config map"))
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_category_rejects_config() {
        let err = CategoryConfig::from_raw(
            RuleCategory::FieldRequired,
            Some(&json!({"min": 1})),
        )
        .unwrap_err();
        assert!(err.contains("takes no config"));
    }

    #[test]
    fn presence_category_accepts_empty_config() {
        let config = CategoryConfig::from_raw(RuleCategory::FieldRequired, Some(&json!({})))
            .expect("empty map should be accepted");
        assert!(config.is_none());
    }

    #[test]
    fn fee_config_resolves_with_default_fallback() {
        let config = CategoryConfig::from_raw(
            RuleCategory::Fee,
            Some(&json!({
                "ranges": {"householder": {"min": 100.0, "max": 500.0}},
                "default_range": {"min": 50.0, "max": 5000.0}
            })),
        )
        .expect("fee config should parse");
        let CategoryConfig::Fee(fee) = config else {
            panic!("expected fee config");
        };
        assert_eq!(fee.range_for("householder").unwrap().min, 100.0);
        assert_eq!(fee.range_for("commercial").unwrap().max, 5000.0);
    }

    #[test]
    fn fee_config_rejects_inverted_range() {
        let err = CategoryConfig::from_raw(
            RuleCategory::Fee,
            Some(&json!({"ranges": {"householder": {"min": 500.0, "max": 100.0}}})),
        )
        .unwrap_err();
        assert!(err.contains("min 500 above max 100"));
    }

    #[test]
    fn spatial_config_requires_a_threshold() {
        let err =
            CategoryConfig::from_raw(RuleCategory::Spatial, Some(&json!({"min_setback_m": null})))
                .unwrap_err();
        assert!(err.contains("no thresholds"));
    }

    #[test]
    fn spatial_config_rejects_negative_threshold() {
        let err =
            CategoryConfig::from_raw(RuleCategory::Spatial, Some(&json!({"max_height_m": -2.0})))
                .unwrap_err();
        assert!(err.contains("non-negative"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CategoryConfig::from_raw(
            RuleCategory::Spatial,
            Some(&json!({"max_height": 9.0})),
        )
        .unwrap_err();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn document_required_accepts_missing_config() {
        let config = CategoryConfig::from_raw(RuleCategory::DocumentRequired, None)
            .expect("document-required config is optional");
        assert!(matches!(config, CategoryConfig::DocumentRequired(_)));
    }

    #[test]
    fn plan_quality_requires_scales() {
        let err = CategoryConfig::from_raw(
            RuleCategory::PlanQuality,
            Some(&json!({"scale_field": "plan_scale", "acceptable_scales": []})),
        )
        .unwrap_err();
        assert!(err.contains("no acceptable scales"));
    }
}
