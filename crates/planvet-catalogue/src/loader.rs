//! Catalogue loading: serialized rule records in, ordered `Rule` set out.
//!
//! A validation run cannot proceed with zero rules, so an absent, empty,
//! or malformed catalogue is a fatal load error — propagated, never
//! retried, never degraded to a warning.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::config::CategoryConfig;
use crate::rule::{EvidenceExpectation, Rule, RuleCategory, Severity};

pub const CATALOGUE_SCHEMA: &str = "planvet.catalogue.v1";

/// Errors raised while loading or validating a catalogue.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue source missing: {path}: {message}")]
    Missing { path: String, message: String },

    #[error("catalogue parse failure: {0}")]
    Parse(String),

    #[error("catalogue is empty: a validation run with zero rules is meaningless")]
    Empty,

    #[error("invalid rule id: {0:?}")]
    InvalidRuleId(String),

    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("rule {rule_id}: {message}")]
    InvalidRule { rule_id: String, message: String },
}

/// Wire form of one rule record, before config typing.
#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    rule_id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required_fields: Vec<String>,
    #[serde(default)]
    required_fields_any: bool,
    #[serde(default)]
    evidence: EvidenceExpectation,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    applies_to: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    rule_category: RuleCategory,
    #[serde(default)]
    config: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCatalogue {
    #[serde(default)]
    version: Option<String>,
    rules: Vec<RawRule>,
}

/// An ordered, immutable rule set.
#[derive(Debug, Clone, Serialize)]
pub struct Catalogue {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    rules: Vec<Rule>,
}

impl Catalogue {
    /// Load a catalogue from a JSON or TOML file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CatalogueError::Missing {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let raw: RawCatalogue = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::from_str(&text).map_err(|e| CatalogueError::Parse(e.to_string()))?
            }
            _ => serde_json::from_str(&text).map_err(|e| CatalogueError::Parse(e.to_string()))?,
        };
        Self::from_raw(raw)
    }

    /// Parse a catalogue from an already-deserialized JSON value.
    pub fn parse(value: Value) -> Result<Self, CatalogueError> {
        let raw: RawCatalogue =
            serde_json::from_value(value).map_err(|e| CatalogueError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalogue) -> Result<Self, CatalogueError> {
        if raw.rules.is_empty() {
            return Err(CatalogueError::Empty);
        }

        let mut seen = BTreeSet::new();
        let mut rules = Vec::with_capacity(raw.rules.len());
        for record in raw.rules {
            if !Rule::valid_rule_id(&record.rule_id) {
                return Err(CatalogueError::InvalidRuleId(record.rule_id));
            }
            if !seen.insert(record.rule_id.clone()) {
                return Err(CatalogueError::DuplicateRuleId(record.rule_id));
            }
            if !(0.0..=1.0).contains(&record.evidence.min_confidence) {
                return Err(CatalogueError::InvalidRule {
                    rule_id: record.rule_id,
                    message: "evidence min_confidence must be within [0, 1]".to_string(),
                });
            }

            let config = CategoryConfig::from_raw(record.rule_category, record.config.as_ref())
                .map_err(|message| CatalogueError::InvalidRule {
                    rule_id: record.rule_id.clone(),
                    message,
                })?;

            rules.push(Rule {
                rule_id: record.rule_id,
                title: record.title,
                description: record.description,
                required_fields: record.required_fields,
                required_fields_any: record.required_fields_any,
                evidence: record.evidence,
                severity: record.severity,
                applies_to: record.applies_to,
                tags: record.tags,
                category: record.rule_category,
                config,
            });
        }

        Ok(Self {
            version: raw.version,
            rules,
        })
    }

    /// Rules in catalogue order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Lookup one rule by ID.
    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Deterministic digest over the typed rule set.
    ///
    /// Two catalogues with the same rules in the same order produce the
    /// same digest; run reports carry it so findings can be traced to the
    /// exact catalogue that produced them.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(CATALOGUE_SCHEMA.as_bytes());
        hasher.update([0u8]);
        if let Some(version) = &self.version {
            hasher.update(version.as_bytes());
        }
        hasher.update([0u8]);
        for rule in &self.rules {
            let line = serde_json::to_string(rule).unwrap_or_default();
            hasher.update(line.as_bytes());
            hasher.update([0u8]);
        }
        format!("cat1_{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_catalogue() -> Value {
        json!({
            "version": "2026.08",
            "rules": [
                {
                    "rule_id": "presence.site_address",
                    "title": "Site address must be stated",
                    "required_fields": ["site_address"],
                    "severity": "error"
                },
                {
                    "rule_id": "fee.range",
                    "title": "Fee within schedule",
                    "required_fields": ["fee_paid"],
                    "severity": "warning",
                    "rule_category": "fee",
                    "config": {"ranges": {"householder": {"min": 100.0, "max": 500.0}}}
                }
            ]
        })
    }

    #[test]
    fn parses_and_types_config() {
        let catalogue = Catalogue::parse(minimal_catalogue()).expect("catalogue should parse");
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.version(), Some("2026.08"));

        let fee = catalogue.rule("fee.range").expect("fee rule present");
        assert_eq!(fee.category, RuleCategory::Fee);
        assert!(matches!(fee.config, CategoryConfig::Fee(_)));
    }

    #[test]
    fn empty_catalogue_is_fatal() {
        let err = Catalogue::parse(json!({"rules": []})).unwrap_err();
        assert!(matches!(err, CatalogueError::Empty));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let err = Catalogue::parse(json!({
            "rules": [
                {"rule_id": "r.a", "title": "A"},
                {"rule_id": "r.a", "title": "A again"}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateRuleId(id) if id == "r.a"));
    }

    #[test]
    fn malformed_config_names_the_rule() {
        let err = Catalogue::parse(json!({
            "rules": [{
                "rule_id": "fee.bad",
                "title": "Bad fee",
                "rule_category": "fee",
                "config": {"ranges": {}}
            }]
        }))
        .unwrap_err();
        match err {
            CatalogueError::InvalidRule { rule_id, message } => {
                assert_eq!(rule_id, "fee.bad");
                assert!(message.contains("no ranges"));
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = Catalogue::parse(json!({
            "rules": [{
                "rule_id": "r.conf",
                "title": "Confidence",
                "evidence": {"min_confidence": 1.5}
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidRule { .. }));
    }

    #[test]
    fn digest_is_stable_and_order_sensitive() {
        let a = Catalogue::parse(minimal_catalogue()).unwrap();
        let b = Catalogue::parse(minimal_catalogue()).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert!(a.digest().starts_with("cat1_"));

        let reversed = Catalogue::parse(json!({
            "version": "2026.08",
            "rules": [
                {
                    "rule_id": "fee.range",
                    "title": "Fee within schedule",
                    "required_fields": ["fee_paid"],
                    "severity": "warning",
                    "rule_category": "fee",
                    "config": {"ranges": {"householder": {"min": 100.0, "max": 500.0}}}
                },
                {
                    "rule_id": "presence.site_address",
                    "title": "Site address must be stated",
                    "required_fields": ["site_address"],
                    "severity": "error"
                }
            ]
        }))
        .unwrap();
        assert_ne!(a.digest(), reversed.digest());
    }

    #[test]
    fn loads_toml_catalogue() {
        let dir = std::env::temp_dir().join(format!(
            "planvet-catalogue-test-{}-{}",
            std::process::id(),
            line!()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalogue.toml");
        fs::write(
            &path,
            r#"
version = "2026.08"

[[rules]]
rule_id = "presence.site_address"
title = "Site address must be stated"
required_fields = ["site_address"]
severity = "error"
"#,
        )
        .unwrap();

        let catalogue = Catalogue::load(&path).expect("toml catalogue should load");
        assert_eq!(catalogue.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_source_is_fatal() {
        let err = Catalogue::load("/nonexistent/catalogue.json").unwrap_err();
        assert!(matches!(err, CatalogueError::Missing { .. }));
    }
}
