//! Extraction output: the upstream field-mapping collaborator's contract.
//!
//! Only `fields` and `evidence_index` are read by the validation engine.
//! Text blocks, tables, metadata, and page anchors are carried opaquely
//! for downstream consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::evidence::{Evidence, EvidenceRefs};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtractionOutput {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub evidence_index: BTreeMap<String, EvidenceRefs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_blocks: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_anchors: Vec<Value>,
}

impl ExtractionOutput {
    /// Evidence entries recorded under an exact index key.
    pub fn evidence_for(&self, key: &str) -> &[Evidence] {
        self.evidence_index
            .get(key)
            .map(EvidenceRefs::as_slice)
            .unwrap_or(&[])
    }

    /// Load an extraction payload from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_mixed_evidence_shapes() {
        let extraction: ExtractionOutput = serde_json::from_value(json!({
            "fields": {"site_address": "12 Elm St", "storeys": 2},
            "evidence_index": {
                "site_address": {"snippet": "12 Elm St", "page": 1, "confidence": 0.92},
                "text_block_3": [
                    {"snippet": "two storey dwelling", "page": 2, "confidence": 0.5}
                ]
            },
            "text_blocks": [],
            "tables": []
        }))
        .expect("extraction should deserialize");

        assert_eq!(extraction.fields["site_address"], json!("12 Elm St"));
        assert_eq!(extraction.evidence_for("site_address").len(), 1);
        assert_eq!(extraction.evidence_for("text_block_3").len(), 1);
        assert!(extraction.evidence_for("absent").is_empty());
    }
}
