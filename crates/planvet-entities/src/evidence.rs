//! Evidence: a page/snippet/confidence pointer grounding a finding or an
//! extracted field value. Owned by the document it came from; read-only
//! to the validation engine.

use serde::{Deserialize, Serialize};

/// Snippet length bound. Longer snippets are truncated at construction
/// so persisted evidence rows stay small.
pub const MAX_SNIPPET_CHARS: usize = 280;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

impl Evidence {
    /// Build evidence with the snippet bound applied.
    pub fn new(snippet: impl Into<String>, page: Option<u32>, confidence: f64) -> Self {
        Self {
            page,
            snippet: bound_snippet(snippet.into()),
            bbox: None,
            confidence,
            source_type: None,
        }
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }
}

fn bound_snippet(snippet: String) -> String {
    if snippet.chars().count() <= MAX_SNIPPET_CHARS {
        return snippet;
    }
    let mut bounded: String = snippet.chars().take(MAX_SNIPPET_CHARS - 1).collect();
    bounded.push('…');
    bounded
}

/// One evidence entry or several, as the extraction collaborator emits
/// either shape per index key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EvidenceRefs {
    One(Evidence),
    Many(Vec<Evidence>),
}

impl EvidenceRefs {
    /// View as a slice regardless of wire shape.
    pub fn as_slice(&self) -> &[Evidence] {
        match self {
            EvidenceRefs::One(evidence) => std::slice::from_ref(evidence),
            EvidenceRefs::Many(list) => list.as_slice(),
        }
    }
}
