//! Geometry features and their derived spatial metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One geometry feature recorded for a submission, with derived metrics
/// by name (`setback_front_m`, `building_height_m`, `site_area_sqm`, …).
/// Raw geometry stays upstream; the engine only reads metric values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryFeature {
    pub id: String,
    pub submission_id: String,

    /// Feature kind, e.g. `building_footprint`, `site_boundary`.
    pub kind: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

impl GeometryFeature {
    pub fn new(
        id: impl Into<String>,
        submission_id: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            submission_id: submission_id.into(),
            kind: kind.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}
