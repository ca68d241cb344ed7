//! Field-resolution cache: previously resolved field values, scoped to
//! submissions and aggregated per application.
//!
//! The cache exists to make escalation cheap to avoid: once an external
//! resolution has answered a field for any submission of an application,
//! no later document run needs to ask again.

use planvet_entities::{EntityStore, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;

/// One submission's cache entry with the lineage needed for
/// application-level aggregation.
#[derive(Debug, Clone, PartialEq)]
struct CacheEntry {
    application_id: String,
    version: u32,
    fields: BTreeMap<String, Value>,
}

/// In-memory working copy of resolved fields, hydrated from submission
/// metadata. During a batch run one instance sits behind a mutex and is
/// shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    by_submission: BTreeMap<String, CacheEntry>,
}

impl ResolutionCache {
    /// Hydrate the working copy from every submission in the store.
    pub fn hydrate(store: &EntityStore) -> Self {
        let mut by_submission = BTreeMap::new();
        for submission in store.submissions() {
            by_submission.insert(
                submission.id.clone(),
                CacheEntry {
                    application_id: submission.application_id.clone(),
                    version: submission.version,
                    fields: submission.resolved_fields(),
                },
            );
        }
        Self { by_submission }
    }

    /// Resolved fields cached for one submission.
    pub fn submission_fields(&self, submission_id: &str) -> BTreeMap<String, Value> {
        self.by_submission
            .get(submission_id)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default()
    }

    /// Resolved fields aggregated across every submission of an
    /// application. Merging ascends by version, so the newest
    /// submission's value wins key collisions — regardless of the order
    /// entries were stored or hydrated.
    pub fn application_fields(&self, application_id: &str) -> BTreeMap<String, Value> {
        let mut entries: Vec<&CacheEntry> = self
            .by_submission
            .values()
            .filter(|entry| entry.application_id == application_id)
            .collect();
        entries.sort_by_key(|entry| entry.version);

        let mut merged = BTreeMap::new();
        for entry in entries {
            for (key, value) in &entry.fields {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Merge updates into the working copy and write them through to the
    /// submission's metadata. Incoming values win key collisions.
    pub fn merge_and_store(
        &mut self,
        store: &mut EntityStore,
        submission_id: &str,
        updates: &BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        store.merge_submission_resolved_fields(submission_id, updates)?;

        let submission = store
            .submission(submission_id)
            .ok_or_else(|| StoreError::SubmissionNotFound(submission_id.to_string()))?;
        self.by_submission.insert(
            submission_id.to_string(),
            CacheEntry {
                application_id: submission.application_id.clone(),
                version: submission.version,
                fields: submission.resolved_fields(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_entities::{Application, Submission};
    use serde_json::json;

    fn store_with_versions() -> EntityStore {
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        let mut v0 = Submission::original("sub_0", "app_1");
        v0.merge_resolved_fields(&BTreeMap::from([
            ("proposed_use".to_string(), json!("dwelling")),
            ("storeys".to_string(), json!(1)),
        ]));
        store.upsert_submission(v0.clone()).unwrap();

        let mut v1 = Submission::modification("sub_1", &v0);
        v1.merge_resolved_fields(&BTreeMap::from([(
            "storeys".to_string(),
            json!(2),
        )]));
        store.upsert_submission(v1).unwrap();
        store
    }

    #[test]
    fn newest_version_wins_application_merge() {
        let cache = ResolutionCache::hydrate(&store_with_versions());
        let merged = cache.application_fields("app_1");
        assert_eq!(merged["proposed_use"], json!("dwelling"));
        assert_eq!(merged["storeys"], json!(2));
    }

    #[test]
    fn precedence_is_stable_regardless_of_merge_order() {
        // Build the same graph with the modification stored first; the
        // aggregated view must be identical.
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        let mut v0 = Submission::original("sub_0", "app_1");
        v0.merge_resolved_fields(&BTreeMap::from([("storeys".to_string(), json!(1))]));
        store.upsert_submission(v0.clone()).unwrap();
        let mut v1 = Submission::modification("sub_1", &v0);
        v1.merge_resolved_fields(&BTreeMap::from([("storeys".to_string(), json!(2))]));
        store.upsert_submission(v1).unwrap();

        let forward = ResolutionCache::hydrate(&store).application_fields("app_1");
        let reversed = ResolutionCache::hydrate(&store_with_versions()).application_fields("app_1");
        assert_eq!(forward["storeys"], json!(2));
        assert_eq!(forward["storeys"], reversed["storeys"]);
    }

    #[test]
    fn merge_and_store_writes_through() {
        let mut store = store_with_versions();
        let mut cache = ResolutionCache::hydrate(&store);

        cache
            .merge_and_store(
                &mut store,
                "sub_1",
                &BTreeMap::from([("proposed_use".to_string(), json!("dual occupancy"))]),
            )
            .unwrap();

        assert_eq!(
            cache.submission_fields("sub_1")["proposed_use"],
            json!("dual occupancy")
        );
        assert_eq!(
            store.submission("sub_1").unwrap().resolved_fields()["proposed_use"],
            json!("dual occupancy")
        );
        // Application view now prefers the V1 value.
        assert_eq!(
            cache.application_fields("app_1")["proposed_use"],
            json!("dual occupancy")
        );
    }

    #[test]
    fn unknown_submission_is_a_store_error() {
        let mut store = store_with_versions();
        let mut cache = ResolutionCache::hydrate(&store);
        let err = cache
            .merge_and_store(&mut store, "sub_9", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::SubmissionNotFound(_)));
    }
}
