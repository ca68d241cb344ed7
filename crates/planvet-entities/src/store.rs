//! Canonical in-memory representation of the entity graph.
//!
//! This is the memory boundary for `planvet-entities`:
//! - load/store JSONL
//! - expose deterministic queries over applications, submissions,
//!   documents, fields, geometry, changesets and checks
//! - avoid evaluation concerns (no rule logic here)

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;

use crate::application::Application;
use crate::change::ChangeSet;
use crate::check::ValidationCheck;
use crate::document::{Document, ExtractedField};
use crate::geometry::GeometryFeature;
use crate::jsonl::{EntityRecord, JsonlError, read_records_from_path, write_records_to_path};
use crate::submission::{Submission, SubmissionStatus};

/// Errors raised while loading or mutating the entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("application not found: {0}")]
    ApplicationNotFound(String),

    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("changeset not found: {0}")]
    ChangeSetNotFound(String),

    #[error("submission {id}: modification (V{version}) must reference a parent submission")]
    MissingParent { id: String, version: u32 },

    #[error("submission {id}: parent {parent_id} is not in the store")]
    ParentNotFound { id: String, parent_id: String },

    #[error("submission {id}: original (V0) cannot reference a parent")]
    UnexpectedParent { id: String },

    #[error("submission {id}: invalid status transition {from} -> {to}")]
    InvalidStatusTransition {
        id: String,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}

/// Canonical in-memory state for the planning entity graph.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    applications: BTreeMap<String, Application>,
    submissions: BTreeMap<String, Submission>,
    documents: BTreeMap<String, Document>,
    fields: BTreeMap<String, ExtractedField>,
    geometry: BTreeMap<String, GeometryFeature>,
    changesets: BTreeMap<String, ChangeSet>,
    checks: BTreeMap<String, ValidationCheck>,
}

impl EntityStore {
    /// Build a store from fully-materialized records.
    ///
    /// Duplicate IDs resolve with deterministic last-write-wins semantics,
    /// matching append/overlay behavior in JSONL sync workflows.
    pub fn from_records(records: Vec<EntityRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            match record {
                EntityRecord::Application(v) => {
                    store.applications.insert(v.id.clone(), v);
                }
                EntityRecord::Submission(v) => {
                    store.submissions.insert(v.id.clone(), v);
                }
                EntityRecord::Document(v) => {
                    store.documents.insert(v.id.clone(), v);
                }
                EntityRecord::ExtractedField(v) => {
                    store.fields.insert(v.id.clone(), v);
                }
                EntityRecord::Geometry(v) => {
                    store.geometry.insert(v.id.clone(), v);
                }
                EntityRecord::ChangeSet(v) => {
                    store.changesets.insert(v.id.clone(), v);
                }
                EntityRecord::Check(v) => {
                    store.checks.insert(v.id.clone(), v);
                }
            }
        }
        store
    }

    /// Flatten store state into persistable records, in deterministic order.
    pub fn to_records(&self) -> Vec<EntityRecord> {
        let mut records = Vec::new();
        records.extend(self.applications.values().cloned().map(EntityRecord::Application));
        records.extend(self.submissions.values().cloned().map(EntityRecord::Submission));
        records.extend(self.documents.values().cloned().map(EntityRecord::Document));
        records.extend(self.fields.values().cloned().map(EntityRecord::ExtractedField));
        records.extend(self.geometry.values().cloned().map(EntityRecord::Geometry));
        records.extend(self.changesets.values().cloned().map(EntityRecord::ChangeSet));
        records.extend(self.checks.values().cloned().map(EntityRecord::Check));
        records
    }

    /// Load store state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_records(read_records_from_path(path)?))
    }

    /// Persist store state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        write_records_to_path(path, &self.to_records())?;
        Ok(())
    }

    // ── Lookups ──

    pub fn application(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    pub fn submission(&self, id: &str) -> Option<&Submission> {
        self.submissions.get(id)
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn changeset(&self, id: &str) -> Option<&ChangeSet> {
        self.changesets.get(id)
    }

    /// Iterate all submissions in deterministic ID order.
    pub fn submissions(&self) -> impl Iterator<Item = &Submission> {
        self.submissions.values()
    }

    /// All submissions for an application, ascending by version.
    pub fn submissions_of_application(&self, application_id: &str) -> Vec<&Submission> {
        let mut out: Vec<&Submission> = self
            .submissions
            .values()
            .filter(|s| s.application_id == application_id)
            .collect();
        out.sort_by_key(|s| s.version);
        out
    }

    /// Documents belonging to a submission, in ID order.
    pub fn documents_of_submission(&self, submission_id: &str) -> Vec<&Document> {
        self.documents
            .values()
            .filter(|d| d.submission_id == submission_id)
            .collect()
    }

    /// Distinct classified document types present for a submission.
    pub fn document_types_of_submission(&self, submission_id: &str) -> BTreeSet<String> {
        self.documents_of_submission(submission_id)
            .into_iter()
            .filter(|d| !d.document_type.is_empty())
            .map(|d| d.document_type.clone())
            .collect()
    }

    /// Extracted fields for one document, in field-name order.
    pub fn fields_of_document(&self, document_id: &str) -> Vec<&ExtractedField> {
        let mut out: Vec<&ExtractedField> = self
            .fields
            .values()
            .filter(|f| f.document_id == document_id)
            .collect();
        out.sort_by(|a, b| a.field_name.cmp(&b.field_name));
        out
    }

    /// Every (document, value) pair recorded for a field across all
    /// documents of a submission. The consistency validator groups these
    /// by value to find conflicts.
    pub fn field_values_across_submission(
        &self,
        submission_id: &str,
        field_name: &str,
    ) -> Vec<(&Document, &Value)> {
        let mut out = Vec::new();
        for document in self.documents_of_submission(submission_id) {
            for field in self.fields_of_document(&document.id) {
                if field.field_name == field_name {
                    out.push((document, &field.value));
                }
            }
        }
        out
    }

    /// Geometry features recorded for a submission, in ID order.
    pub fn geometry_of_submission(&self, submission_id: &str) -> Vec<&GeometryFeature> {
        self.geometry
            .values()
            .filter(|g| g.submission_id == submission_id)
            .collect()
    }

    /// The changeset computed for a modification submission, if any.
    pub fn changeset_for_submission(&self, submission_id: &str) -> Option<&ChangeSet> {
        self.changesets
            .values()
            .find(|c| c.submission_id == submission_id)
    }

    /// Check rows written under one run ID, in check-ID order.
    pub fn checks_of_run(&self, run_id: &str) -> Vec<&ValidationCheck> {
        self.checks
            .values()
            .filter(|c| c.run_id == run_id)
            .collect()
    }

    // ── Mutations ──

    pub fn upsert_application(&mut self, application: Application) -> Option<Application> {
        self.applications.insert(application.id.clone(), application)
    }

    /// Insert or replace a submission, enforcing the version tree:
    /// V0 has no parent; V1+ must name a parent already in the store.
    /// Parents pre-existing rules out cycles by construction.
    pub fn upsert_submission(&mut self, submission: Submission) -> Result<Option<Submission>, StoreError> {
        match (&submission.parent_id, submission.version) {
            (None, 0) => {}
            (None, version) => {
                return Err(StoreError::MissingParent {
                    id: submission.id,
                    version,
                });
            }
            (Some(_), 0) => {
                return Err(StoreError::UnexpectedParent { id: submission.id });
            }
            (Some(parent_id), _) => {
                if !self.submissions.contains_key(parent_id) {
                    return Err(StoreError::ParentNotFound {
                        id: submission.id,
                        parent_id: parent_id.clone(),
                    });
                }
            }
        }
        Ok(self.submissions.insert(submission.id.clone(), submission))
    }

    pub fn upsert_document(&mut self, document: Document) -> Option<Document> {
        self.documents.insert(document.id.clone(), document)
    }

    pub fn upsert_field(&mut self, field: ExtractedField) -> Option<ExtractedField> {
        self.fields.insert(field.id.clone(), field)
    }

    pub fn upsert_geometry(&mut self, feature: GeometryFeature) -> Option<GeometryFeature> {
        self.geometry.insert(feature.id.clone(), feature)
    }

    pub fn upsert_changeset(&mut self, changeset: ChangeSet) -> Option<ChangeSet> {
        self.changesets.insert(changeset.id.clone(), changeset)
    }

    /// Record one check row. Deterministic IDs make this "one row per
    /// rule per document per run": a same-run re-write replaces in place.
    pub fn record_check(&mut self, check: ValidationCheck) -> Option<ValidationCheck> {
        self.checks.insert(check.id.clone(), check)
    }

    /// Move a submission through its lifecycle, validating the transition.
    pub fn transition_submission(
        &mut self,
        submission_id: &str,
        next: SubmissionStatus,
    ) -> Result<(), StoreError> {
        let submission = self
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::SubmissionNotFound(submission_id.to_string()))?;
        if !submission.status.can_transition_to(next) {
            return Err(StoreError::InvalidStatusTransition {
                id: submission_id.to_string(),
                from: submission.status,
                to: next,
            });
        }
        submission.status = next;
        submission.touch_updated_at();
        Ok(())
    }

    /// Merge resolved-field updates into a submission's metadata cache.
    pub fn merge_submission_resolved_fields(
        &mut self,
        submission_id: &str,
        updates: &BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let submission = self
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::SubmissionNotFound(submission_id.to_string()))?;
        submission.merge_resolved_fields(updates);
        Ok(())
    }

    /// Record one completed external-resolution call on a submission.
    pub fn increment_submission_call_count(
        &mut self,
        submission_id: &str,
    ) -> Result<u64, StoreError> {
        let submission = self
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::SubmissionNotFound(submission_id.to_string()))?;
        submission.increment_resolution_call_count();
        Ok(submission.resolution_call_count())
    }

    pub fn len(&self) -> usize {
        self.applications.len()
            + self.submissions.len()
            + self.documents.len()
            + self.fields.len()
            + self.geometry.len()
            + self.changesets.len()
            + self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
