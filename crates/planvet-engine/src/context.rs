//! Evaluation context: what the orchestrator knows about the document
//! under validation and the persistence it may reach.

use planvet_entities::{EntityStore, Submission};
use serde::{Deserialize, Serialize};

use crate::outcome::SkipReason;

/// Context bag handed to every rule evaluation.
///
/// Everything is optional: the engine runs in reduced contexts (ad-hoc
/// single-document mode has no store), and validators that need more
/// than is present skip rather than fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    pub document_id: Option<&'a str>,
    pub submission_id: Option<&'a str>,
    /// Classified document type, used to filter `applies_to`.
    pub document_type: Option<&'a str>,
    /// Declared application type; falls back to the stored application's
    /// classification when absent.
    pub application_type: Option<&'a str>,
    pub store: Option<&'a EntityStore>,
}

impl<'a> EvalContext<'a> {
    /// The store handle, or the skip that explains its absence.
    pub fn store(&self) -> Result<&'a EntityStore, SkipReason> {
        self.store.ok_or(SkipReason::MissingStore)
    }

    /// The submission under validation, resolved through the store.
    pub fn submission(&self) -> Result<(&'a EntityStore, &'a Submission), SkipReason> {
        let store = self.store()?;
        let submission_id = self.submission_id.ok_or(SkipReason::MissingSubmissionId)?;
        let submission = store
            .submission(submission_id)
            .ok_or_else(|| SkipReason::SubmissionNotFound(submission_id.to_string()))?;
        Ok((store, submission))
    }

    /// The effective application type: the context's own, else the one
    /// recorded on the submission's application.
    pub fn effective_application_type(&self) -> Option<String> {
        if let Some(app_type) = self.application_type
            && !app_type.is_empty()
        {
            return Some(app_type.to_string());
        }
        let (store, submission) = self.submission().ok()?;
        let application = store.application(&submission.application_id)?;
        if application.application_type.is_empty() {
            None
        } else {
            Some(application.application_type.clone())
        }
    }

    /// Serializable echo of this context for run reports.
    pub fn echo(&self) -> ContextEcho {
        ContextEcho {
            document_id: self.document_id.map(str::to_string),
            submission_id: self.submission_id.map(str::to_string),
            document_type: self.document_type.map(str::to_string),
            application_type: self.application_type.map(str::to_string),
        }
    }
}

/// The input context echoed back on every validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContextEcho {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_entities::{Application, EntityStore, Submission};

    #[test]
    fn reduced_context_yields_skips() {
        let ctx = EvalContext::default();
        assert_eq!(ctx.store().unwrap_err(), SkipReason::MissingStore);
        assert_eq!(
            ctx.submission().unwrap_err(),
            SkipReason::MissingStore
        );
    }

    #[test]
    fn submission_lookup_reports_missing_id_and_row() {
        let store = EntityStore::default();
        let ctx = EvalContext {
            store: Some(&store),
            ..EvalContext::default()
        };
        assert_eq!(
            ctx.submission().unwrap_err(),
            SkipReason::MissingSubmissionId
        );

        let ctx = EvalContext {
            store: Some(&store),
            submission_id: Some("sub_0"),
            ..EvalContext::default()
        };
        assert_eq!(
            ctx.submission().unwrap_err(),
            SkipReason::SubmissionNotFound("sub_0".to_string())
        );
    }

    #[test]
    fn application_type_falls_back_to_store() {
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        store
            .upsert_submission(Submission::original("sub_0", "app_1"))
            .unwrap();

        let ctx = EvalContext {
            store: Some(&store),
            submission_id: Some("sub_0"),
            ..EvalContext::default()
        };
        assert_eq!(
            ctx.effective_application_type().as_deref(),
            Some("householder")
        );

        let ctx = EvalContext {
            application_type: Some("commercial"),
            ..ctx
        };
        assert_eq!(
            ctx.effective_application_type().as_deref(),
            Some("commercial")
        );
    }
}
