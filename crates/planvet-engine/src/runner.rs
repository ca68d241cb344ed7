//! Run driver: evaluate one document and persist the resulting check
//! rows, moving the submission through its lifecycle.

use chrono::Utc;
use planvet_catalogue::Catalogue;
use planvet_entities::{EntityStore, ExtractionOutput, SubmissionStatus, ValidationCheck};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::warn;

use crate::context::EvalContext;
use crate::error::EngineError;
use crate::finding::compute_check_id;
use crate::orchestrator::evaluate_filtered;
use crate::outcome::ValidationOutcome;

/// One validation run over one document context.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub run_id: String,
    pub document_id: Option<String>,
    pub submission_id: Option<String>,
    pub document_type: Option<String>,
    pub application_type: Option<String>,
    /// Restrict to a rule subset (targeted re-validation).
    pub rule_filter: Option<BTreeSet<String>>,
    /// Where to flush the store after recording checks. A flush failure
    /// is logged and swallowed: the in-memory outcome is still returned.
    pub persist_path: Option<PathBuf>,
}

/// Evaluate, record one `ValidationCheck` per finding, and complete the
/// submission lifecycle. Single-document fatal errors (an invalid
/// lifecycle state) propagate; persistence hiccups do not.
pub fn run_validation(
    store: &mut EntityStore,
    catalogue: &Catalogue,
    extraction: &ExtractionOutput,
    request: &RunRequest,
) -> Result<ValidationOutcome, EngineError> {
    let submission_id = request.submission_id.as_deref();
    if let Some(id) = submission_id {
        let needs_processing = store
            .submission(id)
            .is_some_and(|s| s.status != SubmissionStatus::Processing);
        if needs_processing {
            store.transition_submission(id, SubmissionStatus::Processing)?;
        }
    }

    let outcome = {
        let ctx = EvalContext {
            document_id: request.document_id.as_deref(),
            submission_id,
            document_type: request.document_type.as_deref(),
            application_type: request.application_type.as_deref(),
            store: Some(&*store),
        };
        evaluate_filtered(extraction, catalogue, &ctx, request.rule_filter.as_ref())
    };

    for finding in &outcome.findings {
        let check = ValidationCheck {
            id: compute_check_id(
                &request.run_id,
                &finding.rule_id,
                request.document_id.as_deref(),
                submission_id,
            ),
            run_id: request.run_id.clone(),
            rule_id: finding.rule_id.clone(),
            document_id: request.document_id.clone(),
            submission_id: request.submission_id.clone(),
            status: finding.status.as_str().to_string(),
            severity: finding.severity.to_string(),
            message: finding.message.clone(),
            missing_fields: finding.missing_fields.clone(),
            evidence: finding.evidence.clone(),
            details: finding.details.clone(),
            created_at: Utc::now(),
        };
        store.record_check(check);
    }

    if let Some(id) = submission_id
        && store.submission(id).is_some()
    {
        store.transition_submission(id, SubmissionStatus::Completed)?;
    }

    if let Some(path) = &request.persist_path
        && let Err(error) = store.save_jsonl(path)
    {
        // The durable write failed but the findings are intact in
        // memory; downstream consumers must not lose them to a storage
        // hiccup.
        warn!(path = %path.display(), %error, "check persistence failed; continuing");
    }

    Ok(outcome)
}
