//! # planvet-batch
//!
//! Bounded worker pool over the independent documents of one batch
//! submission. Each worker runs its document end-to-end: evaluate, then
//! (conditionally) escalate.
//!
//! Evaluation is pure and runs lock-free against a read-only snapshot of
//! the entity graph taken at batch start. The one shared mutable
//! resource — the resolution-cache working copy, plus the live store and
//! the call counter it feeds — sits behind a single mutex, and every
//! read-merge-write sequence holds it for the duration. Per-document
//! failures are captured; they never abort sibling documents.

use std::collections::BTreeSet;
use std::sync::Arc;

use planvet_catalogue::Catalogue;
use planvet_engine::{
    EngineError, EscalationGate, FieldResolver, ResolutionCache, ResolutionRequest, RunRequest,
    ValidationOutcome, outstanding_fields, run_validation,
};
use planvet_entities::{EntityStore, ExtractionOutput};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Default worker-pool width.
pub const DEFAULT_WORKERS: usize = 4;

/// Errors that abort a whole batch (not a single document).
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch has no documents")]
    Empty,

    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

/// One document queued for a batch run, with its pre-loaded extraction
/// (or the load error captured upstream).
#[derive(Debug)]
pub struct BatchDocument {
    pub document_id: String,
    /// Filename used in error reporting.
    pub name: String,
    pub document_type: Option<String>,
    pub extraction: Result<ExtractionOutput, String>,
}

/// Batch-wide parameters.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub run_id: String,
    pub submission_id: String,
    pub application_id: String,
    pub workers: usize,
    /// Restrict every document's evaluation to a rule subset
    /// (targeted re-validation).
    pub rule_filter: Option<BTreeSet<String>>,
}

/// One captured per-document failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentError {
    pub document: String,
    pub error: String,
}

/// What the operator sees after a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub run_id: String,
    pub successes: usize,
    pub failures: usize,
    pub errors: Vec<DocumentError>,
    pub outcomes: Vec<ValidationOutcome>,
    /// Completed external-resolution calls across the whole run.
    pub resolution_calls: u64,
    pub needs_llm: bool,
}

struct SharedState {
    store: EntityStore,
    cache: ResolutionCache,
    gate: EscalationGate,
}

/// Run one batch. Takes the store by value and hands it back alongside
/// the report so the caller can persist the mutated graph.
pub async fn run_batch(
    store: EntityStore,
    catalogue: Arc<Catalogue>,
    documents: Vec<BatchDocument>,
    resolver: Option<Arc<dyn FieldResolver + Send + Sync>>,
    request: BatchRequest,
) -> Result<(EntityStore, BatchReport), BatchError> {
    if documents.is_empty() {
        return Err(BatchError::Empty);
    }

    // Read-only snapshot for lock-free evaluation; the graph entities
    // validators read do not change mid-batch.
    let snapshot = Arc::new(store.clone());
    let cache = ResolutionCache::hydrate(&store);
    let shared = Arc::new(Mutex::new(SharedState {
        store,
        cache,
        gate: EscalationGate::new(),
    }));

    let width = request.workers.clamp(1, 64);
    let semaphore = Arc::new(Semaphore::new(width));
    let request = Arc::new(request);

    let mut tasks: JoinSet<Result<ValidationOutcome, DocumentError>> = JoinSet::new();
    for document in documents {
        let snapshot = Arc::clone(&snapshot);
        let shared = Arc::clone(&shared);
        let catalogue = Arc::clone(&catalogue);
        let semaphore = Arc::clone(&semaphore);
        let resolver = resolver.clone();
        let request = Arc::clone(&request);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("batch semaphore never closes");
            process_document(snapshot, shared, catalogue, resolver, request, document).await
        });
    }

    let mut outcomes = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(failure)) => {
                warn!(document = %failure.document, error = %failure.error, "document failed");
                errors.push(failure);
            }
            Err(join_error) => return Err(BatchError::WorkerPanic(join_error.to_string())),
        }
    }

    errors.sort_by(|a, b| a.document.cmp(&b.document));
    outcomes.sort_by(|a, b| a.context.document_id.cmp(&b.context.document_id));

    let shared = Arc::try_unwrap(shared)
        .map_err(|_| BatchError::WorkerPanic("shared state still referenced".to_string()))?
        .into_inner();

    let needs_llm = outcomes.iter().any(|o| o.summary.needs_llm);
    let report = BatchReport {
        run_id: request.run_id.clone(),
        successes: outcomes.len(),
        failures: errors.len(),
        errors,
        outcomes,
        resolution_calls: shared.gate.call_count(),
        needs_llm,
    };
    info!(
        run_id = %report.run_id,
        successes = report.successes,
        failures = report.failures,
        resolution_calls = report.resolution_calls,
        "batch complete"
    );
    Ok((shared.store, report))
}

async fn process_document(
    snapshot: Arc<EntityStore>,
    shared: Arc<Mutex<SharedState>>,
    catalogue: Arc<Catalogue>,
    resolver: Option<Arc<dyn FieldResolver + Send + Sync>>,
    request: Arc<BatchRequest>,
    document: BatchDocument,
) -> Result<ValidationOutcome, DocumentError> {
    let extraction = match document.extraction {
        Ok(extraction) => extraction,
        Err(error) => {
            return Err(DocumentError {
                document: document.name,
                error,
            });
        }
    };

    // Pure evaluation against the snapshot: no locks held.
    let outcome = {
        let ctx = planvet_engine::EvalContext {
            document_id: Some(document.document_id.as_str()),
            submission_id: Some(request.submission_id.as_str()),
            document_type: document.document_type.as_deref(),
            application_type: None,
            store: Some(snapshot.as_ref()),
        };
        planvet_engine::evaluate_filtered(
            &extraction,
            &catalogue,
            &ctx,
            request.rule_filter.as_ref(),
        )
    };

    // One lock for the whole read-merge-write sequence: outstanding
    // lookup, escalation, cache merge, and check recording.
    let mut state = shared.lock().await;

    if let Some(resolver) = &resolver {
        let outstanding = outstanding_fields(
            &outcome,
            &extraction,
            &state.cache,
            &request.application_id,
        );
        if state.gate.should_escalate(&outcome.summary, &outstanding) {
            let resolution = ResolutionRequest {
                application_id: request.application_id.clone(),
                submission_id: request.submission_id.clone(),
                missing_fields: outstanding,
            };
            let SharedState { store, cache, gate } = &mut *state;
            match gate.escalate(store, cache, resolver.as_ref(), &resolution) {
                Ok(resolved) => {
                    info!(
                        document = %document.name,
                        resolved = resolved.len(),
                        "escalation resolved fields"
                    );
                }
                Err(EngineError::Resolver(error)) => {
                    // Escalation failure is not a document failure: the
                    // flag stays set for a future run.
                    warn!(document = %document.name, %error, "escalation failed");
                }
                Err(error) => {
                    return Err(DocumentError {
                        document: document.name,
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    let run_request = RunRequest {
        run_id: request.run_id.clone(),
        document_id: Some(document.document_id.clone()),
        submission_id: Some(request.submission_id.clone()),
        document_type: document.document_type.clone(),
        application_type: None,
        rule_filter: request.rule_filter.clone(),
        persist_path: None,
    };
    run_validation(&mut state.store, &catalogue, &extraction, &run_request).map_err(|error| {
        DocumentError {
            document: document.name,
            error: error.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use planvet_engine::{ResolvedFields, ResolverError};
    use planvet_entities::{Application, Submission};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn catalogue() -> Arc<Catalogue> {
        Arc::new(
            Catalogue::parse(json!({
                "rules": [{
                    "rule_id": "presence.use",
                    "title": "Proposed use stated",
                    "required_fields": ["proposed_use"],
                    "severity": "error"
                }]
            }))
            .unwrap(),
        )
    }

    fn store() -> EntityStore {
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        store
            .upsert_submission(Submission::original("sub_0", "app_1"))
            .unwrap();
        store
    }

    fn document(id: &str, fields: serde_json::Value) -> BatchDocument {
        BatchDocument {
            document_id: id.to_string(),
            name: format!("{id}.pdf"),
            document_type: None,
            extraction: Ok(serde_json::from_value(
                json!({"fields": fields, "evidence_index": {}}),
            )
            .unwrap()),
        }
    }

    fn request(workers: usize) -> BatchRequest {
        BatchRequest {
            run_id: "run_1".to_string(),
            submission_id: "sub_0".to_string(),
            application_id: "app_1".to_string(),
            workers,
            rule_filter: None,
        }
    }

    struct CountingResolver {
        calls: AtomicU64,
        answer: ResolvedFields,
    }

    impl FieldResolver for CountingResolver {
        fn resolve(&self, _request: &ResolutionRequest) -> Result<ResolvedFields, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    struct FailingResolver {
        attempts: StdMutex<u64>,
    }

    impl FieldResolver for FailingResolver {
        fn resolve(&self, _request: &ResolutionRequest) -> Result<ResolvedFields, ResolverError> {
            *self.attempts.lock().unwrap() += 1;
            Err(ResolverError("resolution backend unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn per_document_failures_do_not_abort_siblings() {
        let documents = vec![
            document("doc_a", json!({"proposed_use": "dwelling"})),
            BatchDocument {
                document_id: "doc_b".to_string(),
                name: "broken.pdf".to_string(),
                document_type: None,
                extraction: Err("unreadable extraction payload".to_string()),
            },
            document("doc_c", json!({"proposed_use": "garage"})),
        ];

        let (_store, report) = run_batch(store(), catalogue(), documents, None, request(2))
            .await
            .unwrap();

        assert_eq!(report.successes, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.errors[0].document, "broken.pdf");
        assert!(report.errors[0].error.contains("unreadable"));
    }

    #[tokio::test]
    async fn cache_suppresses_repeat_escalation_within_one_run() {
        // Both documents miss the same field; the first completed
        // escalation fills the cache, the second document finds it there.
        let documents = vec![document("doc_a", json!({})), document("doc_b", json!({}))];
        let resolver = Arc::new(CountingResolver {
            calls: AtomicU64::new(0),
            answer: BTreeMap::from([("proposed_use".to_string(), json!("dwelling"))]),
        });

        let (store, report) = run_batch(
            store(),
            catalogue(),
            documents,
            Some(resolver.clone()),
            request(1),
        )
        .await
        .unwrap();

        assert_eq!(report.successes, 2);
        assert_eq!(report.resolution_calls, 1);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.submission("sub_0").unwrap().resolution_call_count(), 1);
    }

    #[tokio::test]
    async fn failed_escalation_counts_nothing_and_fails_nothing() {
        let documents = vec![document("doc_a", json!({}))];
        let resolver = Arc::new(FailingResolver {
            attempts: StdMutex::new(0),
        });

        let (store, report) = run_batch(
            store(),
            catalogue(),
            documents,
            Some(resolver.clone()),
            request(2),
        )
        .await
        .unwrap();

        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(report.resolution_calls, 0);
        assert!(report.needs_llm, "flag survives for a future run");
        assert_eq!(*resolver.attempts.lock().unwrap(), 1);
        assert_eq!(store.submission("sub_0").unwrap().resolution_call_count(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_an_error() {
        let err = run_batch(store(), catalogue(), vec![], None, request(2))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Empty));
    }

    #[tokio::test]
    async fn checks_are_recorded_for_every_document() {
        let documents = vec![
            document("doc_a", json!({"proposed_use": "dwelling"})),
            document("doc_b", json!({})),
        ];
        let (store, report) = run_batch(store(), catalogue(), documents, None, request(4))
            .await
            .unwrap();

        assert_eq!(report.successes, 2);
        // one rule × two documents
        assert_eq!(store.checks_of_run("run_1").len(), 2);
    }
}
