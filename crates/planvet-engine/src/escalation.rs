//! Escalation gate: decide whether the costly external resolution step
//! is warranted, invoke it, and account for every completed call.

use planvet_entities::{EntityStore, ExtractionOutput};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::cache::ResolutionCache;
use crate::error::EngineError;
use crate::outcome::{ValidationOutcome, ValidationSummary};
use crate::presence::field_present;

/// Fields handed back by the external resolution step.
pub type ResolvedFields = BTreeMap<String, Value>;

/// Failure of the external resolution collaborator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("resolution step failed: {0}")]
pub struct ResolverError(pub String);

/// What the external resolution step is asked to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub application_id: String,
    pub submission_id: String,
    /// The fields deterministic checks could not settle.
    pub missing_fields: Vec<String>,
}

/// The external reasoning collaborator. Implementations live outside
/// this crate; tests use in-tree doubles.
pub trait FieldResolver {
    fn resolve(&self, request: &ResolutionRequest) -> Result<ResolvedFields, ResolverError>;
}

/// The fields still unanswered after the merged caches and the current
/// extraction have had their say: the union of `missing_fields` across
/// escalation-qualifying findings, minus anything already present in
/// the extraction or the application-scope resolved view.
pub fn outstanding_fields(
    outcome: &ValidationOutcome,
    extraction: &ExtractionOutput,
    cache: &ResolutionCache,
    application_id: &str,
) -> Vec<String> {
    let resolved = cache.application_fields(application_id);

    let mut outstanding = BTreeSet::new();
    for finding in &outcome.findings {
        if !finding.triggers_escalation() {
            continue;
        }
        for field in &finding.missing_fields {
            if field_present(extraction.fields.get(field.as_str())) {
                continue;
            }
            if field_present(resolved.get(field.as_str())) {
                continue;
            }
            outstanding.insert(field.clone());
        }
    }
    outstanding.into_iter().collect()
}

/// The escalation decision point, carrying the per-run call counter —
/// the system's primary cost metric.
#[derive(Debug, Default)]
pub struct EscalationGate {
    calls_completed: u64,
}

impl EscalationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed external calls this run. Exact: failed attempts are
    /// never counted.
    pub fn call_count(&self) -> u64 {
        self.calls_completed
    }

    /// Escalate only when the run raised the flag AND something is left
    /// that the caches cannot answer.
    pub fn should_escalate(&self, summary: &ValidationSummary, outstanding: &[String]) -> bool {
        summary.needs_llm && !outstanding.is_empty()
    }

    /// Invoke the resolver and merge its answer into both cache scopes.
    ///
    /// The call counter increments exactly once per completed call: a
    /// resolver error returns before any increment or cache write, and
    /// the escalation flag stays set for a future run to retry.
    pub fn escalate(
        &mut self,
        store: &mut EntityStore,
        cache: &mut ResolutionCache,
        resolver: &dyn FieldResolver,
        request: &ResolutionRequest,
    ) -> Result<ResolvedFields, EngineError> {
        let resolved = resolver.resolve(request)?;

        self.calls_completed += 1;
        let total = store.increment_submission_call_count(&request.submission_id)?;
        cache.merge_and_store(store, &request.submission_id, &resolved)?;

        info!(
            submission_id = %request.submission_id,
            resolved = resolved.len(),
            run_calls = self.calls_completed,
            submission_calls = total,
            "external resolution completed"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextEcho;
    use crate::finding::{Finding, FindingStatus};
    use planvet_catalogue::Severity;
    use planvet_entities::{Application, Submission};
    use serde_json::json;
    use std::cell::RefCell;

    struct StubResolver {
        responses: RefCell<Vec<Result<ResolvedFields, ResolverError>>>,
    }

    impl StubResolver {
        fn new(responses: Vec<Result<ResolvedFields, ResolverError>>) -> Self {
            Self {
                responses: RefCell::new(responses),
            }
        }
    }

    impl FieldResolver for StubResolver {
        fn resolve(&self, _request: &ResolutionRequest) -> Result<ResolvedFields, ResolverError> {
            self.responses.borrow_mut().remove(0)
        }
    }

    fn store() -> EntityStore {
        let mut store = EntityStore::default();
        store.upsert_application(Application::new("app_1", "DA-1", "householder"));
        store
            .upsert_submission(Submission::original("sub_0", "app_1"))
            .unwrap();
        store
    }

    fn outcome_missing(fields: Vec<&str>) -> ValidationOutcome {
        let finding = Finding::new(
            "presence.core",
            Severity::Error,
            FindingStatus::Fail,
            "missing",
        )
        .with_missing_fields(fields.into_iter().map(str::to_string).collect());
        let mut summary = ValidationSummary::default();
        summary.absorb(&finding);
        ValidationOutcome {
            summary,
            findings: vec![finding],
            skipped: vec![],
            context: ContextEcho::default(),
        }
    }

    fn request(fields: Vec<&str>) -> ResolutionRequest {
        ResolutionRequest {
            application_id: "app_1".to_string(),
            submission_id: "sub_0".to_string(),
            missing_fields: fields.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn cached_fields_suppress_escalation() {
        let mut store = store();
        store
            .merge_submission_resolved_fields(
                "sub_0",
                &BTreeMap::from([("proposed_use".to_string(), json!("dwelling"))]),
            )
            .unwrap();
        let cache = ResolutionCache::hydrate(&store);
        let outcome = outcome_missing(vec!["proposed_use"]);

        let outstanding = outstanding_fields(
            &outcome,
            &ExtractionOutput::default(),
            &cache,
            "app_1",
        );
        assert!(outstanding.is_empty());

        let gate = EscalationGate::new();
        assert!(!gate.should_escalate(&outcome.summary, &outstanding));
    }

    #[test]
    fn unresolved_fields_escalate() {
        let store = store();
        let cache = ResolutionCache::hydrate(&store);
        let outcome = outcome_missing(vec!["proposed_use"]);

        let outstanding = outstanding_fields(
            &outcome,
            &ExtractionOutput::default(),
            &cache,
            "app_1",
        );
        assert_eq!(outstanding, vec!["proposed_use".to_string()]);

        let gate = EscalationGate::new();
        assert!(gate.should_escalate(&outcome.summary, &outstanding));
    }

    #[test]
    fn warning_findings_never_contribute_outstanding_fields() {
        let finding = Finding::new(
            "presence.soft",
            Severity::Warning,
            FindingStatus::NeedsReview,
            "missing",
        )
        .with_missing_fields(vec!["landscaping_plan".to_string()]);
        let mut summary = ValidationSummary::default();
        summary.absorb(&finding);
        let outcome = ValidationOutcome {
            summary,
            findings: vec![finding],
            skipped: vec![],
            context: ContextEcho::default(),
        };

        let cache = ResolutionCache::hydrate(&store());
        let outstanding =
            outstanding_fields(&outcome, &ExtractionOutput::default(), &cache, "app_1");
        assert!(outstanding.is_empty());
    }

    #[test]
    fn counter_counts_only_completed_calls() {
        let mut store = store();
        let mut cache = ResolutionCache::hydrate(&store);
        let mut gate = EscalationGate::new();

        let resolver = StubResolver::new(vec![
            Err(ResolverError("timeout".to_string())),
            Ok(BTreeMap::from([(
                "proposed_use".to_string(),
                json!("dwelling"),
            )])),
            Err(ResolverError("rate limited".to_string())),
            Ok(BTreeMap::from([("storeys".to_string(), json!(2))])),
        ]);

        let req = request(vec!["proposed_use", "storeys"]);
        assert!(gate.escalate(&mut store, &mut cache, &resolver, &req).is_err());
        assert_eq!(gate.call_count(), 0);

        gate.escalate(&mut store, &mut cache, &resolver, &req)
            .unwrap();
        assert!(gate.escalate(&mut store, &mut cache, &resolver, &req).is_err());
        gate.escalate(&mut store, &mut cache, &resolver, &req)
            .unwrap();

        // N successes = 2, M failures = 2, counter == N exactly.
        assert_eq!(gate.call_count(), 2);
        assert_eq!(
            store.submission("sub_0").unwrap().resolution_call_count(),
            2
        );
    }

    #[test]
    fn failed_call_leaves_cache_untouched() {
        let mut store = store();
        let mut cache = ResolutionCache::hydrate(&store);
        let mut gate = EscalationGate::new();
        let resolver = StubResolver::new(vec![Err(ResolverError("down".to_string()))]);

        let req = request(vec!["proposed_use"]);
        let err = gate
            .escalate(&mut store, &mut cache, &resolver, &req)
            .unwrap_err();
        assert!(matches!(err, EngineError::Resolver(_)));
        assert!(cache.submission_fields("sub_0").is_empty());
        assert_eq!(
            store.submission("sub_0").unwrap().resolution_call_count(),
            0
        );
    }

    #[test]
    fn successful_escalation_merges_both_scopes() {
        let mut store = store();
        let mut cache = ResolutionCache::hydrate(&store);
        let mut gate = EscalationGate::new();
        let resolver = StubResolver::new(vec![Ok(BTreeMap::from([(
            "proposed_use".to_string(),
            json!("dwelling"),
        )]))]);

        gate.escalate(&mut store, &mut cache, &resolver, &request(vec!["proposed_use"]))
            .unwrap();

        assert_eq!(
            cache.submission_fields("sub_0")["proposed_use"],
            json!("dwelling")
        );
        assert_eq!(
            cache.application_fields("app_1")["proposed_use"],
            json!("dwelling")
        );
    }
}
