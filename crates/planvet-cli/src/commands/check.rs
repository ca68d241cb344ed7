use crate::support::{
    FINDING_SAMPLE_LIMIT, load_catalogue_or_exit, load_extraction_or_exit, load_store_or_exit,
    print_json_or_exit, print_sample_block, run_id_or_generate, sample_with_truncation, yes_no,
};
use planvet_engine::{EvalContext, RunRequest, ValidationOutcome, evaluate, run_validation};
use planvet_entities::mutate_store_jsonl;
use serde_json::json;

pub struct Args {
    pub extraction: String,
    pub catalogue: String,
    pub store: Option<String>,
    pub document_id: Option<String>,
    pub submission_id: Option<String>,
    pub document_type: Option<String>,
    pub application_type: Option<String>,
    pub run_id: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let catalogue = load_catalogue_or_exit(&args.catalogue);
    let extraction = load_extraction_or_exit(&args.extraction);
    let run_id = run_id_or_generate(args.run_id);

    let outcome = match &args.store {
        Some(store_path) => {
            let (_, path) = load_store_or_exit(store_path);
            let request = RunRequest {
                run_id: run_id.clone(),
                document_id: args.document_id.clone(),
                submission_id: args.submission_id.clone(),
                document_type: args.document_type.clone(),
                application_type: args.application_type.clone(),
                rule_filter: None,
                persist_path: None,
            };
            // Lock-scoped: the whole load → validate → record → flush
            // sequence holds the store's sibling lock.
            mutate_store_jsonl(&path, |store| {
                run_validation(store, &catalogue, &extraction, &request)
                    .map(|outcome| (outcome, true))
            })
            .unwrap_or_else(|e| {
                eprintln!("error: {e}");
                std::process::exit(1);
            })
        }
        None => {
            // Ad-hoc single-document mode: no persistence, rules that
            // need the entity graph are skipped.
            let ctx = EvalContext {
                document_id: args.document_id.as_deref(),
                submission_id: args.submission_id.as_deref(),
                document_type: args.document_type.as_deref(),
                application_type: args.application_type.as_deref(),
                store: None,
            };
            evaluate(&extraction, &catalogue, &ctx)
        }
    };

    render(&run_id, &outcome, args.json);
}

fn render(run_id: &str, outcome: &ValidationOutcome, json_output: bool) {
    if json_output {
        let payload = json!({
            "run_id": run_id,
            "summary": outcome.summary,
            "findings": outcome.findings,
            "skipped": outcome.skipped,
            "context": outcome.context,
        });
        print_json_or_exit(&payload);
        return;
    }

    println!("planvet check (run {run_id})");
    println!(
        "  Rules: {}  pass: {}  fail: {}  needs_review: {}  skipped: {}",
        outcome.summary.rule_count,
        outcome.summary.pass,
        outcome.summary.fail,
        outcome.summary.needs_review,
        outcome.summary.skipped,
    );
    println!("  Escalation flagged: {}", yes_no(outcome.summary.needs_llm));

    let lines: Vec<String> = outcome
        .findings
        .iter()
        .filter(|f| f.status != planvet_engine::FindingStatus::Pass)
        .map(|f| format!("[{}] {} — {}", f.status, f.rule_id, f.message))
        .collect();
    let (sample, truncated) = sample_with_truncation(lines, FINDING_SAMPLE_LIMIT);
    print_sample_block("Findings", &sample, truncated);

    let skipped: Vec<String> = outcome
        .skipped
        .iter()
        .map(|s| format!("{} ({})", s.rule_id, s.reason))
        .collect();
    let (sample, truncated) = sample_with_truncation(skipped, FINDING_SAMPLE_LIMIT);
    print_sample_block("Skipped", &sample, truncated);
}
