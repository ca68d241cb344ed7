use crate::support::{
    load_catalogue_or_exit, load_store_or_exit, print_json_or_exit, print_sample_block,
    run_id_or_generate, yes_no,
};
use planvet_batch::{BatchDocument, BatchRequest, run_batch};
use planvet_entities::ExtractionOutput;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

pub struct Args {
    pub store: String,
    pub catalogue: String,
    pub extractions: String,
    pub submission_id: String,
    pub workers: usize,
    pub run_id: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let catalogue = Arc::new(load_catalogue_or_exit(&args.catalogue));
    let (store, store_path) = load_store_or_exit(&args.store);

    let Some(submission) = store.submission(&args.submission_id) else {
        eprintln!("error: submission not found: {}", args.submission_id);
        std::process::exit(1);
    };
    let application_id = submission.application_id.clone();
    let run_id = run_id_or_generate(args.run_id);

    let documents = collect_documents(&store, Path::new(&args.extractions));
    let request = BatchRequest {
        run_id: run_id.clone(),
        submission_id: args.submission_id.clone(),
        application_id,
        workers: args.workers,
        rule_filter: None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(1);
        });

    // The external resolution collaborator is wired by the embedding
    // service; the CLI reports escalation via needs_llm instead.
    let result = runtime.block_on(run_batch(store, catalogue, documents, None, request));
    let (store, report) = result.unwrap_or_else(|e| {
        eprintln!("error: batch failed: {e}");
        std::process::exit(1);
    });

    if let Err(e) = store.save_jsonl(&store_path) {
        eprintln!(
            "warning: failed to persist store {}: {e}; results below are in-memory only",
            store_path.display()
        );
    }

    if args.json {
        let payload = json!({
            "run_id": report.run_id,
            "successes": report.successes,
            "failures": report.failures,
            "errors": report.errors,
            "needs_llm": report.needs_llm,
            "resolution_calls": report.resolution_calls,
            "summaries": report
                .outcomes
                .iter()
                .map(|o| json!({"context": o.context, "summary": o.summary}))
                .collect::<Vec<_>>(),
        });
        print_json_or_exit(&payload);
    } else {
        println!("planvet batch (run {})", report.run_id);
        println!("  Documents: {}", report.successes + report.failures);
        println!("  Successes: {}", report.successes);
        println!("  Failures: {}", report.failures);
        println!("  Escalation flagged: {}", yes_no(report.needs_llm));
        println!("  Resolution calls: {}", report.resolution_calls);
        let errors: Vec<String> = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.document, e.error))
            .collect();
        print_sample_block("Errors", &errors, 0);
    }
}

/// One extraction payload per document: `<document_id>.json` under the
/// extractions directory. Unreadable payloads are queued with their load
/// error so the batch report can surface them per document.
fn collect_documents(store: &planvet_entities::EntityStore, dir: &Path) -> Vec<BatchDocument> {
    let entries = std::fs::read_dir(dir).unwrap_or_else(|e| {
        eprintln!("error: failed to read extractions dir {}: {e}", dir.display());
        std::process::exit(1);
    });

    let mut documents = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(document_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(document_id)
            .to_string();
        let document_type = store
            .document(document_id)
            .map(|d| d.document_type.clone())
            .filter(|t| !t.is_empty());

        documents.push(BatchDocument {
            document_id: document_id.to_string(),
            name,
            document_type,
            extraction: ExtractionOutput::load(&path),
        });
    }
    documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    documents
}
