use planvet_catalogue::Catalogue;
use planvet_entities::{EntityStore, ExtractionOutput, new_entity_id};
use std::path::PathBuf;

pub const FINDING_SAMPLE_LIMIT: usize = 25;

pub fn load_catalogue_or_exit(path: &str) -> Catalogue {
    Catalogue::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(2);
    })
}

pub fn load_store_or_exit(path: &str) -> (EntityStore, PathBuf) {
    let path = PathBuf::from(path);
    let store = EntityStore::load_jsonl(&path).unwrap_or_else(|e| {
        eprintln!("error: failed to load {}: {e}", path.display());
        std::process::exit(1);
    });
    (store, path)
}

pub fn load_extraction_or_exit(path: &str) -> ExtractionOutput {
    ExtractionOutput::load(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load extraction: {e}");
        std::process::exit(1);
    })
}

pub fn run_id_or_generate(run_id: Option<String>) -> String {
    run_id.unwrap_or_else(|| new_entity_id("run"))
}

pub fn sample_with_truncation<T>(items: Vec<T>, limit: usize) -> (Vec<T>, usize) {
    let total = items.len();
    let sample: Vec<T> = items.into_iter().take(limit).collect();
    let truncated = total.saturating_sub(sample.len());
    (sample, truncated)
}

pub fn print_sample_block(header: &str, items: &[String], truncated: usize) {
    if items.is_empty() {
        return;
    }

    println!("  {header} (showing up to {}):", items.len());
    for item in items {
        println!("    - {item}");
    }
    if truncated > 0 {
        println!("    - ... and {truncated} more");
    }
}

pub fn print_json_or_exit(payload: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).unwrap_or_else(|e| {
            eprintln!("error: failed to render json: {e}");
            std::process::exit(1);
        })
    );
}

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}
