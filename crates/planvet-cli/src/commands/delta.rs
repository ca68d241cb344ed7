use crate::support::{
    FINDING_SAMPLE_LIMIT, load_catalogue_or_exit, load_extraction_or_exit, load_store_or_exit,
    print_json_or_exit, print_sample_block, sample_with_truncation,
};
use planvet_engine::{EvalContext, compute_impacted_rules, evaluate_filtered, significance_score};
use serde_json::json;

pub struct Args {
    pub store: String,
    pub catalogue: String,
    pub changeset: String,
    pub revalidate: bool,
    pub extraction: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let catalogue = load_catalogue_or_exit(&args.catalogue);
    let (store, _path) = load_store_or_exit(&args.store);

    let impacted = compute_impacted_rules(&store, &args.changeset, &catalogue)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });
    let changeset = store
        .changeset(&args.changeset)
        .expect("changeset present after impact computation");
    let score = significance_score(changeset);

    // Targeted re-validation covers the full impacted set; the score is
    // a reporting signal only.
    let revalidation = if args.revalidate {
        let Some(extraction_path) = &args.extraction else {
            eprintln!("error: --revalidate requires --extraction");
            std::process::exit(1);
        };
        let extraction = load_extraction_or_exit(extraction_path);
        let ctx = EvalContext {
            submission_id: Some(changeset.submission_id.as_str()),
            store: Some(&store),
            ..EvalContext::default()
        };
        Some(evaluate_filtered(&extraction, &catalogue, &ctx, Some(&impacted)))
    } else {
        None
    };

    if args.json {
        let payload = json!({
            "changeset_id": changeset.id,
            "submission_id": changeset.submission_id,
            "parent_submission_id": changeset.parent_submission_id,
            "change_count": changeset.items.len(),
            "significance_score": score,
            "impacted_rules": impacted,
            "revalidation": revalidation.as_ref().map(|outcome| json!({
                "summary": outcome.summary,
                "findings": outcome.findings,
                "skipped": outcome.skipped,
            })),
        });
        print_json_or_exit(&payload);
        return;
    }

    println!("planvet delta {}", changeset.id);
    println!(
        "  Versions: {} -> {}",
        changeset.parent_submission_id, changeset.submission_id
    );
    println!("  Change items: {}", changeset.items.len());
    println!("  Significance: {score:.2}");
    let (rules, truncated) =
        sample_with_truncation(impacted.iter().cloned().collect(), FINDING_SAMPLE_LIMIT);
    if rules.is_empty() {
        println!("  Impacted rules: none");
    } else {
        print_sample_block("Impacted rules", &rules, truncated);
    }

    if let Some(outcome) = revalidation {
        println!(
            "  Re-validation: pass: {}  fail: {}  needs_review: {}  skipped: {}",
            outcome.summary.pass,
            outcome.summary.fail,
            outcome.summary.needs_review,
            outcome.summary.skipped,
        );
    }
}
