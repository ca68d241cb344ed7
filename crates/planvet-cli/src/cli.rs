use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "planvet",
    about = "Planvet: compliance validation for planning-application submissions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and lint a rule catalogue
    Catalogue {
        /// Path to the catalogue (JSON or TOML)
        #[arg(long, default_value = ".planvet/catalogue.json")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate one document's extraction against the catalogue
    Check {
        /// Path to the extraction payload JSON
        #[arg(long)]
        extraction: String,

        /// Path to the catalogue (JSON or TOML)
        #[arg(long, default_value = ".planvet/catalogue.json")]
        catalogue: String,

        /// Optional entity-store JSONL; enables submission-scoped rules
        /// and persists check rows back to it
        #[arg(long)]
        store: Option<String>,

        /// Document ID within the store
        #[arg(long)]
        document_id: Option<String>,

        /// Submission ID within the store
        #[arg(long)]
        submission_id: Option<String>,

        /// Classified document type, used by applies_to filters
        #[arg(long)]
        document_type: Option<String>,

        /// Declared application type (fee schedules, document sets)
        #[arg(long)]
        application_type: Option<String>,

        /// Run identifier; generated when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate every extraction of a submission through the worker pool
    Batch {
        /// Path to the entity-store JSONL
        #[arg(long, default_value = ".planvet/entities.jsonl")]
        store: String,

        /// Path to the catalogue (JSON or TOML)
        #[arg(long, default_value = ".planvet/catalogue.json")]
        catalogue: String,

        /// Directory of extraction payloads, one `<document_id>.json` each
        #[arg(long)]
        extractions: String,

        /// Submission whose documents are being validated
        #[arg(long)]
        submission_id: String,

        /// Worker-pool width
        #[arg(long, default_value_t = planvet_batch::DEFAULT_WORKERS)]
        workers: usize,

        /// Run identifier; generated when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the rule subset impacted by a resubmission delta
    Delta {
        /// Path to the entity-store JSONL
        #[arg(long, default_value = ".planvet/entities.jsonl")]
        store: String,

        /// Path to the catalogue (JSON or TOML)
        #[arg(long, default_value = ".planvet/catalogue.json")]
        catalogue: String,

        /// ChangeSet ID to analyse
        #[arg(long)]
        changeset: String,

        /// Re-run the impacted rules against an extraction payload
        #[arg(long)]
        revalidate: bool,

        /// Extraction payload for --revalidate
        #[arg(long)]
        extraction: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
