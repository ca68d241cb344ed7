//! Planvet CLI: the `planvet` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Catalogue { path, json } => commands::catalogue::run(path, json),

        Commands::Check {
            extraction,
            catalogue,
            store,
            document_id,
            submission_id,
            document_type,
            application_type,
            run_id,
            json,
        } => commands::check::run(commands::check::Args {
            extraction,
            catalogue,
            store,
            document_id,
            submission_id,
            document_type,
            application_type,
            run_id,
            json,
        }),

        Commands::Batch {
            store,
            catalogue,
            extractions,
            submission_id,
            workers,
            run_id,
            json,
        } => commands::batch::run(commands::batch::Args {
            store,
            catalogue,
            extractions,
            submission_id,
            workers,
            run_id,
            json,
        }),

        Commands::Delta {
            store,
            catalogue,
            changeset,
            revalidate,
            extraction,
            json,
        } => commands::delta::run(commands::delta::Args {
            store,
            catalogue,
            changeset,
            revalidate,
            extraction,
            json,
        }),
    }
}
