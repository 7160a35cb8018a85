use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use swat_core::config::Settings;
use swat_core::error::{codes, AppError};
use swat_copilot_lib::{build_index, docs_context, search, serve, BuildIndexSummary};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "swat-copilot", version, about = "SWAT documentation search for coding assistants")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the MCP server on stdin/stdout (default).
    Serve,
    /// Extract, chunk and embed the documentation folder, then replace the index.
    BuildIndex {
        #[arg(long)]
        docs_dir: Option<PathBuf>,
        #[arg(long)]
        index_dir: Option<PathBuf>,
        /// Print the build summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run one documentation search and print the result.
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries JSON-RPC in serve mode.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(code = %e.code, details = ?e.details, "{}", e.message);
            eprintln!("error: {e}");
            if let Some(details) = e.details.as_deref() {
                eprintln!("  {details}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let settings = Settings::from_env()?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(&settings)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::BuildIndex {
            docs_dir,
            index_dir,
            json,
        } => {
            let mut settings = settings;
            if let Some(dir) = docs_dir {
                settings = settings.with_docs_dir(dir);
            }
            if let Some(dir) = index_dir {
                settings = settings.with_index_dir(dir);
            }
            let summary = build_index(&settings)?;
            if json {
                let encoded = serde_json::to_string_pretty(&summary).map_err(|e| {
                    AppError::new(codes::SUMMARY_ENCODE_FAILED, "Failed to encode build summary")
                        .with_details(e.to_string())
                })?;
                println!("{encoded}");
            } else {
                print_summary(&summary);
            }
            Ok(if summary.smoke_test.is_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Search { query, top_k } => {
            let ctx = docs_context(&settings)?;
            let out = search(&ctx, &query, top_k);
            println!("{}", out.text);
            Ok(if out.is_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn print_summary(summary: &BuildIndexSummary) {
    println!("Index written to {}", summary.index_dir.display());
    println!(
        "Indexed {} document(s) as {} chunk(s)",
        summary.documents_indexed, summary.chunk_count
    );
    if !summary.failed_documents.is_empty() {
        println!("Skipped {} document(s):", summary.failed_documents.len());
        for f in summary.failed_documents.iter() {
            println!("  {}: {}", f.rel_path, f.error);
        }
    }
    println!();
    println!("Smoke test:");
    println!("{}", summary.smoke_test.text);
}
