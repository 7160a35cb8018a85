use std::io;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;
use swat_core::config::{Settings, ENV_DOCS_DIR};
use swat_core::error::AppError;
use swat_docs::corpus::{Chunker, ChunkerConfig};
use swat_docs::embeddings::{Embedder, OllamaEmbedder};
use swat_docs::index::IndexStore;
use swat_docs::ollama::OllamaClient;
use swat_docs::pipeline::rebuild_index;
use swat_docs::tool::{DocsContext, ToolOutput};
use tracing::info;

pub mod mcp;

/// Query run after every build to confirm the new index answers.
pub const SMOKE_QUERY: &str = "What is SWAT?";

#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub rel_path: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildIndexSummary {
    pub index_dir: PathBuf,
    pub documents_indexed: u32,
    pub chunk_count: u32,
    pub failed_documents: Vec<FailedDocument>,
    pub smoke_test: ToolOutput,
}

fn ollama_embedder(settings: &Settings) -> Result<OllamaEmbedder, AppError> {
    Ok(OllamaEmbedder::new(OllamaClient::new(&settings.ollama_url)?))
}

/// Search context for `settings`, backed by the local Ollama embedder.
pub fn docs_context(settings: &Settings) -> Result<DocsContext, AppError> {
    let embedder = ollama_embedder(settings)?;
    Ok(DocsContext::from_settings(settings, Box::new(embedder)))
}

pub fn serve(settings: &Settings) -> Result<(), AppError> {
    let ctx = docs_context(settings)?;
    let server = mcp::McpServer::new(ctx);
    server.run(io::stdin().lock(), io::stdout().lock())
}

pub fn build_index(settings: &Settings) -> Result<BuildIndexSummary, AppError> {
    let embedder = ollama_embedder(settings)?;
    embedder.client().health_check()?;
    build_index_with(settings, Box::new(embedder))
}

/// Rebuilds the index for `settings.docs_dir` and finishes with a one-result smoke query.
pub fn build_index_with(
    settings: &Settings,
    embedder: Box<dyn Embedder>,
) -> Result<BuildIndexSummary, AppError> {
    let docs_dir = settings.docs_dir.clone().ok_or_else(|| {
        AppError::setup_required(format!(
            "No documentation directory configured; set {ENV_DOCS_DIR} or pass --docs-dir"
        ))
    })?;
    let index_dir = settings.index_dir().unwrap_or_else(|| docs_dir.clone());

    let chunker = Chunker::new(ChunkerConfig::new(
        settings.chunk_size,
        settings.chunk_overlap,
    )?);
    let store = IndexStore::open(index_dir);
    let (index, report) = rebuild_index(
        &docs_dir,
        &store,
        &chunker,
        embedder.as_ref(),
        &settings.embed_model,
    )?;

    let ctx = DocsContext::ready(index, embedder);
    let smoke_test = ctx.search_documentation(&json!({ "query": SMOKE_QUERY, "top_k": 1 }));
    info!(is_error = smoke_test.is_error, "smoke query finished");

    Ok(BuildIndexSummary {
        index_dir: report.index_dir,
        documents_indexed: report.documents_indexed,
        chunk_count: report.chunk_count,
        failed_documents: report
            .failures
            .into_iter()
            .map(|f| FailedDocument {
                rel_path: f.rel_path,
                error: f.error.to_string(),
            })
            .collect(),
        smoke_test,
    })
}

/// One-off tool call; `top_k` is passed through unvalidated so the tool reports range errors.
pub fn search(ctx: &DocsContext, query: &str, top_k: Option<i64>) -> ToolOutput {
    let mut args = json!({ "query": query });
    if let Some(k) = top_k {
        args["top_k"] = json!(k);
    }
    ctx.search_documentation(&args)
}
