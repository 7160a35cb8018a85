use std::path::{Path, PathBuf};

use swat_core::error::AppError;
use tracing::info;

use crate::corpus::{load_corpus, Chunker, ExtractionFailure};
use crate::embeddings::Embedder;
use crate::index::{build_index, Index, IndexStore};

#[derive(Debug, Clone)]
pub struct BuildIndexReport {
    pub index_dir: PathBuf,
    pub documents_indexed: u32,
    pub chunk_count: u32,
    pub failures: Vec<ExtractionFailure>,
}

/// One-shot rebuild: load the corpus, chunk, embed, then atomically replace the persisted index.
pub fn rebuild_index(
    docs_dir: &Path,
    store: &IndexStore,
    chunker: &Chunker,
    embedder: &dyn Embedder,
    model: &str,
) -> Result<(Index, BuildIndexReport), AppError> {
    info!(docs_dir = %docs_dir.display(), index_dir = %store.dir().display(), "rebuilding index");

    let corpus = load_corpus(docs_dir)?;
    let index = build_index(&corpus.documents, chunker, embedder, model)?;
    store.save(&index)?;

    let report = BuildIndexReport {
        index_dir: store.dir().to_path_buf(),
        documents_indexed: index.manifest().document_count,
        chunk_count: index.manifest().chunk_count,
        failures: corpus.failures,
    };
    Ok((index, report))
}
