use serde::{Deserialize, Serialize};
use swat_core::clock::now_rfc3339_utc;
use swat_core::error::{codes, AppError};
use tracing::{info, warn};

use crate::corpus::{Chunk, Chunker, Document};
use crate::embeddings::Embedder;

mod similarity;
pub mod store;

pub use store::{IndexStatus, IndexStore, INDEX_FILE_NAME};

const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub model: String,
    pub dims: Option<u32>,
    pub document_count: u32,
    pub chunk_count: u32,
    pub chunk_max_chars: u32,
    pub chunk_overlap_chars: u32,
    pub built_at: String, // RFC3339
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Nearest-neighbour capability over embedded chunks.
pub trait VectorIndex {
    /// Embedding model the stored vectors were produced with.
    fn model(&self) -> &str;

    fn dims(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At most `top_k` chunks by descending cosine similarity; ties keep insertion order.
    fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, AppError>;
}

/// In-memory index: every (chunk, vector) pair in build order, scored by brute force.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new(manifest: IndexManifest, entries: Vec<IndexEntry>) -> Result<Self, AppError> {
        let dims = manifest.dims.map(|d| d as usize);
        for e in entries.iter() {
            if e.chunk.text.is_empty() {
                return Err(AppError::new(codes::INDEX_BUILD_FAILED, "Indexed chunk text is empty")
                    .with_details(format!("chunk_id={}", e.chunk.chunk_id)));
            }
            if Some(e.vector.len()) != dims {
                return Err(AppError::new(
                    codes::INDEX_BUILD_FAILED,
                    "Embedding dimension mismatch across chunks",
                )
                .with_details(format!(
                    "expected={:?}; got={}; chunk_id={}",
                    dims,
                    e.vector.len(),
                    e.chunk.chunk_id
                )));
            }
        }
        Ok(Self { manifest, entries })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

impl VectorIndex for Index {
    fn model(&self) -> &str {
        &self.manifest.model
    }

    fn dims(&self) -> Option<usize> {
        self.manifest.dims.map(|d| d as usize)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, AppError> {
        if self.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if Some(query.len()) != self.dims() {
            return Err(AppError::new(
                codes::RETRIEVAL_FAILED,
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={:?}; query_dims={}", self.dims(), query.len())));
        }

        let qnorm = similarity::l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let vnorm = similarity::l2_norm(&e.vector);
                (i, similarity::cosine_similarity(query, &e.vector, qnorm, vnorm))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Chunks and embeds every document. Documents without text are skipped with a warning; an
/// embedding failure aborts the build so no partial index is produced.
pub fn build_index(
    documents: &[Document],
    chunker: &Chunker,
    embedder: &dyn Embedder,
    model: &str,
) -> Result<Index, AppError> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut document_count: u32 = 0;
    for doc in documents {
        let doc_chunks = chunker.chunk_document(doc);
        if doc_chunks.is_empty() {
            warn!(rel_path = %doc.rel_path, "document yielded no chunks");
            continue;
        }
        document_count += 1;
        chunks.extend(doc_chunks);
    }
    if chunks.is_empty() {
        warn!("no documents with extractable text; building an empty index");
    }
    info!(documents = document_count, chunks = chunks.len(), model, "embedding chunks");

    let mut entries: Vec<IndexEntry> = Vec::with_capacity(chunks.len());
    let mut dims: Option<u32> = None;
    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(model, &inputs).map_err(|e| {
            AppError::new(codes::EMBEDDINGS_FAILED, "Failed to compute embeddings")
                .with_details(format!(
                    "first_chunk={}; err={}",
                    batch[0].chunk_id, e
                ))
                .with_retryable(e.retryable)
        })?;
        if vectors.len() != batch.len() {
            return Err(AppError::new(
                codes::INDEX_BUILD_FAILED,
                "Embedder returned the wrong number of vectors",
            )
            .with_details(format!("expected={}; got={}", batch.len(), vectors.len())));
        }
        for (chunk, vector) in batch.iter().zip(vectors) {
            let this_dims = vector.len() as u32;
            match dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        codes::INDEX_BUILD_FAILED,
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={}; got={}; chunk_id={}",
                        d, this_dims, chunk.chunk_id
                    )));
                }
                Some(_) => {}
                None => dims = Some(this_dims),
            }
            entries.push(IndexEntry {
                chunk: chunk.clone(),
                vector,
            });
        }
    }

    let config = chunker.config();
    let manifest = IndexManifest {
        model: model.to_string(),
        dims,
        document_count,
        chunk_count: entries.len() as u32,
        chunk_max_chars: config.max_chars() as u32,
        chunk_overlap_chars: config.overlap_chars() as u32,
        built_at: now_rfc3339_utc()?,
    };
    Index::new(manifest, entries)
}
