use serde::{Deserialize, Serialize};
use swat_core::error::{codes, AppError};
use tracing::debug;

use crate::corpus::{Chunk, CitationLocator};
use crate::embeddings::Embedder;
use crate::index::VectorIndex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
}

impl RetrievalHit {
    pub fn citation(&self) -> CitationLocator {
        self.chunk.locator()
    }
}

/// Hits ordered by descending score, ties by index insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

pub struct Retriever<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a dyn VectorIndex, embedder: &'a dyn Embedder) -> Self {
        Self { index, embedder }
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult, AppError> {
        if top_k < 1 {
            return Err(AppError::invalid_argument("top_k must be at least 1")
                .with_details(format!("top_k={top_k}")));
        }
        let q = query.trim();
        if q.is_empty() {
            return Err(AppError::invalid_argument("Query must not be empty"));
        }
        if self.index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let qv = self.embedder.embed(self.index.model(), q).map_err(|e| {
            AppError::new(codes::RETRIEVAL_FAILED, "Failed to embed query")
                .with_details(e.to_string())
                .with_retryable(e.retryable)
        })?;

        let hits = self
            .index
            .nearest(&qv, top_k)?
            .into_iter()
            .map(|s| RetrievalHit {
                chunk: s.chunk,
                score: s.score,
            })
            .collect::<Vec<_>>();

        debug!(top_k, hits = hits.len(), "retrieval complete");
        Ok(RetrievalResult { hits })
    }
}
