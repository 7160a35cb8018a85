use std::time::Duration;

use serde::{Deserialize, Serialize};
use swat_core::error::{codes, AppError};

use super::Embedder;
use crate::ollama::OllamaClient;

const MAX_INPUT_BYTES: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct EmbedBatchRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model,
            prompt: bounded(input),
        };
        let v: EmbeddingsResponse = post_json(&url, &req)?;
        if v.embedding.is_empty() {
            return Err(AppError::new(
                codes::EMBEDDINGS_FAILED,
                "Embeddings response was empty",
            ));
        }
        Ok(v.embedding)
    }

    fn embed_batch(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.client.base_url());
        let req = EmbedBatchRequest {
            model,
            input: inputs.iter().map(|s| bounded(s)).collect(),
        };
        let v: EmbedBatchResponse = post_json(&url, &req)?;
        if v.embeddings.len() != inputs.len() {
            return Err(AppError::new(
                codes::EMBEDDINGS_FAILED,
                "Embeddings response count does not match input count",
            )
            .with_details(format!("inputs={}; embeddings={}", inputs.len(), v.embeddings.len())));
        }
        if v.embeddings.iter().any(|e| e.is_empty()) {
            return Err(AppError::new(
                codes::EMBEDDINGS_FAILED,
                "Embeddings response contained an empty vector",
            ));
        }
        Ok(v.embeddings)
    }
}

fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
    url: &str,
    req: &Req,
) -> Result<Resp, AppError> {
    let body = serde_json::to_value(req).map_err(|e| {
        AppError::new(codes::EMBEDDINGS_FAILED, "Failed to encode embeddings request")
            .with_details(e.to_string())
    })?;
    let resp = ureq::post(url)
        .timeout(Duration::from_secs(10))
        .send_json(body);

    match resp {
        Ok(r) if r.status() == 200 => r.into_json().map_err(|e| {
            AppError::new(codes::EMBEDDINGS_FAILED, "Failed to decode embeddings response")
                .with_details(e.to_string())
        }),
        Ok(r) => Err(
            AppError::new(codes::EMBEDDINGS_FAILED, "Embeddings request failed")
                .with_details(format!("status={}", r.status())),
        ),
        Err(ureq::Error::Status(status, _)) => Err(
            AppError::new(codes::EMBEDDINGS_FAILED, "Embeddings request failed")
                .with_details(format!("status={status}")),
        ),
        Err(e) => Err(
            AppError::new(codes::EMBEDDINGS_FAILED, "Failed to call embeddings endpoint")
                .with_details(e.to_string())
                .with_retryable(true),
        ),
    }
}

/// Caps a single input at `MAX_INPUT_BYTES`, cutting on a char boundary.
fn bounded(input: &str) -> &str {
    if input.len() <= MAX_INPUT_BYTES {
        return input;
    }
    let mut end = MAX_INPUT_BYTES;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}
