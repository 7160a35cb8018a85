use swat_core::error::AppError;

/// Maps text to a fixed-length vector. Implementations must be deterministic for a fixed model.
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;

    fn embed_batch(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        inputs.iter().map(|input| self.embed(model, input)).collect()
    }
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;
