pub mod citations;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod ollama;
pub mod pipeline;
pub mod retrieve;
pub mod tool;
