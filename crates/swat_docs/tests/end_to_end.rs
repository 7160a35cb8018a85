use pretty_assertions::assert_eq;
use std::fs;

use serde_json::json;
use swat_core::config::Settings;
use swat_core::error::AppError;
use swat_docs::corpus::{Chunker, Document};
use swat_docs::embeddings::Embedder;
use swat_docs::index::{build_index, IndexStore};
use swat_docs::pipeline::rebuild_index;
use swat_docs::tool::DocsContext;

/// Bag of letters; similar wording gives similar vectors.
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; 27];
        for c in input.to_ascii_lowercase().chars() {
            match c {
                'a'..='z' => v[(c as u8 - b'a') as usize] += 1.0,
                '0'..='9' => v[26] += 1.0,
                _ => {}
            }
        }
        Ok(v)
    }
}

#[test]
fn cn2_query_cites_manual_page() {
    let docs = vec![Document::from_pages(
        "manual.pdf",
        [(255, "CN2 is the SCS runoff curve number for moisture condition II.")],
    )];
    let index = build_index(&docs, &Chunker::default(), &LetterEmbedder, "mock").expect("build");
    let ctx = DocsContext::ready(index, Box::new(LetterEmbedder));

    let out = ctx.search_documentation(&json!({"query": "What is CN2?", "top_k": 1}));
    assert!(!out.is_error, "{}", out.text);
    assert!(out.text.contains("manual.pdf"));
    assert!(out.text.contains("Page: 255"));
    assert!(out.text.contains("CN2 is the SCS runoff curve number"));
}

#[test]
fn built_index_is_served_from_settings() {
    let docs_dir = tempfile::tempdir().expect("tempdir");
    let text_dir = docs_dir.path().join("text");
    fs::create_dir_all(&text_dir).expect("mkdir");
    fs::write(
        text_dir.join("swat_overview.txt"),
        "SWAT is the Soil and Water Assessment Tool, a river basin scale model.",
    )
    .expect("write");
    fs::write(
        text_dir.join("esco.txt"),
        "ESCO is the soil evaporation compensation factor.",
    )
    .expect("write");

    let settings = Settings::default().with_docs_dir(docs_dir.path());
    let index_dir = settings.index_dir().expect("index dir");
    let store = IndexStore::open(index_dir);
    rebuild_index(
        docs_dir.path(),
        &store,
        &Chunker::default(),
        &LetterEmbedder,
        &settings.embed_model,
    )
    .expect("rebuild");

    let ctx = DocsContext::from_settings(&settings, Box::new(LetterEmbedder));
    assert!(ctx.is_ready());

    let out = ctx.search_documentation(&json!({"query": "What is SWAT?"}));
    assert!(!out.is_error, "{}", out.text);
    assert!(out.text.starts_with("Found 2 relevant passage(s) for \"What is SWAT?\":"));
    assert!(out.text.contains("Page: N/A"));
    assert_eq!(out.error_class, None);
}
