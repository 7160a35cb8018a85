use pretty_assertions::assert_eq;
use std::fs;

use swat_core::config::Settings;
use swat_core::error::{codes, AppError, ErrorClass};
use swat_copilot_lib::{build_index_with, search, SMOKE_QUERY};
use swat_docs::embeddings::Embedder;
use swat_docs::tool::DocsContext;

#[derive(Clone, Copy)]
struct WordLengthEmbedder;

impl Embedder for WordLengthEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; 8];
        for w in input.split_whitespace() {
            v[w.chars().count().min(8) - 1] += 1.0;
        }
        Ok(v)
    }
}

#[test]
fn build_reports_failures_and_runs_smoke_query() {
    let docs_dir = tempfile::tempdir().expect("tempdir");
    let root = docs_dir.path();
    fs::create_dir_all(root.join("pdfs")).expect("mkdir");
    fs::create_dir_all(root.join("text")).expect("mkdir");
    fs::write(root.join("pdfs/corrupt.pdf"), b"not a pdf").expect("write");
    fs::write(
        root.join("text/overview.txt"),
        "SWAT is the Soil and Water Assessment Tool developed by USDA-ARS.",
    )
    .expect("write");

    let settings = Settings::default().with_docs_dir(root);
    let summary = build_index_with(&settings, Box::new(WordLengthEmbedder)).expect("build");

    assert_eq!(summary.index_dir, root.join("vector_index"));
    assert_eq!(summary.documents_indexed, 1);
    assert_eq!(summary.chunk_count, 1);
    assert_eq!(summary.failed_documents.len(), 1);
    assert_eq!(summary.failed_documents[0].rel_path, "pdfs/corrupt.pdf");

    assert!(!summary.smoke_test.is_error);
    assert!(summary
        .smoke_test
        .text
        .starts_with(&format!("Found 1 relevant passage(s) for \"{SMOKE_QUERY}\":")));
    assert!(summary.smoke_test.text.contains("Source: overview.txt"));

    let ctx = DocsContext::from_settings(&settings, Box::new(WordLengthEmbedder));
    let out = search(&ctx, "Assessment Tool", Some(2));
    assert!(!out.is_error);
    assert!(out.text.contains("overview.txt"));

    let out = search(&ctx, "Assessment Tool", Some(0));
    assert_eq!(out.error_class, Some(ErrorClass::InvalidArgument));
}

#[test]
fn build_without_docs_dir_requires_setup() {
    let err = build_index_with(&Settings::default(), Box::new(WordLengthEmbedder)).unwrap_err();
    assert_eq!(err.code, codes::DOCS_SETUP_REQUIRED);
}

#[test]
fn invalid_chunk_settings_are_rejected_before_indexing() {
    let docs_dir = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default().with_docs_dir(docs_dir.path());
    settings.chunk_overlap = settings.chunk_size;

    let err = build_index_with(&settings, Box::new(WordLengthEmbedder)).unwrap_err();
    assert_eq!(err.code, codes::INVALID_ARGUMENT);
    assert!(!docs_dir.path().join("vector_index").exists());
}
