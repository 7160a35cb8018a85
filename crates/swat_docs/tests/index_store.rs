use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

use swat_core::clock::is_rfc3339;
use swat_core::error::{codes, AppError};
use swat_docs::corpus::{Chunker, ChunkerConfig, Document};
use swat_docs::embeddings::Embedder;
use swat_docs::index::{build_index, IndexStore, VectorIndex, INDEX_FILE_NAME};
use swat_docs::pipeline::rebuild_index;

/// Deterministic embedding: [chars, digits, first_char].
struct ShapeEmbedder;

impl Embedder for ShapeEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let chars = input.chars().count() as f32;
        let digits = input.chars().filter(|c| c.is_ascii_digit()).count() as f32;
        let first = input.chars().next().map(|c| c as u32).unwrap_or(0) as f32;
        Ok(vec![chars, digits, first])
    }
}

struct RaggedEmbedder;

impl Embedder for RaggedEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0; 1 + input.len() % 2])
    }
}

fn documents() -> Vec<Document> {
    vec![
        Document::from_pages(
            "swat2012_io.pdf",
            [
                (12, "HRU input file (.hru) holds slope and lateral flow parameters."),
                (13, "ESCO is the soil evaporation compensation factor, between 0.01 and 1.0."),
            ],
        )
        .with_rel_path("pdfs/swat2012_io.pdf"),
        Document::from_text("readme.txt", "Calibration notes for the Upper Mississippi model."),
    ]
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

#[test]
fn save_then_load_round_trips_chunks_and_vectors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("vector_index"));
    assert!(!store.exists());

    let chunker = Chunker::new(ChunkerConfig::new(40, 10).expect("config"));
    let index = build_index(&documents(), &chunker, &ShapeEmbedder, "mock").expect("build");
    assert!(index.len() > 2);
    store.save(&index).expect("save");

    assert!(store.dir().join(INDEX_FILE_NAME).is_file());
    let loaded = store.load().expect("load");
    assert_eq!(loaded, index);

    let status = store.status().expect("status");
    assert!(status.ready);
    let manifest = status.manifest.expect("manifest");
    assert_eq!(manifest.model, "mock");
    assert_eq!(manifest.dims, Some(3));
    assert_eq!(manifest.document_count, 2);
    assert_eq!(manifest.chunk_count as usize, index.len());
    assert_eq!(manifest.chunk_max_chars, 40);
    assert_eq!(manifest.chunk_overlap_chars, 10);
    assert!(is_rfc3339(&manifest.built_at));
}

#[test]
fn missing_index_is_reported_as_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());

    let err = store.load().unwrap_err();
    assert_eq!(err.code, codes::INDEX_NOT_FOUND);

    let status = store.status().expect("status");
    assert!(!status.ready);
    assert_eq!(status.manifest, None);
}

#[test]
fn failed_save_leaves_previous_index_loadable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().to_path_buf());
    let chunker = Chunker::default();

    let first = build_index(&documents()[..1], &chunker, &ShapeEmbedder, "mock").expect("build");
    store.save(&first).expect("save first");

    // A non-empty directory where the temp file goes makes the next save fail.
    write(dir.path(), &format!("{INDEX_FILE_NAME}.tmp/blocker"), "x");

    let second = build_index(&documents(), &chunker, &ShapeEmbedder, "mock").expect("build");
    let err = store.save(&second).unwrap_err();
    assert_eq!(err.code, codes::INDEX_STORE_FAILED);

    assert_eq!(store.load().expect("load"), first);
}

#[test]
fn ragged_embeddings_abort_the_build() {
    let docs = vec![
        Document::from_text("even.txt", "ab"),
        Document::from_text("odd.txt", "abc"),
    ];
    let err = build_index(&docs, &Chunker::default(), &RaggedEmbedder, "mock").unwrap_err();
    assert_eq!(err.code, codes::INDEX_BUILD_FAILED);
}

#[test]
fn rebuilding_an_unchanged_corpus_is_idempotent() {
    let docs_dir = tempfile::tempdir().expect("tempdir");
    write(
        docs_dir.path(),
        "text/curve_numbers.txt",
        "CN2 is the SCS runoff curve number for moisture condition II.\n\n\
         It is adjusted for slope before use.",
    );
    write(docs_dir.path(), "text/notes.txt", "ESCO defaults to 0.95.");

    let store = IndexStore::open(docs_dir.path().join("vector_index"));
    let chunker = Chunker::new(ChunkerConfig::new(60, 15).expect("config"));

    let (first, report) =
        rebuild_index(docs_dir.path(), &store, &chunker, &ShapeEmbedder, "mock").expect("first");
    assert_eq!(report.documents_indexed, 2);
    assert!(report.failures.is_empty());

    // The index directory lives inside the corpus and must not be picked up on rebuild.
    let (second, _) =
        rebuild_index(docs_dir.path(), &store, &chunker, &ShapeEmbedder, "mock").expect("second");
    assert_eq!(second.entries(), first.entries());
    assert_eq!(store.load().expect("load").entries(), first.entries());
}
