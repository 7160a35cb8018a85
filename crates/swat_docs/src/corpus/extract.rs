use std::fs;
use std::path::Path;

use lopdf::Document as PdfDocument;
use swat_core::config::DEFAULT_INDEX_DIR_NAME;
use swat_core::error::{codes, AppError};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::model::{Document, DocumentKind, PageText};

#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub rel_path: String,
    pub error: AppError,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusLoad {
    pub documents: Vec<Document>,
    pub failures: Vec<ExtractionFailure>,
}

/// Walks `root` for `.pdf` and `.txt` files in sorted path order. Files that yield no text are
/// reported in `failures` and do not stop the walk.
pub fn load_corpus(root: &Path) -> Result<CorpusLoad, AppError> {
    if !root.is_dir() {
        return Err(AppError::setup_required("Documentation directory not found")
            .with_details(format!("path={}", root.display())));
    }

    let mut out = CorpusLoad::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if document_kind(path).is_none() {
            continue;
        }
        let rel_path = relative_path(root, path);
        match extract_document(path, &rel_path) {
            Ok(doc) => {
                debug!(rel_path = %rel_path, pages = doc.pages.len(), "extracted document");
                out.documents.push(doc);
            }
            Err(error) => {
                warn!(rel_path = %rel_path, error = %error, "document skipped");
                out.failures.push(ExtractionFailure { rel_path, error });
            }
        }
    }

    info!(
        root = %root.display(),
        documents = out.documents.len(),
        failures = out.failures.len(),
        "corpus loaded"
    );
    Ok(out)
}

/// Extracts one file. `rel_path` is the corpus-relative identity recorded on its chunks.
pub fn extract_document(path: &Path, rel_path: &str) -> Result<Document, AppError> {
    let kind = document_kind(path).ok_or_else(|| {
        AppError::new(codes::EXTRACTION_FAILED, "Unsupported document type")
            .with_details(format!("path={}", path.display()))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string());

    let pages = match kind {
        DocumentKind::Pdf => extract_pdf_pages(path)?,
        DocumentKind::Text => vec![PageText {
            page: None,
            text: read_text_lossy(path)?,
        }],
    };

    let doc = Document {
        name,
        rel_path: rel_path.to_string(),
        kind,
        pages,
    };
    if !doc.has_text() {
        return Err(AppError::new(
            codes::EXTRACTION_FAILED,
            "Document has no extractable text",
        )
        .with_details(format!("path={}", path.display())));
    }
    Ok(doc)
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<PageText>, AppError> {
    let pdf = PdfDocument::load(path).map_err(|e| {
        AppError::new(codes::EXTRACTION_FAILED, "Failed to load PDF")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;

    // get_pages is keyed by 1-based page number in a BTreeMap, so iteration is in page order.
    let mut pages = Vec::new();
    for page_no in pdf.get_pages().keys().copied() {
        match pdf.extract_text(&[page_no]) {
            Ok(text) => pages.push(PageText {
                page: Some(page_no),
                text,
            }),
            Err(e) => {
                debug!(path = %path.display(), page = page_no, error = %e, "page has no text layer");
            }
        }
    }
    Ok(pages)
}

// Undecodable bytes are replaced rather than failing the whole file.
fn read_text_lossy(path: &Path) -> Result<String, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new(codes::EXTRACTION_FAILED, "Failed to read text document")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentKind::from_extension)
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && name == DEFAULT_INDEX_DIR_NAME
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
