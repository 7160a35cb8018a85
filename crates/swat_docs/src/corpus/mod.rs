pub mod chunking;
pub mod extract;
pub mod model;

pub use chunking::{Chunker, ChunkerConfig};
pub use extract::{extract_document, load_corpus, CorpusLoad, ExtractionFailure};
pub use model::{Chunk, CitationLocator, Document, DocumentKind, PageText};
