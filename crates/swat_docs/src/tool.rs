use serde::Serialize;
use serde_json::{json, Value};
use swat_core::config::{Settings, ENV_DOCS_DIR};
use swat_core::error::{AppError, ErrorClass};
use tracing::{debug, info, warn};

use crate::citations::format_results;
use crate::embeddings::Embedder;
use crate::index::{Index, IndexStore};
use crate::retrieve::Retriever;

pub const TOOL_NAME: &str = "search_documentation";
pub const DEFAULT_TOP_K: usize = 3;
pub const MAX_TOP_K: usize = 10;

const NOT_AVAILABLE_PREFIX: &str = "Documentation search not available";

/// Validated tool arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
}

impl SearchRequest {
    pub fn from_args(args: &Value) -> Result<Self, AppError> {
        let empty = serde_json::Map::new();
        let obj = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(AppError::invalid_argument("Tool arguments must be a JSON object")),
        };

        let query = match obj.get("query") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(AppError::invalid_argument("query must be a non-empty string"))
            }
            Some(_) => return Err(AppError::invalid_argument("query must be a string")),
        };

        let top_k = match obj.get("top_k") {
            None | Some(Value::Null) => DEFAULT_TOP_K,
            Some(v) => {
                let k = v
                    .as_i64()
                    .ok_or_else(|| AppError::invalid_argument("top_k must be an integer"))?;
                if !(1..=MAX_TOP_K as i64).contains(&k) {
                    return Err(AppError::invalid_argument(format!(
                        "top_k must be between 1 and {MAX_TOP_K}"
                    ))
                    .with_details(format!("top_k={k}")));
                }
                k as usize
            }
        };

        Ok(Self { query, top_k })
    }
}

/// Tool payload returned to the calling assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
    pub error_class: Option<ErrorClass>,
}

impl ToolOutput {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
            error_class: None,
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        let class = err.class();
        let text = match class {
            ErrorClass::Setup => err.message.clone(),
            ErrorClass::InvalidArgument => format!("{}: {}", class.label(), err.message),
            _ => format!(
                "{}: {} [{}]",
                ErrorClass::Internal.label(),
                err.message,
                err.code
            ),
        };
        Self {
            text,
            is_error: true,
            error_class: Some(class),
        }
    }
}

enum DocsState {
    Disabled,
    Unavailable { reason: String },
    Ready { index: Index },
}

/// Per-process documentation search state, built once at startup and passed to every call.
pub struct DocsContext {
    state: DocsState,
    embedder: Box<dyn Embedder>,
}

impl DocsContext {
    pub fn disabled(embedder: Box<dyn Embedder>) -> Self {
        Self {
            state: DocsState::Disabled,
            embedder,
        }
    }

    pub fn unavailable(reason: impl Into<String>, embedder: Box<dyn Embedder>) -> Self {
        Self {
            state: DocsState::Unavailable {
                reason: reason.into(),
            },
            embedder,
        }
    }

    pub fn ready(index: Index, embedder: Box<dyn Embedder>) -> Self {
        Self {
            state: DocsState::Ready { index },
            embedder,
        }
    }

    /// Loads the persisted index named by `settings`. A missing configuration or index
    /// degrades to a "not available" context instead of failing startup.
    pub fn from_settings(settings: &Settings, embedder: Box<dyn Embedder>) -> Self {
        let index_dir = match settings.index_dir() {
            Some(dir) => dir,
            None => {
                info!("documentation search disabled; {ENV_DOCS_DIR} is not set");
                return Self::disabled(embedder);
            }
        };
        match IndexStore::open(index_dir.clone()).load() {
            Ok(index) => Self::ready(index, embedder),
            Err(e) => {
                warn!(index_dir = %index_dir.display(), error = %e, "documentation index unavailable");
                let reason = match e.class() {
                    ErrorClass::IndexNotFound => format!(
                        "no index found at {}; run `swat-copilot build-index` first",
                        index_dir.display()
                    ),
                    _ => format!("failed to load index at {}: {}", index_dir.display(), e),
                };
                Self::unavailable(reason, embedder)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, DocsState::Ready { .. })
    }

    fn require_index(&self) -> Result<&Index, AppError> {
        match &self.state {
            DocsState::Ready { index } => Ok(index),
            DocsState::Disabled => Err(AppError::setup_required(format!(
                "{NOT_AVAILABLE_PREFIX}: no documentation directory is configured (set {ENV_DOCS_DIR})"
            ))),
            DocsState::Unavailable { reason } => {
                Err(AppError::setup_required(format!("{NOT_AVAILABLE_PREFIX}: {reason}")))
            }
        }
    }

    /// Arguments are validated before availability, so malformed calls are reported the same
    /// way whether or not an index is loaded.
    pub fn search(&self, args: &Value) -> Result<String, AppError> {
        let req = SearchRequest::from_args(args)?;
        let index = self.require_index()?;
        debug!(query = %req.query, top_k = req.top_k, "searching documentation");
        let results = Retriever::new(index, self.embedder.as_ref()).retrieve(&req.query, req.top_k)?;
        Ok(format_results(&results, &req.query))
    }

    /// Tool entry point; never panics and never returns `Err`.
    pub fn search_documentation(&self, args: &Value) -> ToolOutput {
        match self.search(args) {
            Ok(text) => ToolOutput::ok(text),
            Err(e) => {
                if e.class() == ErrorClass::Internal {
                    warn!(error = %e, details = ?e.details, "documentation search failed");
                }
                ToolOutput::from_error(&e)
            }
        }
    }
}

/// MCP tool descriptor for `tools/list`.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Search the indexed SWAT documentation (theory, input/output and user manuals) \
                        and return the most relevant passages with source file and page citations.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language question, e.g. 'What is CN2?'"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of passages to return (default: 3)",
                    "minimum": 1,
                    "maximum": MAX_TOP_K,
                    "default": DEFAULT_TOP_K
                }
            },
            "required": ["query"]
        }
    })
}
