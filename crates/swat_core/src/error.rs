use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes shared by every layer.
pub mod codes {
    pub const DOCS_SETUP_REQUIRED: &str = "DOCS_SETUP_REQUIRED";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const INDEX_NOT_FOUND: &str = "INDEX_NOT_FOUND";
    pub const EXTRACTION_FAILED: &str = "EXTRACTION_FAILED";

    pub const INDEX_BUILD_FAILED: &str = "INDEX_BUILD_FAILED";
    pub const INDEX_STORE_FAILED: &str = "INDEX_STORE_FAILED";
    pub const EMBEDDINGS_FAILED: &str = "EMBEDDINGS_FAILED";
    pub const RETRIEVAL_FAILED: &str = "RETRIEVAL_FAILED";
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    pub const OLLAMA_REMOTE_NOT_ALLOWED: &str = "OLLAMA_REMOTE_NOT_ALLOWED";
    pub const OLLAMA_UNHEALTHY: &str = "OLLAMA_UNHEALTHY";
    pub const OLLAMA_UNREACHABLE: &str = "OLLAMA_UNREACHABLE";

    pub const SERVER_IO_FAILED: &str = "SERVER_IO_FAILED";
    pub const SUMMARY_ENCODE_FAILED: &str = "SUMMARY_ENCODE_FAILED";
}

/// Single structured error shape used across backend layers and exposed to tool callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_ARGUMENT, message)
    }

    pub fn setup_required(message: impl Into<String>) -> Self {
        Self::new(codes::DOCS_SETUP_REQUIRED, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::of(self)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// User-facing grouping of error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Documentation search is not configured or its index is missing.
    Setup,
    InvalidArgument,
    IndexNotFound,
    Extraction,
    Internal,
}

impl ErrorClass {
    pub fn of(err: &AppError) -> Self {
        match err.code.as_str() {
            codes::DOCS_SETUP_REQUIRED => ErrorClass::Setup,
            codes::INVALID_ARGUMENT => ErrorClass::InvalidArgument,
            codes::INDEX_NOT_FOUND => ErrorClass::IndexNotFound,
            codes::EXTRACTION_FAILED => ErrorClass::Extraction,
            _ => ErrorClass::Internal,
        }
    }

    /// Prefix used when the error is shown to a tool caller.
    pub fn label(self) -> &'static str {
        match self {
            ErrorClass::Setup => "Not available",
            ErrorClass::InvalidArgument => "Invalid argument",
            ErrorClass::IndexNotFound => "Index not found",
            ErrorClass::Extraction => "Extraction failed",
            ErrorClass::Internal => "Internal error",
        }
    }
}
