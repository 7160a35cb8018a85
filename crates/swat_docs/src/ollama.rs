use std::time::Duration;

use swat_core::error::{codes, AppError};

const LOCAL_PREFIX: &str = "http://127.0.0.1";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !is_local_base_url(&base_url) {
            return Err(AppError::new(
                codes::OLLAMA_REMOTE_NOT_ALLOWED,
                "Ollama base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new(codes::OLLAMA_UNHEALTHY, "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                codes::OLLAMA_UNREACHABLE,
                "Failed to reach Ollama on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

// Accepts `http://127.0.0.1` optionally followed by `:<port>` with port in 1..=65535.
fn is_local_base_url(url: &str) -> bool {
    let rest = match url.strip_prefix(LOCAL_PREFIX) {
        Some(r) => r,
        None => return false,
    };
    if rest.is_empty() {
        return true;
    }
    let port = match rest.strip_prefix(':') {
        Some(p) => p,
        None => return false,
    };
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(port.parse::<u32>(), Ok(p) if (1..=65_535).contains(&p))
}
