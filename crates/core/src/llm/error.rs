use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

const EXCERPT_CHARS: usize = 300;

/// A completion call that failed at a known point, with whatever the provider sent back.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let raw_response_json = serde_json::from_str::<Value>(&body).ok();
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
            raw_response_json,
        }
    }

    pub fn empty_response(provider: Provider, raw_response_json: Value) -> Self {
        Self {
            provider,
            stage: "empty_response",
            detail: "response carried no text content".to_string(),
            raw_output: None,
            raw_response_json: Some(raw_response_json),
        }
    }

    /// First few hundred characters of the raw output, for log lines.
    pub fn raw_excerpt(&self) -> Option<String> {
        self.raw_output
            .as_deref()
            .map(|s| s.chars().take(EXCERPT_CHARS).collect())
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
