use crate::config::{env_or, env_parse, Settings};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{CompletionClient, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let timeout_secs = env_parse("ANTHROPIC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build anthropic http client")?;

        Ok(Self {
            http,
            api_key,
            base_url: env_or("ANTHROPIC_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("ANTHROPIC_MODEL", DEFAULT_MODEL),
            max_tokens: env_parse("ANTHROPIC_MAX_TOKENS", DEFAULT_MAX_TOKENS).max(1),
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest<'_>,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::http(Provider::Anthropic, status, text).into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn system_prompt() -> &'static str {
        "You are part of an automated equity research pipeline. \
Reply with exactly one JSON object and nothing else. \
Do not wrap it in markdown. Use double quotes for all JSON strings. No trailing commas."
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl CompletionClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let make_req = |max_tokens: u32| CreateMessageRequest {
            model: &self.model,
            max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let (mut raw_json, mut res) = self.create_message(make_req(self.max_tokens)).await?;

        // A truncated object is unparseable, so retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(4096);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            let (rj, r) = self.create_message(make_req(bumped)).await?;
            raw_json = rj;
            res = r;
        }

        let text = Self::response_text(&res);
        if text.trim().is_empty() {
            return Err(LlmDiagnosticsError::empty_response(Provider::Anthropic, raw_json).into());
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'static str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    // Thinking, tool_use and anything newer.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "{\"ticker\":"},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "\"AAPL\"}"},
            ],
            "stop_reason": "end_turn",
        }))
        .unwrap();

        assert_eq!(
            AnthropicClient::response_text(&res),
            "{\"ticker\":\n\"AAPL\"}"
        );
        assert_eq!(res.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn request_serializes_without_absent_system() {
        let req = CreateMessageRequest {
            model: "m",
            max_tokens: 16,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("system").is_none());
        assert_eq!(v["messages"][0]["content"], "hi");
    }
}
