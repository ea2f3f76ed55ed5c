pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;

use crate::config::Settings;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Opaque text generator. The output is expected, not guaranteed, to follow the prompt's schema.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn CompletionClient>> {
    let provider = match settings.llm_provider.as_deref() {
        None => Provider::Anthropic,
        Some(s) => Provider::parse(s)
            .ok_or_else(|| anyhow::anyhow!("unsupported LLM_PROVIDER: {s}"))?,
    };

    Ok(match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::OpenAI => Arc::new(openai::OpenAiClient::from_settings(settings)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names() {
        assert_eq!(Provider::parse("Anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::parse(" openai "), Some(Provider::OpenAI));
        assert_eq!(Provider::parse("ollama"), None);
    }

    #[test]
    fn rejects_unknown_provider_setting() {
        let settings = Settings {
            llm_provider: Some("ollama".to_string()),
            anthropic_api_key: None,
            openai_api_key: None,
            serper_api_key: None,
            sentry_dsn: None,
            report_dir: None,
        };
        let err = client_from_settings(&settings).err().unwrap();
        assert!(err.to_string().contains("unsupported LLM_PROVIDER"));
    }
}
