pub mod domain;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod search;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub llm_provider: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub serper_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub report_dir: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                serper_api_key: std::env::var("SERPER_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                report_dir: std::env::var("REPORT_DIR").ok(),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_serper_api_key(&self) -> anyhow::Result<&str> {
            self.serper_api_key
                .as_deref()
                .context("SERPER_API_KEY is required")
        }

        pub fn report_dir(&self) -> PathBuf {
            self.report_dir
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    /// Non-blank value of `key`, or `default`.
    pub fn env_or(key: &str, default: &str) -> String {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// `key` parsed as `T`. Unset or unparseable values fall back to `default`.
    pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
        std::env::var(key)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(default)
    }

}
