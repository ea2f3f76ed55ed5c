//! Deterministic collaborators for pipeline tests.

use crate::domain::stock::StockRecord;
use crate::llm::{CompletionClient, Provider};
use crate::search::SearchClient;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn record(ticker: &str, change_percent: f64) -> StockRecord {
    StockRecord {
        ticker: ticker.to_string(),
        company_name: format!("{ticker} Corp"),
        price: 100.0,
        change: change_percent,
        change_percent,
        volume: 12_345_678,
        avg_volume_3m: 9_000_000,
        market_cap: "1.200T".to_string(),
        pe_ratio: Some(31.4),
        week_52_change_pct: 25.0,
        week_52_low: 60.0,
        week_52_high: 140.0,
        earnings_date: None,
    }
}

/// Replies with queued responses in order and records every prompt.
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<anyhow::Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: impl IntoIterator<Item = anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedLlm {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
    }
}

/// Answers each stage's prompt with well-formed JSON for the ticker named in it.
pub(crate) struct StageAwareLlm {
    verdicts: HashMap<String, (&'static str, f64)>,
    calls: Mutex<Vec<(String, &'static str)>>,
}

impl StageAwareLlm {
    pub(crate) fn new(verdicts: &[(&str, &'static str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            verdicts: verdicts
                .iter()
                .map(|(t, action, conf)| (t.to_string(), (*action, *conf)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// `(ticker, stage)` per call, in call order.
    pub(crate) fn calls(&self) -> Vec<(String, &'static str)> {
        self.calls.lock().unwrap().clone()
    }
}

fn prompt_ticker(prompt: &str) -> String {
    let marker = "\"ticker\": \"";
    prompt
        .find(marker)
        .map(|i| &prompt[i + marker.len()..])
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait::async_trait]
impl CompletionClient for StageAwareLlm {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let ticker = prompt_ticker(prompt);
        let (stage, body) = if prompt.contains("\"news_summary\"") {
            (
                "research",
                serde_json::json!({
                    "ticker": ticker,
                    "news_summary": format!("{ticker} moved on news."),
                    "key_events": [format!("{ticker} event")],
                }),
            )
        } else if prompt.contains("\"technical_analysis\"") {
            (
                "analysis",
                serde_json::json!({
                    "ticker": ticker,
                    "technical_analysis": format!("{ticker} trend."),
                    "sentiment": "positive",
                }),
            )
        } else {
            let (action, confidence) = self
                .verdicts
                .get(&ticker)
                .copied()
                .unwrap_or(("Hold", 0.5));
            (
                "recommendation",
                serde_json::json!({
                    "ticker": ticker,
                    "action": action,
                    "reasoning": format!("{ticker} reasoning."),
                    "confidence": confidence,
                }),
            )
        };
        self.calls.lock().unwrap().push((ticker, stage));
        Ok(body.to_string())
    }
}

/// Never answers within any reasonable stage timeout.
pub(crate) struct StallingLlm;

#[async_trait::async_trait]
impl CompletionClient for StallingLlm {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("{}".to_string())
    }
}

pub(crate) struct StaticSearch {
    text: String,
}

impl StaticSearch {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SearchClient for StaticSearch {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn search(&self, _query: &str) -> anyhow::Result<String> {
        Ok(self.text.clone())
    }
}

pub(crate) struct FailingSearch;

#[async_trait::async_trait]
impl SearchClient for FailingSearch {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn search(&self, _query: &str) -> anyhow::Result<String> {
        anyhow::bail!("search quota exhausted")
    }
}
