use crate::config::{env_or, env_parse, Settings};
use crate::search::SearchClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";
const DEFAULT_NUM_RESULTS: u32 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct SerperClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    num_results: u32,
}

impl SerperClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_serper_api_key()?.to_string();
        let timeout_secs = env_parse("SERPER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build search http client")?;

        Ok(Self {
            http,
            api_key,
            base_url: env_or("SERPER_BASE_URL", DEFAULT_BASE_URL),
            num_results: env_parse("SERPER_NUM_RESULTS", DEFAULT_NUM_RESULTS).max(1),
        })
    }
}

#[async_trait::async_trait]
impl SearchClient for SerperClient {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str) -> Result<String> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.num_results,
            })
            .send()
            .await
            .context("search request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read search response")?;
        if !status.is_success() {
            anyhow::bail!("search HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<SearchResponse>(&text)
            .context("failed to parse search response")?;
        Ok(flatten_results(&parsed))
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Default, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgeGraph {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    snippet: Option<String>,
}

fn flatten_results(res: &SearchResponse) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if let Some(answer_box) = &res.answer_box {
        parts.extend(answer_box.answer.as_deref());
        parts.extend(answer_box.snippet.as_deref());
    }
    if let Some(kg) = &res.knowledge_graph {
        parts.extend(kg.title.as_deref());
        parts.extend(kg.description.as_deref());
    }
    parts.extend(res.organic.iter().filter_map(|r| r.snippet.as_deref()));

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_answer_box_graph_and_snippets_in_order() {
        let res: SearchResponse = serde_json::from_value(json!({
            "searchParameters": {"q": "AAPL Apple stock news today"},
            "answerBox": {"snippet": "Apple shares rose 2%."},
            "knowledgeGraph": {"title": "Apple Inc.", "description": "Technology company."},
            "organic": [
                {"title": "t1", "link": "https://a", "snippet": "Analysts raise targets."},
                {"title": "t2", "link": "https://b"},
                {"title": "t3", "link": "https://c", "snippet": "  "},
                {"title": "t4", "link": "https://d", "snippet": "iPhone sales beat."},
            ],
        }))
        .unwrap();

        assert_eq!(
            flatten_results(&res),
            "Apple shares rose 2%. Apple Inc. Technology company. Analysts raise targets. iPhone sales beat."
        );
    }

    #[test]
    fn empty_response_flattens_to_empty_text() {
        let res: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(flatten_results(&res), "");
    }
}
