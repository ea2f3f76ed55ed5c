use crate::config::{env_or, env_parse};
use crate::domain::stock::StockRecord;
use crate::ingest::provider::UniverseProvider;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_URL: &str = "https://finance.yahoo.com/markets/stocks/most-active/";
const DEFAULT_MAX_STOCKS: usize = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Scrapes the Yahoo Finance most-active page. Quote data is read from the JSON the page embeds
/// in its `<script>` tags.
#[derive(Debug, Clone)]
pub struct YahooMostActive {
    http: reqwest::Client,
    url: String,
    max_stocks: usize,
    retries: u32,
}

impl YahooMostActive {
    pub fn from_env() -> Result<Self> {
        let url = env_or("YAHOO_MOST_ACTIVE_URL", DEFAULT_URL);
        let timeout_secs = env_parse("YAHOO_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let retries = env_parse("YAHOO_RETRIES", DEFAULT_RETRIES).max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build yahoo http client")?;

        Ok(Self {
            http,
            url,
            max_stocks: DEFAULT_MAX_STOCKS,
            retries,
        })
    }

    pub fn with_max_stocks(mut self, max_stocks: usize) -> Self {
        self.max_stocks = max_stocks;
        self
    }

    async fn fetch_page(&self) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self
                .http
                .get(&self.url)
                .headers(headers.clone())
                .send()
                .await;

            let res = match res {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("most-active page request failed");
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "most-active request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = res
                .text()
                .await
                .context("failed to read most-active page")?;

            if status.is_success() {
                return Ok(text);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.retries {
                let backoff = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(attempt, ?backoff, http_status = %status, "most-active HTTP error; retrying");
                tokio::time::sleep(backoff).await;
                continue;
            }
            anyhow::bail!("most-active page HTTP {status}");
        }
    }
}

#[async_trait::async_trait]
impl UniverseProvider for YahooMostActive {
    fn provider_name(&self) -> &'static str {
        "yahoo_most_active"
    }

    async fn fetch_universe(&self) -> Result<Vec<StockRecord>> {
        let html = self.fetch_page().await?;
        let stocks = parse_most_active(&html, self.max_stocks);
        tracing::info!(
            url = %self.url,
            html_bytes = html.len(),
            stocks = stocks.len(),
            "scraped most-active universe"
        );
        Ok(stocks)
    }
}

/// Extracts up to `max_stocks` records from the first embedded quote list found in the page.
pub fn parse_most_active(html: &str, max_stocks: usize) -> Vec<StockRecord> {
    for body in script_bodies(html) {
        if !body.contains("symbol") {
            continue;
        }
        let Some(data) = parse_script_json(body) else {
            continue;
        };
        let quotes = find_quotes(&data);
        if quotes.is_empty() {
            continue;
        }

        let mut out = Vec::new();
        for quote in &quotes {
            if out.len() >= max_stocks {
                break;
            }
            if quote.get("quoteType").and_then(Value::as_str) == Some("CRYPTOCURRENCY") {
                continue;
            }
            if let Some(record) = quote_to_record(quote) {
                out.push(record);
            }
        }

        if !out.is_empty() {
            return out;
        }
    }

    Vec::new()
}

fn script_bodies(html: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets, so indices into `lower` are valid for `html`.
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find("<script") {
        let tag_start = pos + rel;
        let Some(rel_gt) = lower[tag_start..].find('>') else {
            break;
        };
        let body_start = tag_start + rel_gt + 1;
        let Some(rel_close) = lower[body_start..].find("</script") else {
            break;
        };
        let body_end = body_start + rel_close;
        out.push(&html[body_start..body_end]);
        pos = body_end + "</script".len();
    }

    out
}

fn parse_script_json(body: &str) -> Option<Value> {
    let stripped = body.trim();
    for candidate in [stripped, strip_assignment(stripped)] {
        let candidate = candidate.trim_end().trim_end_matches(';').trim();
        if let Ok(v) = serde_json::from_str::<Value>(candidate) {
            return Some(v);
        }
    }
    None
}

/// `var x = {...}` / `window.app.data = {...}` to `{...}`.
fn strip_assignment(s: &str) -> &str {
    let Some(eq) = s.find('=') else {
        return s;
    };
    let lhs = s[..eq].trim();
    let lhs = ["var ", "let ", "const "]
        .iter()
        .find_map(|kw| lhs.strip_prefix(kw))
        .map(str::trim)
        .unwrap_or(lhs);

    let is_path = !lhs.is_empty()
        && lhs
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'));
    if is_path {
        s[eq + 1..].trim_start()
    } else {
        s
    }
}

fn find_quotes(blob: &Value) -> Vec<Value> {
    match blob {
        Value::Array(items) => {
            let looks_like_quotes = items
                .first()
                .and_then(Value::as_object)
                .is_some_and(|o| o.contains_key("symbol"));
            if looks_like_quotes {
                return items.clone();
            }
            for item in items {
                let found = find_quotes(item);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        Value::Object(map) => {
            if let Some(quotes @ Value::Array(_)) = map.get("quotes") {
                let found = find_quotes(quotes);
                if !found.is_empty() {
                    return found;
                }
            }
            for v in map.values() {
                let found = find_quotes(v);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        // Some pages embed fetched responses as JSON-encoded strings.
        Value::String(s) => {
            let t = s.trim_start();
            if (t.starts_with('{') || t.starts_with('[')) && t.contains("symbol") {
                if let Ok(inner) = serde_json::from_str::<Value>(t) {
                    return find_quotes(&inner);
                }
            }
        }
        _ => {}
    }
    Vec::new()
}

fn quote_to_record(q: &Value) -> Option<StockRecord> {
    let ticker = q.get("symbol")?.as_str()?.trim();
    if ticker.is_empty() {
        return None;
    }

    let price = number(q, "regularMarketPrice")
        .or_else(|| number(q, "currentPrice"))
        .unwrap_or(0.0);
    let week_52_low = number(q, "fiftyTwoWeekLow").unwrap_or(0.0);
    let week_52_high = number(q, "fiftyTwoWeekHigh").unwrap_or(0.0);
    let week_52_change_pct = if week_52_low > 0.0 {
        (price - week_52_low) / week_52_low * 100.0
    } else {
        0.0
    };

    let company_name = text(q, "shortName")
        .or_else(|| text(q, "longName"))
        .unwrap_or_else(|| ticker.to_string());

    let earnings_date = number(q, "earningsTimestamp")
        .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
        .map(|dt| dt.date_naive());

    Some(StockRecord {
        ticker: ticker.to_string(),
        company_name,
        price,
        change: number(q, "regularMarketChange").unwrap_or(0.0),
        change_percent: number(q, "regularMarketChangePercent").unwrap_or(0.0),
        volume: count(q, "regularMarketVolume"),
        avg_volume_3m: count(q, "averageDailyVolume3Month"),
        market_cap: number(q, "marketCap")
            .map(format_market_cap)
            .unwrap_or_default(),
        pe_ratio: number(q, "trailingPE").filter(|pe| *pe != 0.0),
        week_52_change_pct,
        week_52_low,
        week_52_high,
        earnings_date,
    })
}

/// Yahoo sends numerics either bare or as `{"raw": n, "fmt": "..."}`.
fn number(q: &Value, key: &str) -> Option<f64> {
    let v = q.get(key)?;
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::Object(o) => o.get("raw").and_then(Value::as_f64),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

fn count(q: &Value, key: &str) -> u64 {
    number(q, key)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0)
}

fn text(q: &Value, key: &str) -> Option<String> {
    q.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn format_market_cap(n: f64) -> String {
    if n >= 1e12 {
        format!("{:.3}T", n / 1e12)
    } else if n >= 1e9 {
        format!("{:.3}B", n / 1e9)
    } else {
        format!("{:.3}M", n / 1e6)
    }
}
