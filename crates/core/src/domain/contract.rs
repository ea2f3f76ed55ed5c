//! Field-level defaulting from parsed model output into the typed stage results.
//!
//! Every constructor here is total: a missing, blank, or mistyped field takes its documented
//! default, so a malformed response degrades one stock's result without failing the run.

use crate::domain::recommendation::{
    Action, AnalysisResult, RecommendationResult, ResearchResult, Sentiment,
};
use crate::domain::stock::StockRecord;
use serde_json::{Map, Value};

pub type Fields = Map<String, Value>;

pub const NEWS_SUMMARY_FALLBACK_CHARS: usize = 500;
pub const ANALYSIS_PLACEHOLDER: &str = "Analysis unavailable.";
pub const REASONING_PLACEHOLDER: &str = "Insufficient data for a recommendation.";
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

impl ResearchResult {
    pub fn from_fields(fields: &Fields, record: &StockRecord, raw_search: &str) -> Self {
        Self {
            ticker: ticker_or(fields, record),
            news_summary: text_field(fields, "news_summary").unwrap_or_else(|| {
                raw_search
                    .chars()
                    .take(NEWS_SUMMARY_FALLBACK_CHARS)
                    .collect()
            }),
            key_events: string_list(fields, "key_events"),
        }
    }
}

impl AnalysisResult {
    pub fn from_fields(fields: &Fields, record: &StockRecord) -> Self {
        let sentiment = match text_field(fields, "sentiment") {
            Some(raw) => Sentiment::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    ticker = %record.ticker,
                    value = %raw,
                    "sentiment outside {{positive, negative, neutral}}; using neutral"
                );
                Sentiment::default()
            }),
            None => Sentiment::default(),
        };

        Self {
            ticker: ticker_or(fields, record),
            technical_analysis: text_field(fields, "technical_analysis")
                .unwrap_or_else(|| ANALYSIS_PLACEHOLDER.to_string()),
            sentiment,
        }
    }
}

impl RecommendationResult {
    pub fn from_fields(fields: &Fields, record: &StockRecord) -> Self {
        let action = match text_field(fields, "action") {
            Some(raw) => Action::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    ticker = %record.ticker,
                    value = %raw,
                    "action outside {{Buy, Hold, Sell}}; using Hold"
                );
                Action::default()
            }),
            None => Action::default(),
        };

        Self {
            ticker: ticker_or(fields, record),
            action,
            reasoning: text_field(fields, "reasoning")
                .unwrap_or_else(|| REASONING_PLACEHOLDER.to_string()),
            confidence: coerce_confidence(fields.get("confidence")),
        }
    }
}

/// Numeric coercion followed by a clamp to `[0, 1]`. Anything non-numeric yields 0.5.
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match n {
        // Adding +0.0 folds -0.0 into 0.0 so equal confidences compare equal.
        Some(x) if !x.is_nan() => x.clamp(0.0, 1.0) + 0.0,
        _ => DEFAULT_CONFIDENCE,
    }
}

fn ticker_or(fields: &Fields, record: &StockRecord) -> String {
    text_field(fields, "ticker").unwrap_or_else(|| record.ticker.clone())
}

fn text_field(fields: &Fields, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(fields: &Fields, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = fields.get(key) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> StockRecord {
        StockRecord {
            ticker: "NVDA".to_string(),
            company_name: "NVIDIA Corporation".to_string(),
            price: 120.0,
            change: 3.0,
            change_percent: 2.56,
            volume: 1_000,
            avg_volume_3m: 900,
            market_cap: "2.950T".to_string(),
            pe_ratio: None,
            week_52_change_pct: 0.0,
            week_52_low: 0.0,
            week_52_high: 0.0,
            earnings_date: None,
        }
    }

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn research_defaults_on_empty_fields() {
        let raw = "x".repeat(800);
        let r = ResearchResult::from_fields(&Fields::new(), &record(), &raw);
        assert_eq!(r.ticker, "NVDA");
        assert_eq!(r.news_summary.len(), NEWS_SUMMARY_FALLBACK_CHARS);
        assert!(r.key_events.is_empty());
    }

    #[test]
    fn research_fallback_summary_counts_chars_not_bytes() {
        let raw = "é".repeat(600);
        let r = ResearchResult::from_fields(&Fields::new(), &record(), &raw);
        assert_eq!(r.news_summary.chars().count(), NEWS_SUMMARY_FALLBACK_CHARS);
    }

    #[test]
    fn research_keeps_model_fields() {
        let f = fields(json!({
            "ticker": "NVDA",
            "news_summary": "Chip demand stays strong.",
            "key_events": ["Earnings beat", 42, "  ", "New GPU launch"],
        }));
        let r = ResearchResult::from_fields(&f, &record(), "raw");
        assert_eq!(r.news_summary, "Chip demand stays strong.");
        assert_eq!(r.key_events, vec!["Earnings beat", "New GPU launch"]);
    }

    #[test]
    fn model_ticker_overrides_and_blank_ticker_defaults() {
        let f = fields(json!({"ticker": "AMD"}));
        assert_eq!(AnalysisResult::from_fields(&f, &record()).ticker, "AMD");

        let f = fields(json!({"ticker": "  "}));
        assert_eq!(AnalysisResult::from_fields(&f, &record()).ticker, "NVDA");

        let f = fields(json!({"ticker": 7}));
        assert_eq!(AnalysisResult::from_fields(&f, &record()).ticker, "NVDA");
    }

    #[test]
    fn analysis_defaults_and_rejects_out_of_set_sentiment() {
        let a = AnalysisResult::from_fields(&Fields::new(), &record());
        assert_eq!(a.technical_analysis, ANALYSIS_PLACEHOLDER);
        assert_eq!(a.sentiment, Sentiment::Neutral);

        let f = fields(json!({"sentiment": "mixed"}));
        assert_eq!(AnalysisResult::from_fields(&f, &record()).sentiment, Sentiment::Neutral);

        let f = fields(json!({"sentiment": "Positive"}));
        assert_eq!(AnalysisResult::from_fields(&f, &record()).sentiment, Sentiment::Positive);
    }

    #[test]
    fn recommendation_defaults() {
        let r = RecommendationResult::from_fields(&Fields::new(), &record());
        assert_eq!(r.ticker, "NVDA");
        assert_eq!(r.action, Action::Hold);
        assert_eq!(r.reasoning, REASONING_PLACEHOLDER);
        assert_eq!(r.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn recommendation_normalizes_action() {
        let f = fields(json!({"action": "buy", "confidence": 0.8}));
        let r = RecommendationResult::from_fields(&f, &record());
        assert_eq!(r.action, Action::Buy);
        assert_eq!(r.confidence, 0.8);

        let f = fields(json!({"action": "Strong Buy"}));
        assert_eq!(RecommendationResult::from_fields(&f, &record()).action, Action::Hold);
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        for (input, expected) in [
            (json!(1.7), 1.0),
            (json!(-0.3), 0.0),
            (json!(0.0), 0.0),
            (json!(1), 1.0),
            (json!(0.42), 0.42),
            (json!("0.75"), 0.75),
            (json!(" 3 "), 1.0),
            (json!("inf"), 1.0),
        ] {
            assert_eq!(coerce_confidence(Some(&input)), expected, "input={input}");
        }
    }

    #[test]
    fn negative_zero_confidence_is_stored_as_zero() {
        let c = coerce_confidence(Some(&json!(-0.0)));
        assert_eq!(c.to_bits(), 0.0_f64.to_bits());
        let c = coerce_confidence(Some(&json!("-0")));
        assert!(c.is_sign_positive());
    }

    #[test]
    fn non_numeric_confidence_falls_back() {
        for input in [
            json!("high"),
            json!(null),
            json!(true),
            json!([0.9]),
            json!({"value": 0.9}),
            json!("NaN"),
        ] {
            assert_eq!(coerce_confidence(Some(&input)), DEFAULT_CONFIDENCE, "input={input}");
        }
        assert_eq!(coerce_confidence(None), DEFAULT_CONFIDENCE);
    }
}
