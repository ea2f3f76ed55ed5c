//! Reducers over a finished run, consumed by the workbook and the summary text.

use crate::domain::recommendation::{
    Action, AnalysisResult, RecommendationResult, ResearchResult,
};
use crate::domain::stock::StockRecord;
use crate::pipeline::state::PipelineState;
use std::collections::HashMap;

pub const TOP_RECOMMENDED: usize = 3;

/// Highest `change_percent`; the earliest record wins ties. NaN values never win.
pub fn top_gainer(records: &[StockRecord]) -> Option<&StockRecord> {
    records
        .iter()
        .filter(|r| !r.change_percent.is_nan())
        .fold(None, |best, r| match best {
            Some(b) if b.change_percent >= r.change_percent => Some(b),
            _ => Some(r),
        })
}

/// Lowest `change_percent`; the earliest record wins ties.
pub fn top_loser(records: &[StockRecord]) -> Option<&StockRecord> {
    records
        .iter()
        .filter(|r| !r.change_percent.is_nan())
        .fold(None, |best, r| match best {
            Some(b) if b.change_percent <= r.change_percent => Some(b),
            _ => Some(r),
        })
}

/// Up to `n` recommendations: Buys by confidence descending, then Holds the same way if fewer
/// than `n` Buys exist. Sells never appear. Sorting is stable.
pub fn top_recommended(recs: &[RecommendationResult], n: usize) -> Vec<&RecommendationResult> {
    let mut picked = by_confidence(recs, Action::Buy);
    if picked.len() < n {
        picked.extend(by_confidence(recs, Action::Hold));
    }
    picked.truncate(n);
    picked
}

fn by_confidence(recs: &[RecommendationResult], action: Action) -> Vec<&RecommendationResult> {
    let mut out: Vec<_> = recs.iter().filter(|r| r.action == action).collect();
    out.sort_by(|a, b| (b.confidence + 0.0).total_cmp(&(a.confidence + 0.0)));
    out
}

/// Ticker-keyed view of the stage results. The first result recorded for a ticker wins.
#[derive(Debug, Default)]
pub struct TickerLookup<'a> {
    research: HashMap<&'a str, &'a ResearchResult>,
    analysis: HashMap<&'a str, &'a AnalysisResult>,
    recommendations: HashMap<&'a str, &'a RecommendationResult>,
}

impl<'a> TickerLookup<'a> {
    pub fn new(
        research: &'a [ResearchResult],
        analysis: &'a [AnalysisResult],
        recommendations: &'a [RecommendationResult],
    ) -> Self {
        let mut out = Self::default();
        for r in research {
            out.research.entry(r.ticker.as_str()).or_insert(r);
        }
        for a in analysis {
            out.analysis.entry(a.ticker.as_str()).or_insert(a);
        }
        for r in recommendations {
            out.recommendations.entry(r.ticker.as_str()).or_insert(r);
        }
        out
    }

    pub fn research(&self, ticker: &str) -> Option<&'a ResearchResult> {
        self.research.get(ticker).copied()
    }

    pub fn analysis(&self, ticker: &str) -> Option<&'a AnalysisResult> {
        self.analysis.get(ticker).copied()
    }

    pub fn recommendation(&self, ticker: &str) -> Option<&'a RecommendationResult> {
        self.recommendations.get(ticker).copied()
    }
}

/// Everything the formatters need, borrowed from a terminal state.
#[derive(Debug)]
pub struct RunAggregate<'a> {
    pub records: &'a [StockRecord],
    pub top_gainer: Option<&'a StockRecord>,
    pub top_loser: Option<&'a StockRecord>,
    pub top_recommended: Vec<&'a RecommendationResult>,
    pub lookup: TickerLookup<'a>,
}

impl<'a> RunAggregate<'a> {
    pub fn from_state(state: &'a PipelineState) -> Self {
        Self {
            records: &state.records,
            top_gainer: top_gainer(&state.records),
            top_loser: top_loser(&state.records),
            top_recommended: top_recommended(&state.recommendations, TOP_RECOMMENDED),
            lookup: TickerLookup::new(
                &state.research,
                &state.analysis,
                &state.recommendations,
            ),
        }
    }

    pub fn is_top_recommended(&self, ticker: &str) -> bool {
        self.top_recommended.iter().any(|r| r.ticker == ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::record;

    fn rec(ticker: &str, action: Action, confidence: f64) -> RecommendationResult {
        RecommendationResult {
            ticker: ticker.to_string(),
            action,
            reasoning: format!("{ticker} reasoning"),
            confidence,
        }
    }

    fn tickers(recs: &[&RecommendationResult]) -> Vec<String> {
        recs.iter().map(|r| r.ticker.clone()).collect()
    }

    #[test]
    fn gainer_and_loser_by_change_percent() {
        let records = vec![record("A", 5.0), record("B", -12.0), record("C", 18.0)];
        assert_eq!(top_gainer(&records).map(|r| r.ticker.as_str()), Some("C"));
        assert_eq!(top_loser(&records).map(|r| r.ticker.as_str()), Some("B"));
    }

    #[test]
    fn ties_go_to_the_first_record() {
        let records = vec![record("A", 3.0), record("B", 3.0), record("C", -3.0), record("D", -3.0)];
        assert_eq!(top_gainer(&records).map(|r| r.ticker.as_str()), Some("A"));
        assert_eq!(top_loser(&records).map(|r| r.ticker.as_str()), Some("C"));
    }

    #[test]
    fn empty_and_nan_inputs() {
        assert!(top_gainer(&[]).is_none());
        assert!(top_loser(&[]).is_none());

        let records = vec![record("N", f64::NAN), record("A", 1.0)];
        assert_eq!(top_gainer(&records).map(|r| r.ticker.as_str()), Some("A"));
        assert_eq!(top_loser(&records).map(|r| r.ticker.as_str()), Some("A"));
    }

    #[test]
    fn holds_fill_in_behind_buys() {
        let recs = vec![
            rec("A", Action::Buy, 0.80),
            rec("B", Action::Sell, 0.90),
            rec("C", Action::Buy, 0.95),
            rec("D", Action::Hold, 0.60),
        ];
        assert_eq!(tickers(&top_recommended(&recs, 3)), ["C", "A", "D"]);
    }

    #[test]
    fn three_buys_saturate() {
        let recs = vec![
            rec("X", Action::Buy, 0.70),
            rec("Y", Action::Buy, 0.85),
            rec("Z", Action::Buy, 0.92),
            rec("W", Action::Buy, 0.60),
            rec("H", Action::Hold, 0.99),
        ];
        assert_eq!(tickers(&top_recommended(&recs, 3)), ["Z", "Y", "X"]);
    }

    #[test]
    fn equal_confidence_keeps_input_order_and_sells_never_fill() {
        let recs = vec![
            rec("A", Action::Hold, 0.5),
            rec("B", Action::Hold, 0.5),
            rec("S", Action::Sell, 1.0),
        ];
        assert_eq!(tickers(&top_recommended(&recs, 3)), ["A", "B"]);
        assert!(top_recommended(&[], 3).is_empty());
    }

    #[test]
    fn signed_zero_confidences_tie() {
        let recs = vec![rec("FIRST", Action::Buy, -0.0), rec("SECOND", Action::Buy, 0.0)];
        assert_eq!(tickers(&top_recommended(&recs, 3)), ["FIRST", "SECOND"]);

        let stored = RecommendationResult::from_fields(
            &crate::llm::json::parse_object(r#"{"action": "BUY", "confidence": -0.0}"#),
            &crate::pipeline::testing::record("FIRST", 1.0),
        );
        assert!(stored.confidence.is_sign_positive());
    }

    #[test]
    fn lookup_keeps_first_and_tolerates_missing() {
        let recs = vec![rec("A", Action::Buy, 0.9), rec("A", Action::Sell, 0.1)];
        let lookup = TickerLookup::new(&[], &[], &recs);
        assert_eq!(lookup.recommendation("A").map(|r| r.action), Some(Action::Buy));
        assert!(lookup.recommendation("B").is_none());
        assert!(lookup.research("A").is_none());
        assert!(lookup.analysis("A").is_none());
    }

    #[test]
    fn aggregate_from_state() {
        let mut state = PipelineState::new(vec![record("A", 2.0), record("B", -1.0)]);
        state.recommendations = vec![rec("A", Action::Sell, 0.9), rec("B", Action::Buy, 0.4)];

        let agg = RunAggregate::from_state(&state);
        assert_eq!(agg.top_gainer.map(|r| r.ticker.as_str()), Some("A"));
        assert_eq!(agg.top_loser.map(|r| r.ticker.as_str()), Some("B"));
        assert!(agg.is_top_recommended("B"));
        assert!(!agg.is_top_recommended("A"));
        assert_eq!(agg.records.len(), 2);
    }
}
