use crate::domain::recommendation::{AnalysisResult, RecommendationResult};
use crate::domain::stock::StockRecord;
use crate::llm::json::parse_object;
use crate::llm::CompletionClient;
use crate::pipeline::analysis::market_lines;
use crate::pipeline::stage::degrade_on_failure;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RecommendationStage {
    llm: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl RecommendationStage {
    pub fn new(llm: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn run(
        &self,
        record: &StockRecord,
        analysis: &AnalysisResult,
    ) -> RecommendationResult {
        let prompt = recommendation_prompt(record, analysis);
        let text = degrade_on_failure(
            "recommendation",
            &record.ticker,
            self.timeout,
            self.llm.complete(&prompt),
        )
        .await;

        let result = RecommendationResult::from_fields(&parse_object(&text), record);
        tracing::debug!(
            ticker = %record.ticker,
            action = %result.action,
            confidence = result.confidence,
            "recommendation done"
        );
        result
    }
}

pub fn recommendation_prompt(record: &StockRecord, analysis: &AnalysisResult) -> String {
    let [price, volume, valuation, range] = market_lines(record);
    format!(
        "You are a senior investment strategist. Based on the following analysis for {ticker} ({company}) make a recommendation.\n\n\
         {price}\n{valuation}\n{range}\n{volume}\n\n\
         Technical analysis: {technical}\n\
         Sentiment: {sentiment}\n\n\
         Produce a JSON object with exactly these keys:\n  \
         \"ticker\": \"{ticker}\",\n  \
         \"action\": \"<one of: Buy, Hold, Sell>\",\n  \
         \"reasoning\": \"<2-3 sentences justifying the recommendation, referencing valuation and momentum>\",\n  \
         \"confidence\": <float between 0.0 and 1.0>\n\n\
         Return only the JSON object, no additional text.",
        ticker = record.ticker,
        company = record.company_name,
        technical = analysis.technical_analysis,
        sentiment = analysis.sentiment,
    )
}
