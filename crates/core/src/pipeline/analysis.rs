use crate::domain::recommendation::{AnalysisResult, ResearchResult};
use crate::domain::stock::{with_thousands, StockRecord};
use crate::llm::json::parse_object;
use crate::llm::CompletionClient;
use crate::pipeline::stage::degrade_on_failure;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AnalysisStage {
    llm: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl AnalysisStage {
    pub fn new(llm: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn run(&self, record: &StockRecord, research: &ResearchResult) -> AnalysisResult {
        let prompt = analysis_prompt(record, research);
        let text = degrade_on_failure(
            "analysis",
            &record.ticker,
            self.timeout,
            self.llm.complete(&prompt),
        )
        .await;

        let result = AnalysisResult::from_fields(&parse_object(&text), record);
        tracing::debug!(ticker = %record.ticker, sentiment = %result.sentiment, "analysis done");
        result
    }
}

/// Price, volume, and valuation lines shared by the analysis and recommendation prompts.
pub(crate) fn market_lines(record: &StockRecord) -> [String; 4] {
    [
        format!(
            "Price: ${:.2}  |  Change: ${:+.2} ({:+.2}%)",
            record.price, record.change, record.change_percent
        ),
        format!(
            "Volume: {}  |  Avg Vol (3M): {}",
            with_thousands(record.volume),
            with_thousands(record.avg_volume_3m)
        ),
        format!(
            "Market Cap: {}  |  P/E (TTM): {}",
            record.market_cap_display(),
            record.pe_display()
        ),
        format!(
            "52-Week Range: ${:.2} - ${:.2}  |  52W Chg: {:+.2}%",
            record.week_52_low, record.week_52_high, record.week_52_change_pct
        ),
    ]
}

pub fn analysis_prompt(record: &StockRecord, research: &ResearchResult) -> String {
    let key_events = if research.key_events.is_empty() {
        "none reported".to_string()
    } else {
        research.key_events.join("; ")
    };

    format!(
        "You are a financial analyst. Analyse the following data for {ticker} ({company}).\n\n\
         {market}\n\n\
         News summary: {summary}\n\
         Key events: {key_events}\n\n\
         Produce a JSON object with exactly these keys:\n  \
         \"ticker\": \"{ticker}\",\n  \
         \"technical_analysis\": \"<2-3 sentences on price action, volume, momentum, and valuation>\",\n  \
         \"sentiment\": \"<one of: positive, negative, neutral>\"\n\n\
         Return only the JSON object, no additional text.",
        ticker = record.ticker,
        company = record.company_name,
        market = market_lines(record).join("\n"),
        summary = research.news_summary,
    )
}
