use crate::domain::recommendation::ResearchResult;
use crate::domain::stock::StockRecord;
use crate::llm::json::parse_object;
use crate::llm::CompletionClient;
use crate::pipeline::stage::degrade_on_failure;
use crate::search::SearchClient;
use std::sync::Arc;
use std::time::Duration;

/// Searches the web for a stock's news and asks the model to summarize it.
#[derive(Clone)]
pub struct ResearchStage {
    search: Arc<dyn SearchClient>,
    llm: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl ResearchStage {
    pub fn new(
        search: Arc<dyn SearchClient>,
        llm: Arc<dyn CompletionClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            llm,
            timeout,
        }
    }

    pub async fn run(&self, record: &StockRecord) -> ResearchResult {
        let query = search_query(record);
        let raw = degrade_on_failure(
            "research.search",
            &record.ticker,
            self.timeout,
            self.search.search(&query),
        )
        .await;

        let prompt = research_prompt(record, &raw);
        let text = degrade_on_failure(
            "research",
            &record.ticker,
            self.timeout,
            self.llm.complete(&prompt),
        )
        .await;

        let result = ResearchResult::from_fields(&parse_object(&text), record, &raw);
        tracing::debug!(
            ticker = %record.ticker,
            search = self.search.name(),
            raw_len = raw.len(),
            key_events = result.key_events.len(),
            "research done"
        );
        result
    }
}

pub fn search_query(record: &StockRecord) -> String {
    format!("{} {} stock news today", record.ticker, record.company_name)
}

pub fn research_prompt(record: &StockRecord, raw_search: &str) -> String {
    format!(
        "You are a financial research assistant. Below are raw search results for {ticker} ({company}).\n\n\
         {raw_search}\n\n\
         Produce a JSON object with exactly these keys:\n  \
         \"ticker\": \"{ticker}\",\n  \
         \"news_summary\": \"<2-3 sentence summary>\",\n  \
         \"key_events\": [\"<event1>\", \"<event2>\", ...]\n\n\
         Return only the JSON object, no additional text.",
        ticker = record.ticker,
        company = record.company_name,
    )
}
