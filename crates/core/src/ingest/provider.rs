use crate::domain::stock::StockRecord;
use crate::ingest::types::UniverseFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Source of the ordered stock universe for one run. Zero records is a valid answer.
#[async_trait::async_trait]
pub trait UniverseProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_universe(&self) -> Result<Vec<StockRecord>>;
}

#[derive(Debug, Clone)]
pub struct FileUniverse {
    path: PathBuf,
}

impl FileUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl UniverseProvider for FileUniverse {
    fn provider_name(&self) -> &'static str {
        "file"
    }

    async fn fetch_universe(&self) -> Result<Vec<StockRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read universe file {}", self.path.display()))?;
        let parsed = serde_json::from_str::<UniverseFile>(&text)
            .with_context(|| format!("universe file {} is not valid", self.path.display()))?;

        for stock in &parsed.stocks {
            validate_record(stock)?;
        }
        Ok(parsed.stocks)
    }
}

pub async fn write_universe_file(path: &Path, stocks: &[StockRecord]) -> Result<()> {
    let payload = UniverseFile {
        stocks: stocks.to_vec(),
    };
    let text = serde_json::to_string_pretty(&payload).context("serialize universe failed")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("failed to write universe file {}", path.display()))
}

fn validate_record(stock: &StockRecord) -> Result<()> {
    anyhow::ensure!(!stock.ticker.trim().is_empty(), "ticker must be non-empty");
    anyhow::ensure!(
        !stock.company_name.trim().is_empty(),
        "company_name must be non-empty (ticker={})",
        stock.ticker
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reads_stocks_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let v = json!({
            "stocks": [
                {"ticker": "B", "company_name": "Bee", "price": 1.0, "change": 0.1, "change_percent": 10.0, "volume": 5},
                {"ticker": "A", "company_name": "Ay", "price": 2.0, "change": -0.1, "change_percent": -5.0, "volume": 7, "pe_ratio": 12.5},
            ]
        });
        std::fs::write(&path, v.to_string()).unwrap();

        let stocks = FileUniverse::new(&path).fetch_universe().await.unwrap();
        let tickers: Vec<_> = stocks.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, ["B", "A"]);
        assert_eq!(stocks[1].pe_ratio, Some(12.5));
    }

    #[tokio::test]
    async fn empty_stock_list_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, "{}").unwrap();

        let stocks = FileUniverse::new(&path).fetch_universe().await.unwrap();
        assert!(stocks.is_empty());
    }

    #[tokio::test]
    async fn rejects_blank_ticker_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let v = json!({
            "stocks": [
                {"ticker": " ", "company_name": "X", "price": 1.0, "change": 0.0, "change_percent": 0.0, "volume": 0},
            ]
        });
        std::fs::write(&path, v.to_string()).unwrap();
        assert!(FileUniverse::new(&path).fetch_universe().await.is_err());

        let missing = dir.path().join("nope.json");
        assert!(FileUniverse::new(missing).fetch_universe().await.is_err());
    }

    #[tokio::test]
    async fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let stock: StockRecord = serde_json::from_value(json!({
            "ticker": "F", "company_name": "Ford", "price": 11.2, "change": 0.3,
            "change_percent": 2.75, "volume": 90_000_000u64, "market_cap": "44.100B",
        }))
        .unwrap();

        write_universe_file(&path, std::slice::from_ref(&stock))
            .await
            .unwrap();
        let back = FileUniverse::new(&path).fetch_universe().await.unwrap();
        assert_eq!(back, vec![stock]);
    }
}
