use anyhow::Context;
use movers_core::domain::stock::{with_thousands, StockRecord};
use movers_core::ingest::provider::{write_universe_file, UniverseProvider};
use std::path::Path;

/// Fetches the universe and saves it as an input file for a later `--input` run.
pub async fn scrape_to_file(
    provider: &dyn UniverseProvider,
    path: &Path,
) -> anyhow::Result<Vec<StockRecord>> {
    let stocks = provider
        .fetch_universe()
        .await
        .with_context(|| format!("{} fetch failed", provider.provider_name()))?;
    anyhow::ensure!(
        !stocks.is_empty(),
        "no stocks scraped from {}",
        provider.provider_name()
    );

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    write_universe_file(path, &stocks).await?;
    Ok(stocks)
}

pub fn describe(stock: &StockRecord) -> String {
    format!(
        "{:<6} {:<28} ${:>9.2} {:>+7.2}%  vol {}",
        stock.ticker,
        stock.company_name,
        stock.price,
        stock.change_percent,
        with_thousands(stock.volume)
    )
}
