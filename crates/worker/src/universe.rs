use movers_core::config::env_parse;
use movers_core::ingest::provider::{FileUniverse, UniverseProvider};
use movers_core::ingest::yahoo::YahooMostActive;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_MAX_STOCKS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseOptions {
    /// Cap on scraped stocks.
    pub max_stocks: usize,

    /// Read this JSON file instead of scraping.
    pub input: Option<PathBuf>,
}

impl Default for UniverseOptions {
    fn default() -> Self {
        Self {
            max_stocks: DEFAULT_MAX_STOCKS,
            input: None,
        }
    }
}

impl UniverseOptions {
    pub fn from_env() -> Self {
        Self {
            max_stocks: env_parse("UNIVERSE_MAX_STOCKS", DEFAULT_MAX_STOCKS),
            input: None,
        }
    }

    pub fn with_input(mut self, input: Option<PathBuf>) -> Self {
        if input.is_some() {
            self.input = input;
        }
        self
    }
}

pub fn build_universe_provider(
    opts: &UniverseOptions,
) -> anyhow::Result<Arc<dyn UniverseProvider>> {
    if let Some(path) = &opts.input {
        return Ok(Arc::new(FileUniverse::new(path)));
    }

    anyhow::ensure!(
        (1..=250).contains(&opts.max_stocks),
        "UNIVERSE_MAX_STOCKS must be 1..=250 (got {})",
        opts.max_stocks
    );
    Ok(Arc::new(
        YahooMostActive::from_env()?.with_max_stocks(opts.max_stocks),
    ))
}
