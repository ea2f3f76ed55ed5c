use crate::domain::stock::StockRecord;
use serde::{Deserialize, Serialize};

/// On-disk universe: the input accepted by `--input` and written by `--scrape-to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseFile {
    #[serde(default)]
    pub stocks: Vec<StockRecord>,
}
