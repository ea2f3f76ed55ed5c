use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One ticker's market data for a run. Produced once by the universe provider and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub ticker: String,
    pub company_name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    #[serde(default)]
    pub avg_volume_3m: u64,
    #[serde(default)]
    pub market_cap: String,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub week_52_change_pct: f64,
    #[serde(default)]
    pub week_52_low: f64,
    #[serde(default)]
    pub week_52_high: f64,
    #[serde(default)]
    pub earnings_date: Option<NaiveDate>,
}

impl StockRecord {
    pub fn pe_display(&self) -> String {
        match self.pe_ratio {
            Some(pe) => format!("{pe:.2}"),
            None => "N/A".to_string(),
        }
    }

    pub fn market_cap_display(&self) -> &str {
        if self.market_cap.trim().is_empty() {
            "N/A"
        } else {
            &self.market_cap
        }
    }
}

/// Formats an integer with `,` thousands separators.
pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
