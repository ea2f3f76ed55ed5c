use crate::domain::stock::StockRecord;
use crate::pipeline::aggregate::{RunAggregate, TickerLookup};
use crate::report::report_title;
use chrono::NaiveDate;
use std::path::Path;

const NO_STOCKS: &str = "  (no stocks processed)";

/// Plain-text digest of a finished run.
pub fn compose_summary(
    report_date: NaiveDate,
    aggregate: &RunAggregate<'_>,
    report_path: Option<&Path>,
) -> String {
    let mut lines = vec![report_title(report_date), "=".repeat(55), String::new()];

    section(&mut lines, "TOP GAINER");
    mover_lines(&mut lines, aggregate.top_gainer, &aggregate.lookup);
    lines.push(String::new());

    section(&mut lines, "TOP LOSER");
    mover_lines(&mut lines, aggregate.top_loser, &aggregate.lookup);
    lines.push(String::new());

    section(&mut lines, "TOP 3 RECOMMENDATIONS");
    if aggregate.records.is_empty() {
        lines.push(NO_STOCKS.to_string());
    } else if aggregate.top_recommended.is_empty() {
        lines.push("  (no Buy or Hold recommendations)".to_string());
    }
    for (i, rec) in aggregate.top_recommended.iter().enumerate() {
        lines.push(format!(
            "  {}. {} - {} (confidence: {:.0}%)",
            i + 1,
            rec.ticker,
            rec.action,
            rec.confidence * 100.0
        ));
        lines.push(format!("     {}", rec.reasoning));
    }
    lines.push(String::new());

    lines.push("-".repeat(55));
    let location = report_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "report not generated".to_string());
    lines.push(format!("Full details in: {location}"));

    lines.join("\n")
}

fn section(lines: &mut Vec<String>, heading: &str) {
    lines.push(heading.to_string());
    lines.push("-".repeat(30));
}

fn mover_lines(lines: &mut Vec<String>, stock: Option<&StockRecord>, lookup: &TickerLookup<'_>) {
    let Some(stock) = stock else {
        lines.push(NO_STOCKS.to_string());
        return;
    };
    let action = lookup
        .recommendation(&stock.ticker)
        .map(|r| r.action.as_str())
        .unwrap_or("-");
    lines.push(format!("  {} ({})", stock.ticker, stock.company_name));
    lines.push(format!(
        "  Price: ${:.2}  |  Change: {:+.2}%",
        stock.price, stock.change_percent
    ));
    lines.push(format!("  Recommendation: {action}"));
}
