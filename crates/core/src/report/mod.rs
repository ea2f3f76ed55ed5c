pub mod mailer;
pub mod summary;
pub mod xlsx;

use crate::pipeline::aggregate::RunAggregate;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Persists the run's workbook and returns where it landed.
#[async_trait::async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(
        &self,
        report_date: NaiveDate,
        aggregate: &RunAggregate<'_>,
    ) -> anyhow::Result<PathBuf>;
}

pub fn report_title(report_date: NaiveDate) -> String {
    format!("Daily Movers Report - {}", report_date.format("%B %d, %Y"))
}

pub(crate) fn dated_file_name(prefix: &str, report_date: NaiveDate, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", report_date.format("%Y%m%d"))
}
