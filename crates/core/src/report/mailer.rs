use crate::report::dated_file_name;
use anyhow::Context;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Delivery of the run's summary text.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Drops the message into a dated text file next to the workbook for an external sender to pick up.
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    path: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl AsRef<Path>, report_date: NaiveDate) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(dated_file_name("email_summary", report_date, "txt")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Mailer for OutboxMailer {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create outbox dir {}", dir.display()))?;
        }
        let message = format!("Subject: {subject}\n\n{body}\n");
        tokio::fs::write(&self.path, message)
            .await
            .with_context(|| format!("failed to write outbox {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "summary written to outbox");
        Ok(())
    }
}
