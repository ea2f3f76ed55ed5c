use crate::llm::error::LlmDiagnosticsError;
use std::future::Future;
use std::time::Duration;

/// Awaits one collaborator call under `limit`. Errors and timeouts are logged and become empty
/// text, which the stage then parses into its documented defaults.
pub(crate) async fn degrade_on_failure<F>(
    stage: &'static str,
    ticker: &str,
    limit: Duration,
    call: F,
) -> String
where
    F: Future<Output = anyhow::Result<String>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            let raw_excerpt = err
                .downcast_ref::<LlmDiagnosticsError>()
                .and_then(LlmDiagnosticsError::raw_excerpt);
            tracing::warn!(
                stage,
                ticker,
                error = %format!("{err:#}"),
                raw_excerpt = raw_excerpt.as_deref().unwrap_or(""),
                "collaborator call failed; using defaults"
            );
            String::new()
        }
        Err(_) => {
            tracing::warn!(
                stage,
                ticker,
                timeout_secs = limit.as_secs(),
                "collaborator call timed out; using defaults"
            );
            String::new()
        }
    }
}
