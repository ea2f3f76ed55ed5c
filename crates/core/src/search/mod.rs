pub mod serper;

/// Web search returning free text. Callers treat an error the same as an empty result.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> anyhow::Result<String>;
}
