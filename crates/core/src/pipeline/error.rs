use std::fmt;

/// Run-level failures. Everything per-stock degrades to defaults instead.
#[derive(Debug)]
pub enum PipelineError {
    UniverseUnavailable {
        provider: &'static str,
        detail: String,
    },
    EmptyUniverse {
        provider: &'static str,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UniverseUnavailable { provider, detail } => {
                write!(f, "stock universe unavailable from {provider}: {detail}")
            }
            PipelineError::EmptyUniverse { provider } => {
                write!(f, "stock universe from {provider} contained no records")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_provider() {
        let err = PipelineError::UniverseUnavailable {
            provider: "yahoo_most_active",
            detail: "HTTP 503".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stock universe unavailable from yahoo_most_active: HTTP 503"
        );

        let err = anyhow::Error::new(PipelineError::EmptyUniverse { provider: "file" });
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyUniverse { provider: "file" })
        ));
    }
}
