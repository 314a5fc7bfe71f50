use charla_core::errors::ProviderError;
use charla_store::StoreError;

/// Failure of one conversation turn. Everything a turn can fail on collapses
/// to these two at the orchestrator boundary; nothing below leaks past it.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_store_errors() {
        let e: TurnError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(e, TurnError::Storage(_)));
    }

    #[test]
    fn wraps_provider_errors() {
        let e: TurnError = ProviderError::EmptyCompletion.into();
        assert!(matches!(e, TurnError::Generation(_)));
    }
}
