use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::turns::Turn;

/// Sampling configuration for one tenant's generation calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_owned(),
            temperature: 0.2,
        }
    }
}

/// Trait implemented by each generation provider.
///
/// `complete` is a single synchronous call: the full assembled prompt goes in,
/// one normalized text completion comes out. Anything else — network failure,
/// malformed body, empty content — is a `ProviderError`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &[Turn],
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_config_defaults() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.model, "gpt-4o");
        assert!((cfg.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn generation_config_serde_roundtrip() {
        let cfg = GenerationConfig {
            model: "gpt-3.5-turbo-1106".into(),
            temperature: 0.7,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: GenerationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, cfg.model);
        assert!((parsed.temperature - cfg.temperature).abs() < f64::EPSILON);
    }
}
