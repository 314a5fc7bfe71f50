use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use charla_core::errors::ProviderError;
use charla_core::provider::{ChatProvider, GenerationConfig};
use charla_core::turns::Turn;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

// A stuck provider must never hold an inbound handler open-ended.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-completion provider for OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    api_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_api_url(api_key, API_URL)
    }

    /// Point at a different OpenAI-compatible endpoint (proxies, test servers).
    pub fn with_api_url(api_key: SecretString, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, prompt), fields(model = %config.model, turns = prompt.len()))]
    async fn complete(
        &self,
        prompt: &[Turn],
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let body = build_request_body(prompt, config);

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(REQUEST_TIMEOUT)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;
        parse_completion(&raw)
    }
}

/// Build the chat-completions request body. Turns serialize to exactly the
/// wire's `{"role", "content"}` message shape.
pub fn build_request_body(prompt: &[Turn], config: &GenerationConfig) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "temperature": config.temperature,
        "messages": prompt,
    })
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<serde_json::Value>,
}

/// Normalize a provider response to text. Anything without usable content is
/// an error, never a silently-empty reply.
pub fn parse_completion(raw: &str) -> Result<String, ProviderError> {
    let parsed: CompletionResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".into()))?
        .message
        .content
        .ok_or(ProviderError::EmptyCompletion)?;

    // Structured (multi-part) content shapes are stringified rather than
    // dropped.
    let text = match content {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyCompletion);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name() {
        let provider = OpenAiProvider::new(SecretString::from("test-key"));
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn request_body_shape() {
        let prompt = vec![
            Turn::system("Sos un asistente de ventas."),
            Turn::user("hola"),
        ];
        let config = GenerationConfig {
            model: "gpt-4o".into(),
            temperature: 0.2,
        };

        let body = build_request_body(&prompt, &config);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hola");
    }

    #[test]
    fn parse_completion_extracts_text() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"¡Hola! ¿En qué te puedo ayudar?"}}]}"#;
        let text = parse_completion(raw).unwrap();
        assert_eq!(text, "¡Hola! ¿En qué te puedo ayudar?");
    }

    #[test]
    fn parse_completion_rejects_empty_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#;
        assert!(matches!(
            parse_completion(raw),
            Err(ProviderError::EmptyCompletion)
        ));

        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#;
        assert!(matches!(
            parse_completion(raw),
            Err(ProviderError::EmptyCompletion)
        ));
    }

    #[test]
    fn parse_completion_rejects_null_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(
            parse_completion(raw),
            Err(ProviderError::EmptyCompletion)
        ));
    }

    #[test]
    fn parse_completion_rejects_missing_choices() {
        let raw = r#"{"choices":[]}"#;
        assert!(matches!(
            parse_completion(raw),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_completion_rejects_garbage() {
        assert!(matches!(
            parse_completion("not json"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_completion_stringifies_structured_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":[{"type":"text","text":"hola"}]}}]}"#;
        let text = parse_completion(raw).unwrap();
        assert!(text.contains("hola"));
    }

    #[test]
    fn request_timeout_constant() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(10));
    }
}
