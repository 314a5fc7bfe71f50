use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use charla_core::errors::ProviderError;
use charla_core::provider::{ChatProvider, GenerationConfig};
use charla_core::turns::Turn;

/// Pre-programmed responses for deterministic testing without API calls.
pub enum MockResponse {
    /// Return a text completion.
    Text(String),
    /// Return an error from the complete() call itself.
    Error(ProviderError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_owned())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence and
/// records every prompt it receives.
pub struct MockProvider {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<Vec<Turn>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<Vec<Turn>> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        prompt: &[Turn],
        _config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(prompt.to_vec());

        let mut current = self.responses.get(idx).ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "MockProvider: no response configured for call {idx}"
            ))
        })?;

        loop {
            match current {
                MockResponse::Text(text) => return Ok(text.clone()),
                MockResponse::Error(e) => return Err(e.clone()),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
            }
        }
    }
}
