//! Knowledge payloads ground replies in tenant facts: a local document or a
//! remote endpoint, flattened to a plain text blob per turn. Knowledge is
//! best-effort everywhere — a failed fetch degrades to persona-only context,
//! it never fails the turn.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a tenant's knowledge comes from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KnowledgeSpec {
    #[default]
    None,
    File {
        path: PathBuf,
    },
    Url {
        url: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("knowledge file unavailable: {0}")]
    File(String),

    #[error("knowledge endpoint unavailable: {0}")]
    Fetch(String),
}

pub struct KnowledgeSource {
    client: reqwest::Client,
}

impl Default for KnowledgeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Produce the knowledge text for a spec, or empty on any failure.
    pub async fn fetch_or_empty(&self, spec: &KnowledgeSpec) -> String {
        match self.fetch(spec).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "knowledge unavailable, continuing persona-only");
                String::new()
            }
        }
    }

    async fn fetch(&self, spec: &KnowledgeSpec) -> Result<String, KnowledgeError> {
        match spec {
            KnowledgeSpec::None => Ok(String::new()),
            KnowledgeSpec::File { path } => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| KnowledgeError::File(format!("{}: {e}", path.display())))?;
                Ok(normalize(&raw))
            }
            KnowledgeSpec::Url { url } => {
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| KnowledgeError::Fetch(e.to_string()))?
                    .error_for_status()
                    .map_err(|e| KnowledgeError::Fetch(e.to_string()))?;
                let raw = resp
                    .text()
                    .await
                    .map_err(|e| KnowledgeError::Fetch(e.to_string()))?;
                Ok(normalize(&raw))
            }
        }
    }
}

/// JSON payloads are flattened to the newline-joined text of every scalar
/// leaf; anything else is used verbatim.
fn normalize(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => {
            let mut texts = Vec::new();
            flatten_json(&value, &mut texts);
            texts.join("\n")
        }
        Err(_) => raw.trim().to_owned(),
    }
}

fn flatten_json(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                // Keys carry labeling context for the model.
                if !key.trim().is_empty() {
                    out.push(key.clone());
                }
                flatten_json(inner, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_json(item, out);
            }
        }
        Value::String(s) => {
            if !s.trim().is_empty() {
                out.push(s.clone());
            }
        }
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Null => {}
    }
}
