//! Tenant configuration registry.
//!
//! One deployment serves several personas (per WhatsApp number, plus the web
//! widget). Each tenant is a plain configuration entry resolved once at
//! request entry; unknown keys fall back to the default tenant.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use charla_core::provider::GenerationConfig;

use crate::context::DEFAULT_HISTORY_WINDOW;
use crate::knowledge::KnowledgeSpec;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantConfig {
    /// System persona instruction sent at the head of every prompt.
    pub persona: String,
    /// Seed system turn written when a session is first created.
    pub greeting: String,
    #[serde(default)]
    pub knowledge: KnowledgeSpec,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default = "default_window")]
    pub history_window: usize,
}

fn default_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            persona: "Sos un asistente virtual amigable de atención al cliente. \
                      Respondés de manera clara, breve y cálida, siempre yendo al grano."
                .to_owned(),
            greeting: "¡Hola! Soy el asistente virtual, estoy para ayudarte.".to_owned(),
            knowledge: KnowledgeSpec::None,
            generation: GenerationConfig::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot read registry file: {0}")]
    Io(String),

    #[error("cannot parse registry file: {0}")]
    Parse(String),
}

/// On-disk shape of the registry config file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    default: Option<TenantConfig>,
    #[serde(default)]
    tenants: HashMap<String, TenantConfig>,
}

pub struct TenantRegistry {
    default: Arc<TenantConfig>,
    tenants: HashMap<String, Arc<TenantConfig>>,
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self {
            default: Arc::new(TenantConfig::default()),
            tenants: HashMap::new(),
        }
    }
}

impl TenantRegistry {
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| RegistryError::Io(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_json::from_str(raw).map_err(|e| RegistryError::Parse(e.to_string()))?;

        Ok(Self {
            default: Arc::new(file.default.unwrap_or_default()),
            tenants: file
                .tenants
                .into_iter()
                .map(|(key, cfg)| (key, Arc::new(cfg)))
                .collect(),
        })
    }

    /// Resolve a tenant key, falling back to the default tenant.
    pub fn resolve(&self, key: &str) -> Arc<TenantConfig> {
        self.tenants
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "default": {
            "persona": "Sos un asistente general.",
            "greeting": "¡Hola!"
        },
        "tenants": {
            "5491166129990": {
                "persona": "Sos Agustín, agente de ventas de Jelko.",
                "greeting": "¡Hola! Soy Agustín, estoy aquí para ayudarte con Jelko.",
                "knowledge": {"source": "file", "path": "contexts/jelko.json"},
                "generation": {"model": "gpt-4o", "temperature": 0.2},
                "history_window": 5
            },
            "web": {
                "persona": "Sos un asistente que sabe de muchos temas.",
                "greeting": "¡Hola!",
                "generation": {"model": "gpt-3.5-turbo-1106", "temperature": 0.2}
            }
        }
    }"#;

    #[test]
    fn resolves_known_tenant() {
        let registry = TenantRegistry::from_json_str(SAMPLE).unwrap();
        let tenant = registry.resolve("5491166129990");
        assert!(tenant.persona.contains("Agustín"));
        assert_eq!(tenant.generation.model, "gpt-4o");
        assert!(matches!(tenant.knowledge, KnowledgeSpec::File { .. }));
    }

    #[test]
    fn unknown_key_falls_back_to_default() {
        let registry = TenantRegistry::from_json_str(SAMPLE).unwrap();
        let tenant = registry.resolve("0000000000");
        assert_eq!(tenant.persona, "Sos un asistente general.");
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let registry = TenantRegistry::from_json_str(SAMPLE).unwrap();
        let tenant = registry.resolve("web");
        assert!(matches!(tenant.knowledge, KnowledgeSpec::None));
        assert_eq!(tenant.history_window, DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let registry = TenantRegistry::from_json_str("{}").unwrap();
        assert_eq!(registry.tenant_count(), 0);
        let tenant = registry.resolve("anything");
        assert_eq!(tenant.history_window, DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        assert!(matches!(
            TenantRegistry::from_json_str("{nope"),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reads_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenants.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let registry = TenantRegistry::from_file(&path).unwrap();
        assert_eq!(registry.tenant_count(), 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            TenantRegistry::from_file(Path::new("/nonexistent/tenants.json")),
            Err(RegistryError::Io(_))
        ));
    }
}
