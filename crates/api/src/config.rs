use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use diagnosis::DiagnosisSettings;
use index::{RetrievalSettings, RetrySettings};
use interactions::InteractionSettings;
use query::SearchSettings;

use crate::cache::Operation;

/// Every tunable of the service, resolved once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub mode: OperationMode,
    pub search: SearchSettings,
    pub diagnosis: DiagnosisSettings,
    pub interactions: InteractionSettings,
    pub retrieval: RetrievalSettings,
    pub cache: CacheConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,     // Cache aggressively, short timeouts
    Accurate, // Always fresh, patient retries
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Bound of the in-process store
    pub max_entries: usize,
    pub timeout_ms: u64,
    pub search_ttl_secs: u64,
    pub diagnosis_ttl_secs: u64,
    pub interactions_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            timeout_ms: 200,
            search_ttl_secs: 300,
            diagnosis_ttl_secs: 3_600,
            interactions_ttl_secs: 3_600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self, operation: Operation) -> Duration {
        Duration::from_secs(match operation {
            Operation::Search => self.search_ttl_secs,
            Operation::Diagnosis => self.diagnosis_ttl_secs,
            Operation::Interactions => self.interactions_ttl_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where the retrieval backend and catalogues live. Without a Qdrant URL the
/// service searches catalogue documents in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub qdrant_url: Option<String>,
    pub ollama_url: String,
    pub embedding_model: String,
    pub collection: String,
    pub catalogue_dir: Option<PathBuf>,
    pub bind_addr: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            qdrant_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            collection: "medical_knowledge".to_string(),
            catalogue_dir: None,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn fast_mode() -> Self {
        let mut config = Self {
            mode: OperationMode::Fast,
            ..Default::default()
        };
        config.retrieval = RetrievalSettings {
            timeout_ms: 800,
            retry: RetrySettings {
                max_retries: 0,
                initial_backoff_ms: 25,
                max_backoff_ms: 100,
            },
        };
        config.interactions.max_parallel = 8;
        config.cache.max_entries = 50_000;
        config.cache.search_ttl_secs = 1_800;
        config.cache.diagnosis_ttl_secs = 7_200;
        config.cache.interactions_ttl_secs = 7_200;
        config
    }

    pub fn accurate_mode() -> Self {
        let mut config = Self {
            mode: OperationMode::Accurate,
            ..Default::default()
        };
        config.retrieval = RetrievalSettings {
            timeout_ms: 5_000,
            retry: RetrySettings {
                max_retries: 3,
                initial_backoff_ms: 200,
                max_backoff_ms: 2_000,
            },
        };
        config.interactions.max_parallel = 2;
        config.diagnosis.semantic_limit = 20;
        config.cache.enabled = false;
        config.cache.max_entries = 0;
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// `MEDKB_CONFIG` file (or defaults), then backend overrides from the environment
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("MEDKB_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.backend.qdrant_url = Some(url);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.backend.ollama_url = url;
        }
        if let Ok(dir) = std::env::var("MEDKB_CATALOGUE_DIR") {
            config.backend.catalogue_dir = Some(PathBuf::from(dir));
        }
        if let Ok(addr) = std::env::var("MEDKB_BIND_ADDR") {
            config.backend.bind_addr = addr;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mode": "fast", "cache": {"interactions_ttl_secs": 60}, "search": {"limit": 5}}"#,
        )
        .unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.search.threshold, 0.2);
        assert_eq!(config.cache.ttl(Operation::Interactions), Duration::from_secs(60));
        assert!(config.cache.enabled);
        assert_eq!(config.diagnosis.primary_size, 5);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ServiceConfig::from_file(&path).is_err());
        assert!(ServiceConfig::from_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_presets() {
        let fast = ServiceConfig::fast_mode();
        let accurate = ServiceConfig::accurate_mode();
        assert!(fast.retrieval.timeout_ms < accurate.retrieval.timeout_ms);
        assert!(fast.cache.enabled);
        assert!(!accurate.cache.enabled);
        assert_eq!(ServiceConfig::default().mode, OperationMode::Balanced);
    }
}
