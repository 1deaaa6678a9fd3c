use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use extract::TextNormalizer;
use knowledge::Language;

const DEFAULT_CACHE_ENTRIES: usize = 4_096;

/// Ollama `/api/embeddings` client for query text. Embeddings of recently
/// seen queries are kept in a bounded map keyed on the normalized query, so
/// "Fever" and "fever " embed once.
#[derive(Clone)]
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    normalizer: TextNormalizer,
    cache: Arc<DashMap<String, Arc<Vec<f32>>>>,
    max_entries: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
            normalizer: TextNormalizer::default(),
            cache: Arc::new(DashMap::new()),
            max_entries: DEFAULT_CACHE_ENTRIES,
        }
    }

    pub fn with_cache_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    fn cache_key(&self, text: &str, language: Language) -> String {
        format!("{}|{}", language.code(), self.normalizer.normalize(text, language))
    }

    fn remember(&self, key: String, embedding: Arc<Vec<f32>>) {
        if self.max_entries == 0 {
            return;
        }
        if self.cache.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .cache
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.cache.remove(&key);
            }
        }
        self.cache.insert(key, embedding);
    }

    /// Embed query text, reusing a cached vector for an equivalent query
    pub async fn embed(&self, text: &str, language: Language) -> Result<Arc<Vec<f32>>> {
        let key = self.cache_key(text, language);
        if let Some(hit) = self.cache.get(&key) {
            debug!(model = %self.model, "Embedding cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        let embedding = Arc::new(self.request(text).await?);
        self.remember(key, Arc::clone(&embedding));
        Ok(embedding)
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send embedding request to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding request failed: {}", response.status());
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if body.embedding.is_empty() {
            anyhow::bail!("Embedding response was empty");
        }
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(max_entries: usize) -> EmbeddingClient {
        EmbeddingClient::new("http://localhost:11434/".to_string(), "test".to_string())
            .with_cache_entries(max_entries)
    }

    #[test]
    fn test_equivalent_queries_share_a_key() {
        let c = client(8);
        assert_eq!(c.base_url, "http://localhost:11434");
        assert_eq!(
            c.cache_key("Fever ", Language::En),
            c.cache_key("fever", Language::En)
        );
        assert_ne!(
            c.cache_key("fever", Language::En),
            c.cache_key("fever", Language::Es)
        );
    }

    #[tokio::test]
    async fn test_cached_embedding_served_without_request() {
        // Nothing listens on this port; a cache miss would fail
        let c = EmbeddingClient::new("http://127.0.0.1:9".to_string(), "test".to_string());
        c.remember(c.cache_key("chest pain", Language::En), Arc::new(vec![0.5, 0.5]));
        let hit = c.embed("Chest pain", Language::En).await.unwrap();
        assert_eq!(*hit, vec![0.5, 0.5]);
        assert!(c.embed("something else", Language::En).await.is_err());
    }

    #[test]
    fn test_cache_stays_bounded() {
        let c = client(4);
        for i in 0..20 {
            c.remember(format!("k{}", i), Arc::new(vec![i as f32]));
        }
        assert!(c.cache.len() <= 4);
        assert!(c.cache.contains_key("k19"));
    }
}
