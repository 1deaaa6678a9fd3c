use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::retrieval::{KnowledgeRetrieval, RetrievalError, RetrievalRequest, ScoredDocument};
use crate::retry::{RetryPolicy, RetrySettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Per-attempt timeout
    pub timeout_ms: u64,
    pub retry: RetrySettings,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            retry: RetrySettings::default(),
        }
    }
}

/// Bounded consumer of a [`KnowledgeRetrieval`] backend: every call carries a
/// timeout, failed attempts are retried, and scores are clamped to [0, 1].
#[derive(Clone)]
pub struct RetrievalClient {
    backend: Arc<dyn KnowledgeRetrieval>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RetrievalClient {
    pub fn new(backend: Arc<dyn KnowledgeRetrieval>, settings: &RetrievalSettings) -> Self {
        Self {
            backend,
            timeout: Duration::from_millis(settings.timeout_ms),
            retry: RetryPolicy::from_settings(&settings.retry),
        }
    }

    pub async fn semantic(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let hits = self
            .retry
            .retry("semantic_search", || async {
                timeout(self.timeout, self.backend.search(request))
                    .await
                    .map_err(|_| RetrievalError::Timeout(self.timeout))?
            })
            .await?;
        Ok(Self::bound(hits, request, true))
    }

    pub async fn keyword(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let hits = self
            .retry
            .retry("keyword_search", || async {
                timeout(self.timeout, self.backend.keyword_search(request))
                    .await
                    .map_err(|_| RetrievalError::Timeout(self.timeout))?
            })
            .await?;
        Ok(Self::bound(hits, request, false))
    }

    /// Enforce the request contract on whatever the backend returned
    fn bound(
        hits: Vec<ScoredDocument>,
        request: &RetrievalRequest,
        apply_threshold: bool,
    ) -> Vec<ScoredDocument> {
        let received = hits.len();
        let bounded: Vec<ScoredDocument> = hits
            .into_iter()
            .map(|mut hit| {
                hit.score = if hit.score.is_finite() {
                    hit.score.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                hit
            })
            .filter(|hit| request.accepts(hit.document.category))
            .filter(|hit| !apply_threshold || hit.score >= request.threshold)
            .take(request.limit)
            .collect();

        debug!(
            query = %request.text,
            received,
            kept = bounded.len(),
            "Retrieval results bounded"
        );
        bounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowledge::{Document, DocumentCategory, DocumentMetadata, Language};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(id: &str, category: DocumentCategory) -> Document {
        Document {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            category,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "test".to_string(),
                author: None,
                published_date: None,
                tags: Vec::new(),
                reliability: 0.5,
            },
        }
    }

    struct Fixed;

    #[async_trait]
    impl KnowledgeRetrieval for Fixed {
        async fn search(&self, _: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Ok(vec![
                ScoredDocument { document: doc("a", DocumentCategory::Drug), score: 1.7 },
                ScoredDocument { document: doc("b", DocumentCategory::Disease), score: 0.9 },
                ScoredDocument { document: doc("c", DocumentCategory::Drug), score: 0.2 },
            ])
        }

        async fn keyword_search(
            &self,
            _: &RetrievalRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Ok(Vec::new())
        }
    }

    struct Slow(AtomicUsize);

    #[async_trait]
    impl KnowledgeRetrieval for Slow {
        async fn search(&self, _: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn keyword_search(
            &self,
            _: &RetrievalRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_results_are_clamped_and_filtered() {
        let client = RetrievalClient::new(Arc::new(Fixed), &RetrievalSettings::default());
        let request = RetrievalRequest::new("x", Language::En)
            .categories(&[DocumentCategory::Drug])
            .threshold(0.5);
        let hits = client.semantic(&request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "a");
        assert_eq!(hits[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_reported() {
        let backend = Arc::new(Slow(AtomicUsize::new(0)));
        let settings = RetrievalSettings {
            timeout_ms: 10,
            retry: RetrySettings {
                max_retries: 1,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            },
        };
        let client = RetrievalClient::new(backend.clone(), &settings);
        let result = client.semantic(&RetrievalRequest::new("x", Language::En)).await;
        assert!(matches!(result, Err(RetrievalError::Timeout(_))));
        assert_eq!(backend.0.load(Ordering::SeqCst), 2);
    }
}
