use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use extract::TextNormalizer;
use index::{RetrievalClient, RetrievalError, RetrievalRequest, ScoredDocument};
use knowledge::{CatalogueStore, DocumentCategory, Language};

use crate::ranker::{Boosts, Candidate, HybridRanker, RankedResult, RankingContext, SearchMode};

/// A caller's search request. Unset fields take the configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub categories: Vec<DocumentCategory>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub boosts: Option<Boosts>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
            categories: Vec::new(),
            mode: SearchMode::default(),
            limit: None,
            threshold: None,
            boosts: None,
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn categories(mut self, categories: &[DocumentCategory]) -> Self {
        self.categories = categories.to_vec();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub limit: usize,
    pub threshold: f64,
    pub boosts: Boosts,
    /// Candidates fetched per signal, as a multiple of the result limit
    pub candidate_factor: usize,
    /// Used when a query names no categories
    pub default_categories: Vec<DocumentCategory>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            limit: 10,
            threshold: 0.2,
            boosts: Boosts::default(),
            candidate_factor: 2,
            default_categories: Vec::new(),
        }
    }
}

impl SearchSettings {
    pub fn resolve(&self, query: &SearchQuery) -> RankingContext {
        RankingContext {
            text: query.text.clone(),
            language: query.language,
            categories: if query.categories.is_empty() {
                self.default_categories.clone()
            } else {
                query.categories.clone()
            },
            mode: query.mode,
            limit: query.limit.unwrap_or(self.limit),
            threshold: query.threshold.unwrap_or(self.threshold).clamp(0.0, 1.0),
            boosts: query.boosts.unwrap_or(self.boosts),
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedResult>,
    /// A retrieval signal failed. Results come from the signal that answered,
    /// or from local catalogue documents when none did.
    pub degraded: bool,
}

/// Hybrid search over the retrieval backend, with catalogue fallback
#[derive(Clone)]
pub struct HybridSearchEngine {
    client: RetrievalClient,
    store: Arc<CatalogueStore>,
    ranker: HybridRanker,
    normalizer: TextNormalizer,
    settings: SearchSettings,
}

impl HybridSearchEngine {
    pub fn new(client: RetrievalClient, store: Arc<CatalogueStore>, settings: SearchSettings) -> Self {
        let normalizer = TextNormalizer::with_synonyms();
        Self {
            client,
            store,
            ranker: HybridRanker::new(normalizer),
            normalizer,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<CatalogueStore> {
        &self.store
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    #[tracing::instrument(skip_all, fields(mode = ?query.mode, language = query.language.code()))]
    pub async fn search(&self, query: &SearchQuery) -> SearchResponse {
        let ctx = self.settings.resolve(query);
        self.search_with(ctx).await
    }

    /// Run a search with an already resolved context
    pub async fn search_with(&self, ctx: RankingContext) -> SearchResponse {
        let request = RetrievalRequest::new(ctx.text.clone(), ctx.language)
            .categories(&ctx.categories)
            .limit(ctx.limit.saturating_mul(self.settings.candidate_factor.max(1)));

        // Step 1: Fetch candidates for each signal the mode needs
        let (semantic, keyword) = match ctx.mode {
            SearchMode::Semantic => (Some(self.client.semantic(&request).await), None),
            SearchMode::Keyword => (None, Some(self.client.keyword(&request).await)),
            SearchMode::Hybrid => {
                let (semantic, keyword) =
                    tokio::join!(self.client.semantic(&request), self.client.keyword(&request));
                (Some(semantic), Some(keyword))
            }
        };

        // Step 2: Merge what came back; the catalogue only when nothing did
        let (candidates, degraded) = match (semantic, keyword) {
            (Some(Err(e)), None | Some(Err(_))) | (None, Some(Err(e))) => {
                warn!(error = %e, "Retrieval unavailable, ranking catalogue documents");
                (self.catalogue_candidates(&request), true)
            }
            (Some(Ok(semantic)), Some(Err(e))) => {
                warn!(error = %e, "Keyword retrieval unavailable, ranking semantic candidates");
                (HybridRanker::merge(semantic, Vec::new()), true)
            }
            (Some(Err(e)), Some(Ok(keyword))) => {
                warn!(error = %e, "Semantic retrieval unavailable, ranking keyword candidates");
                (HybridRanker::merge(Vec::new(), keyword), true)
            }
            (semantic, keyword) => (
                HybridRanker::merge(
                    semantic.and_then(Result::ok).unwrap_or_default(),
                    keyword.and_then(Result::ok).unwrap_or_default(),
                ),
                false,
            ),
        };

        // Step 3: Rank
        let results = self.ranker.rank(&ctx, candidates);
        info!(results = results.len(), degraded, "Search complete");

        SearchResponse { results, degraded }
    }

    /// Catalogue documents sharing at least one normalized token with the query
    fn catalogue_candidates(&self, request: &RetrievalRequest) -> Vec<Candidate> {
        let snapshot = self.store.snapshot();
        let query_tokens = self.normalizer.tokens(&request.text, request.language);

        snapshot
            .documents()
            .iter()
            .filter(|doc| request.accepts(doc.category))
            .filter(|doc| {
                let tokens = self.normalizer.tokens(&doc.full_text(), doc.language);
                query_tokens.iter().any(|t| tokens.contains(t))
            })
            .take(request.limit)
            .map(|doc| Candidate {
                document: doc.clone(),
                semantic_score: 0.0,
                keyword_hit: true,
            })
            .collect()
    }

    /// Top-1 semantic match whose retrieval score reaches `threshold`
    pub async fn lookup(
        &self,
        text: &str,
        language: Language,
        categories: &[DocumentCategory],
        threshold: f64,
    ) -> Result<Option<ScoredDocument>, RetrievalError> {
        let hits = self.retrieve(text, language, categories, 1, threshold).await?;
        let best = hits.into_iter().next();
        debug!(
            text,
            matched = best.as_ref().map(|h| h.document.title.as_str()),
            "Semantic lookup"
        );
        Ok(best)
    }

    /// Raw semantic candidates at or above `threshold`, best first
    pub async fn retrieve(
        &self,
        text: &str,
        language: Language,
        categories: &[DocumentCategory],
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let request = RetrievalRequest::new(text, language)
            .categories(categories)
            .limit(limit)
            .threshold(threshold);
        let mut hits = self.client.semantic(&request).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use index::{InMemoryRetrieval, KnowledgeRetrieval, RetrievalSettings, RetrySettings};
    use knowledge::{Document, DocumentMetadata};

    struct Down;

    #[async_trait]
    impl KnowledgeRetrieval for Down {
        async fn search(&self, _: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Err(RetrievalError::Unavailable("connection refused".to_string()))
        }

        async fn keyword_search(
            &self,
            _: &RetrievalRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Err(RetrievalError::Unavailable("connection refused".to_string()))
        }
    }

    fn no_retry() -> RetrievalSettings {
        RetrievalSettings {
            timeout_ms: 500,
            retry: RetrySettings {
                max_retries: 0,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            },
        }
    }

    fn engine(backend: Arc<dyn KnowledgeRetrieval>) -> HybridSearchEngine {
        let store = Arc::new(CatalogueStore::seeded());
        HybridSearchEngine::new(
            RetrievalClient::new(backend, &no_retry()),
            store,
            SearchSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_hybrid_search_over_memory_backend() {
        let store = CatalogueStore::seeded();
        let backend = Arc::new(InMemoryRetrieval::from_catalogues(&store.snapshot()));
        let engine = engine(backend);

        let response = engine
            .search(&SearchQuery::new("warfarin", Language::En).categories(&[DocumentCategory::Drug]))
            .await;
        assert!(!response.degraded);
        assert_eq!(response.results[0].document.title, "Warfarin");
        for result in &response.results {
            let f = result.ranking_factors;
            assert!((0.0..=1.0).contains(&f.final_score));
            assert!(f.final_score >= 0.2);
        }
        assert!(
            response
                .results
                .windows(2)
                .all(|w| w[0].ranking_factors.final_score >= w[1].ranking_factors.final_score)
        );
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_catalogue() {
        let engine = engine(Arc::new(Down));
        let response = engine.search(&SearchQuery::new("migraine", Language::En)).await;
        assert!(response.degraded);
        assert!(response.results.iter().any(|r| r.document.title == "Migraine"));
    }

    /// Semantic search answers, keyword search is down
    struct KeywordDown(Vec<ScoredDocument>);

    #[async_trait]
    impl KnowledgeRetrieval for KeywordDown {
        async fn search(&self, _: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Ok(self.0.clone())
        }

        async fn keyword_search(
            &self,
            _: &RetrievalRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            Err(RetrievalError::Unavailable("keyword index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_one_failed_signal_keeps_the_other() {
        let document = Document {
            id: "retrieved-1".to_string(),
            title: "Valley fever".to_string(),
            content: "Fungal infection with fever and cough.".to_string(),
            category: DocumentCategory::Disease,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "test".to_string(),
                author: None,
                published_date: None,
                tags: Vec::new(),
                reliability: 0.8,
            },
        };
        let engine = engine(Arc::new(KeywordDown(vec![ScoredDocument { document, score: 0.9 }])));

        let response = engine.search(&SearchQuery::new("fever", Language::En)).await;
        assert!(response.degraded);
        let ids: Vec<&str> = response.results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["retrieved-1"]);
        assert_eq!(response.results[0].ranking_factors.keyword_score, 0.0);
    }

    #[tokio::test]
    async fn test_lookup_threshold_uses_retrieval_score() {
        let store = CatalogueStore::seeded();
        let backend = Arc::new(InMemoryRetrieval::from_catalogues(&store.snapshot()));
        let engine = engine(backend);

        let hit = engine
            .lookup("fever", Language::En, &[DocumentCategory::Symptom], 0.8)
            .await
            .unwrap();
        assert_eq!(hit.map(|h| h.document.title), Some("fever".to_string()));

        let miss = engine
            .lookup("purple elephant", Language::En, &[DocumentCategory::Symptom], 0.8)
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
