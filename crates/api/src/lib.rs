//! Request-level orchestration: boundary validation, canonical-key response
//! caching and metrics around the search, diagnosis and interaction engines.

pub mod cache;
pub mod config;
pub mod metrics;

use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use diagnosis::{DiagnosisEngine, DiagnosisResult};
use index::{KnowledgeRetrieval, RetrievalClient};
use interactions::{InteractionEngine, InteractionRequest, InteractionResult};
use knowledge::{CatalogueReader, CatalogueStore, Catalogues, KnowledgeError, Language, PatientProfile, Symptom};
use query::{DEFAULT_SUGGESTION_LIMIT, HybridSearchEngine, SearchQuery, SearchResponse, Suggestion};

use cache::{CacheGateway, CacheStore, Operation};
use config::{CacheConfig, ServiceConfig};
use metrics::{Metrics, MetricsSnapshot, TimedOperation};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Catalogue(#[from] KnowledgeError),
}

/// The four exposed operations plus catalogue reload
pub struct MedicalKnowledgeService {
    store: Arc<CatalogueStore>,
    search: HybridSearchEngine,
    diagnosis: DiagnosisEngine,
    interactions: InteractionEngine,
    cache: Option<CacheGateway>,
    cache_config: CacheConfig,
    metrics: Arc<Metrics>,
}

impl MedicalKnowledgeService {
    pub fn new(
        config: &ServiceConfig,
        backend: Arc<dyn KnowledgeRetrieval>,
        store: Arc<CatalogueStore>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        let client = RetrievalClient::new(backend, &config.retrieval);
        let search = HybridSearchEngine::new(client, Arc::clone(&store), config.search.clone());
        let cache = config
            .cache
            .enabled
            .then(|| CacheGateway::new(cache_store, config.cache.timeout()));

        Self {
            store,
            diagnosis: DiagnosisEngine::new(search.clone(), config.diagnosis.clone()),
            interactions: InteractionEngine::new(search.clone(), config.interactions.clone()),
            search,
            cache,
            cache_config: config.cache.clone(),
            metrics: Metrics::new(),
        }
    }

    pub fn catalogue_version(&self) -> String {
        self.store.version()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn hybrid_search(&self, query: &SearchQuery) -> Result<SearchResponse, ServiceError> {
        if query.text.trim().is_empty() {
            self.metrics.record_request(false);
            return Err(ServiceError::InvalidRequest("search text is empty".to_string()));
        }

        let key = cache::search_key(query, &self.store.version());
        let response = self
            .cached(Operation::Search, &key, self.search.search(query), |r: &SearchResponse| {
                r.degraded
            })
            .await;
        self.metrics.record_request(true);
        Ok(response)
    }

    /// Zero symptoms is a valid request and yields an empty assessment
    pub async fn analyze_symptoms(
        &self,
        symptoms: &[Symptom],
        profile: Option<&PatientProfile>,
        language: Language,
    ) -> DiagnosisResult {
        let key = cache::diagnosis_key(symptoms, profile, language, &self.store.version());
        let result = self
            .cached(
                Operation::Diagnosis,
                &key,
                self.diagnosis.analyze(symptoms, profile, language),
                |r: &DiagnosisResult| r.degraded,
            )
            .await;
        self.metrics.record_request(true);
        result
    }

    pub async fn check_interactions(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionResult, ServiceError> {
        if request.drugs.iter().all(|d| d.trim().is_empty()) {
            self.metrics.record_request(false);
            return Err(ServiceError::InvalidRequest("drug list is empty".to_string()));
        }

        let key = cache::interaction_key(request, &self.store.version());
        let result = self
            .cached(
                Operation::Interactions,
                &key,
                self.interactions.check(request),
                |r: &InteractionResult| r.degraded,
            )
            .await;
        self.metrics.record_request(true);
        Ok(result)
    }

    pub fn get_search_suggestions(
        &self,
        partial: &str,
        language: Language,
        limit: Option<usize>,
    ) -> Vec<Suggestion> {
        let snapshot = self.store.snapshot();
        query::suggest(&snapshot, partial, language, limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT))
    }

    /// Swap in new catalogues. Returns the new version; cached responses keyed
    /// on the old version are no longer reachable.
    pub fn reload_catalogues(&self, catalogues: Catalogues) -> String {
        let version = catalogues.version().to_string();
        self.store.swap(catalogues);
        version
    }

    pub async fn reload_from_dir(&self, dir: &Path) -> Result<String, ServiceError> {
        let catalogues = CatalogueReader::read_directory(dir).await?;
        Ok(self.reload_catalogues(catalogues))
    }

    /// Serve from cache, or compute and store. Degraded results are returned
    /// but never stored.
    async fn cached<T, F>(
        &self,
        operation: Operation,
        key: &str,
        compute: F,
        degraded: fn(&T) -> bool,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = T>,
    {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get::<T>(key).await {
                self.metrics.record_cache(true);
                debug!(operation = operation.as_str(), key, "Served from cache");
                return hit;
            }
            self.metrics.record_cache(false);
        }

        let timer = TimedOperation::start();
        let result = compute.await;
        self.metrics.record_operation(operation, timer.elapsed());

        if degraded(&result) {
            self.metrics.record_degraded();
            info!(operation = operation.as_str(), "Degraded response not cached");
            return result;
        }

        if let Some(cache) = &self.cache {
            if !cache.set(key, &result, self.cache_config.ttl(operation)).await {
                self.metrics.record_cache_write_failure();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cache::MemoryCacheStore;
    use index::{InMemoryRetrieval, RetrievalError, RetrievalRequest, ScoredDocument};
    use interactions::SafetyLevel;
    use knowledge::{SymptomSeverity, seed::seed_data};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Empty results, or failures when `down`; counts every search call
    struct Counting {
        calls: AtomicUsize,
        down: bool,
    }

    impl Counting {
        fn new(down: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                down,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self) -> Result<Vec<ScoredDocument>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                Err(RetrievalError::Unavailable("connection refused".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[async_trait]
    impl KnowledgeRetrieval for Counting {
        async fn search(&self, _: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
            self.respond()
        }

        async fn keyword_search(
            &self,
            _: &RetrievalRequest,
        ) -> Result<Vec<ScoredDocument>, RetrievalError> {
            self.respond()
        }
    }

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.retrieval.retry.max_retries = 0;
        config
    }

    fn service(backend: Arc<dyn KnowledgeRetrieval>) -> MedicalKnowledgeService {
        MedicalKnowledgeService::new(
            &config(),
            backend,
            Arc::new(CatalogueStore::seeded()),
            Arc::new(MemoryCacheStore::new(100)),
        )
    }

    #[tokio::test]
    async fn test_repeated_interaction_check_served_from_cache() {
        let backend = Counting::new(false);
        let service = service(backend.clone());
        let request = InteractionRequest::new(&["Warfarin", "Zorblax"]);

        let first = service.check_interactions(&request).await.unwrap();
        let calls = backend.calls();
        assert!(calls > 0);

        let second = service.check_interactions(&request).await.unwrap();
        assert_eq!(backend.calls(), calls);
        assert_eq!(first, second);

        let metrics = service.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_empty_drug_list_rejected_at_boundary() {
        let backend = Counting::new(false);
        let service = service(backend.clone());
        let err = service
            .check_interactions(&InteractionRequest::new(&["", "  "]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert_eq!(backend.calls(), 0);
        assert_eq!(service.metrics().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_degraded_results_are_not_cached() {
        let backend = Counting::new(true);
        let service = service(backend.clone());
        let request = InteractionRequest::new(&["Aspirin", "Zorblax"]);

        let first = service.check_interactions(&request).await.unwrap();
        assert!(first.degraded);
        let calls = backend.calls();
        service.check_interactions(&request).await.unwrap();
        assert!(backend.calls() > calls);
        assert_eq!(service.metrics().degraded_responses, 2);
    }

    #[tokio::test]
    async fn test_reload_invalidates_cached_responses() {
        let store = Arc::new(CatalogueStore::seeded());
        let backend = Arc::new(InMemoryRetrieval::from_catalogues(&store.snapshot()));
        let service = MedicalKnowledgeService::new(
            &config(),
            backend,
            store,
            Arc::new(MemoryCacheStore::new(100)),
        );
        let symptoms = [
            Symptom::new("fever", SymptomSeverity::Moderate),
            Symptom::new("headache", SymptomSeverity::Mild),
        ];

        service.analyze_symptoms(&symptoms, None, Language::En).await;
        service.analyze_symptoms(&symptoms, None, Language::En).await;
        assert_eq!(service.metrics().cache_hits, 1);

        let version = service.reload_catalogues(Catalogues::new("test-2", seed_data()));
        assert_eq!(version, "test-2");
        assert_eq!(service.catalogue_version(), "test-2");

        let result = service.analyze_symptoms(&symptoms, None, Language::En).await;
        assert_eq!(result.catalogue_version, "test-2");
        assert_eq!(service.metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_allergy_check_through_service() {
        let service = service(Counting::new(false));
        let request = InteractionRequest::new(&["Aspirin"]).patient(PatientProfile {
            allergies: vec![knowledge::Allergy::new("aspirin")],
            ..Default::default()
        });
        let result = service.check_interactions(&request).await.unwrap();
        assert_eq!(result.safety_profile.level, SafetyLevel::Contraindicated);
    }

    #[tokio::test]
    async fn test_search_validation_and_suggestions() {
        let service = service(Counting::new(false));
        let err = service
            .hybrid_search(&SearchQuery::new("   ", Language::En))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let suggestions = service.get_search_suggestions("warf", Language::En, None);
        assert_eq!(suggestions[0].text, "Warfarin");
        assert!(service.get_search_suggestions("w", Language::En, None).is_empty());
    }
}
