use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use api::MedicalKnowledgeService;
use api::ServiceError;
use api::cache::MemoryCacheStore;
use api::config::ServiceConfig;
use api::metrics::MetricsSnapshot;
use diagnosis::DiagnosisResult;
use index::{EmbeddingClient, InMemoryRetrieval, KnowledgeRetrieval, QdrantRetrieval};
use interactions::{InteractionRequest, InteractionResult};
use knowledge::{CatalogueReader, CatalogueStore, Language, PatientProfile, Symptom, seed};
use query::{SearchQuery, SearchResponse, Suggestion};

struct AppState {
    service: MedicalKnowledgeService,
    backend: &'static str,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Deserialize)]
struct DiagnosisRequest {
    symptoms: Vec<Symptom>,
    #[serde(default)]
    patient: Option<PatientProfile>,
    #[serde(default)]
    language: Language,
}

#[derive(Deserialize)]
struct SuggestionParams {
    q: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
    catalogue_version: String,
}

fn rejected(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        ServiceError::Catalogue(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;

    // Load catalogues
    let catalogues = match &config.backend.catalogue_dir {
        Some(dir) => CatalogueReader::read_directory(dir)
            .await
            .with_context(|| format!("Failed to load catalogues from {}", dir.display()))?,
        None => seed::seed_catalogues(),
    };
    let store = Arc::new(CatalogueStore::new(catalogues));

    // Pick the retrieval backend
    let (backend, backend_name): (Arc<dyn KnowledgeRetrieval>, &'static str) =
        match &config.backend.qdrant_url {
            Some(url) => {
                let embedding_client = EmbeddingClient::new(
                    config.backend.ollama_url.clone(),
                    config.backend.embedding_model.clone(),
                );
                let qdrant = QdrantRetrieval::new(
                    url.clone(),
                    embedding_client,
                    config.backend.collection.clone(),
                );
                (Arc::new(qdrant), "qdrant")
            }
            None => (
                Arc::new(InMemoryRetrieval::from_catalogues(&store.snapshot())),
                "memory",
            ),
        };

    let cache_store = Arc::new(MemoryCacheStore::new(config.cache.max_entries));
    let service = MedicalKnowledgeService::new(&config, backend, store, cache_store);

    let state = Arc::new(AppState {
        service,
        backend: backend_name,
    });

    // Build router
    let app = Router::new()
        .route("/search", post(search))
        .route("/diagnosis", post(analyze_symptoms))
        .route("/interactions", post(check_interactions))
        .route("/suggestions", get(suggestions))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.backend.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.backend.bind_addr))?;

    tracing::info!(
        addr = %config.backend.bind_addr,
        backend = backend_name,
        mode = ?config.mode,
        "Server listening"
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<SearchResponse> {
    state.service.hybrid_search(&query).await.map(Json).map_err(rejected)
}

async fn analyze_symptoms(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiagnosisRequest>,
) -> ApiResult<DiagnosisResult> {
    let result = state
        .service
        .analyze_symptoms(&req.symptoms, req.patient.as_ref(), req.language)
        .await;
    Ok(Json(result))
}

async fn check_interactions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InteractionRequest>,
) -> ApiResult<InteractionResult> {
    state.service.check_interactions(&req).await.map(Json).map_err(rejected)
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> ApiResult<Vec<Suggestion>> {
    let language = params
        .language
        .as_deref()
        .map(Language::from_code)
        .unwrap_or_default();
    Ok(Json(state.service.get_search_suggestions(
        &params.q,
        language,
        params.limit,
    )))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.backend,
        catalogue_version: state.service.catalogue_version(),
    })
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics())
}
