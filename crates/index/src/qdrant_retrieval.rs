use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use knowledge::{Document, DocumentCategory, DocumentMetadata, Language};

use crate::embeddings::EmbeddingClient;
use crate::retrieval::{KnowledgeRetrieval, RetrievalError, RetrievalRequest, ScoredDocument};

/// Retrieval over a Qdrant collection through its REST API. Query vectors come
/// from the embedding client; document payloads carry the full [`Document`].
pub struct QdrantRetrieval {
    base_url: String,
    client: reqwest::Client,
    embedding_client: EmbeddingClient,
    collection_name: String,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    id: String,
    title: String,
    content: String,
    category: DocumentCategory,
    #[serde(default)]
    language: Language,
    #[serde(default)]
    source: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    reliability: Option<f64>,
}

impl Payload {
    fn into_document(self, point_id: &Value) -> Document {
        let id = if self.id.is_empty() {
            point_id.to_string().trim_matches('"').to_string()
        } else {
            self.id
        };
        Document {
            id,
            title: self.title,
            content: self.content,
            category: self.category,
            language: self.language,
            metadata: DocumentMetadata {
                source: self.source,
                author: self.author,
                published_date: self.published_date.as_deref().and_then(parse_published),
                tags: self.tags,
                reliability: self.reliability.unwrap_or(0.5),
            },
        }
    }
}

impl QdrantRetrieval {
    pub fn new(
        base_url: String,
        embedding_client: EmbeddingClient,
        collection_name: String,
    ) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            embedding_client,
            collection_name,
        }
    }

    fn category_filter(request: &RetrievalRequest) -> Vec<Value> {
        if request.categories.is_empty() {
            return Vec::new();
        }
        let any: Vec<&str> = request.categories.iter().map(|c| c.as_str()).collect();
        vec![json!({ "key": "category", "match": { "any": any } })]
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RetrievalError> {
        let url = format!(
            "{}/collections/{}/points/{}",
            self.base_url, self.collection_name, path
        );

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RetrievalError::Unavailable(format!(
                "Qdrant {} failed ({}): {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))
    }

    /// Turn Qdrant points into documents, skipping malformed payloads
    fn parse_points(points: &[Value]) -> Vec<ScoredDocument> {
        let mut parsed = Vec::new();
        for point in points {
            let score = point["score"].as_f64().unwrap_or(0.0);
            let payload = match serde_json::from_value::<Payload>(point["payload"].clone()) {
                Ok(p) => p,
                Err(e) => {
                    warn!(point = %point["id"], error = %e, "Skipping point with malformed payload");
                    continue;
                }
            };
            parsed.push(ScoredDocument {
                document: payload.into_document(&point["id"]),
                score,
            });
        }
        parsed
    }
}

#[async_trait]
impl KnowledgeRetrieval for QdrantRetrieval {
    async fn search(&self, request: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let vector = self.embedding_client
            .embed(&request.text, request.language)
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("{:#}", e)))?;

        let mut body = json!({
            "vector": vector.as_slice(),
            "limit": request.limit,
            "with_payload": true,
            "score_threshold": request.threshold,
        });
        let must = Self::category_filter(request);
        if !must.is_empty() {
            body["filter"] = json!({ "must": must });
        }

        let result = self.post("search", &body).await?;
        let points = result["result"]
            .as_array()
            .ok_or_else(|| RetrievalError::InvalidResponse("missing result array".to_string()))?;

        Ok(Self::parse_points(points))
    }

    async fn keyword_search(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let mut must = Self::category_filter(request);
        must.push(json!({ "key": "content", "match": { "text": request.text } }));

        let body = json!({
            "limit": request.limit,
            "with_payload": true,
            "filter": { "must": must },
        });

        let result = self.post("scroll", &body).await?;
        let points = result["result"]["points"]
            .as_array()
            .ok_or_else(|| RetrievalError::InvalidResponse("missing result.points array".to_string()))?;

        Ok(Self::parse_points(points))
    }
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
