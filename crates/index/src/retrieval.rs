use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use knowledge::{Document, DocumentCategory, Language};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval backend unavailable: {0}")]
    Unavailable(String),

    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid retrieval response: {0}")]
    InvalidResponse(String),
}

impl RetrievalError {
    /// Worth another attempt
    pub fn is_transient(&self) -> bool {
        !matches!(self, RetrievalError::InvalidResponse(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub text: String,
    pub language: Language,
    /// Empty means every category
    pub categories: Vec<DocumentCategory>,
    pub limit: usize,
    /// Minimum relevance in [0, 1]
    pub threshold: f64,
}

impl RetrievalRequest {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
            categories: Vec::new(),
            limit: 10,
            threshold: 0.0,
        }
    }

    pub fn categories(mut self, categories: &[DocumentCategory]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn accepts(&self, category: DocumentCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }
}

/// A retrieved document with its backend relevance in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

/// External semantic/keyword search capability. Best-effort; may return nothing.
#[async_trait]
pub trait KnowledgeRetrieval: Send + Sync {
    /// Vector-similarity search
    async fn search(&self, request: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError>;

    /// Term-overlap search. Scores are advisory; the ranker recomputes keyword relevance.
    async fn keyword_search(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError>;
}
