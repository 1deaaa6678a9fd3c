use async_trait::async_trait;
use std::collections::HashMap;

use extract::TextNormalizer;
use knowledge::{Catalogues, Document};

use crate::retrieval::{KnowledgeRetrieval, RetrievalError, RetrievalRequest, ScoredDocument};

type TermVector = HashMap<String, f64>;

struct Entry {
    document: Document,
    title: TermVector,
    body: TermVector,
    tokens: Vec<String>,
}

/// Retrieval over an in-process document set. Semantic relevance is cosine
/// similarity between normalized term-frequency vectors, so it works without a
/// vector store or embedding model.
pub struct InMemoryRetrieval {
    normalizer: TextNormalizer,
    entries: Vec<Entry>,
}

impl InMemoryRetrieval {
    pub fn new(documents: Vec<Document>) -> Self {
        let normalizer = TextNormalizer::with_synonyms();
        let entries = documents
            .into_iter()
            .map(|document| {
                let title_tokens = normalizer.tokens(&document.title, document.language);
                let tokens = normalizer.tokens(&document.full_text(), document.language);
                Entry {
                    title: term_vector(&title_tokens),
                    body: term_vector(&tokens),
                    tokens,
                    document,
                }
            })
            .collect();

        Self { normalizer, entries }
    }

    pub fn from_catalogues(catalogues: &Catalogues) -> Self {
        Self::new(catalogues.documents().to_vec())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every accepted entry, keep positive scores, order by score then insertion
    fn collect<F>(&self, request: &RetrievalRequest, score: F) -> Vec<ScoredDocument>
    where
        F: Fn(&Entry) -> f64,
    {
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| request.accepts(e.document.category))
            .map(|(i, e)| (i, score(e)))
            .filter(|(_, s)| *s > 0.0 && *s >= request.threshold)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(request.limit);

        scored
            .into_iter()
            .map(|(i, score)| ScoredDocument {
                document: self.entries[i].document.clone(),
                score,
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeRetrieval for InMemoryRetrieval {
    async fn search(&self, request: &RetrievalRequest) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let query = term_vector(&self.normalizer.tokens(&request.text, request.language));
        if query.is_empty() {
            return Ok(Vec::new());
        }

        // A strong title match outranks the same words buried in the body
        Ok(self.collect(request, |entry| {
            cosine(&query, &entry.title).max(0.9 * cosine(&query, &entry.body))
        }))
    }

    async fn keyword_search(
        &self,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let mut query = self.normalizer.tokens(&request.text, request.language);
        query.dedup();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.collect(request, |entry| {
            let hits = query.iter().filter(|t| entry.tokens.contains(t)).count();
            hits as f64 / query.len() as f64
        }))
    }
}

fn term_vector(tokens: &[String]) -> TermVector {
    let mut vector = TermVector::new();
    for token in tokens {
        *vector.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    vector
}

fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
