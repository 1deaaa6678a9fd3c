//! Multi-factor ranking of merged semantic and keyword candidates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use extract::TextNormalizer;
use index::ScoredDocument;
use knowledge::{Document, DocumentCategory, Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Keyword,
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Boosts {
    pub recency: f64,
    pub reliability: f64,
    pub category: f64,
}

impl Default for Boosts {
    fn default() -> Self {
        Self {
            recency: 0.1,
            reliability: 0.2,
            category: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RankingFactors {
    pub semantic_score: f64,
    pub keyword_score: f64,
    pub metadata_score: f64,
    pub recency_score: f64,
    pub reliability_score: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub document: Document,
    pub ranking_factors: RankingFactors,
}

/// One document after merging, with whichever signals produced it
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document: Document,
    pub semantic_score: f64,
    /// True when the keyword retrieval returned this document
    pub keyword_hit: bool,
}

/// Fully resolved ranking parameters for one query
#[derive(Debug, Clone)]
pub struct RankingContext {
    pub text: String,
    pub language: Language,
    pub categories: Vec<DocumentCategory>,
    pub mode: SearchMode,
    pub limit: usize,
    pub threshold: f64,
    pub boosts: Boosts,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HybridRanker {
    normalizer: TextNormalizer,
}

impl HybridRanker {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    /// Union semantic and keyword hits by document id. A document seen by both
    /// keeps its first position and carries both signals.
    pub fn merge(semantic: Vec<ScoredDocument>, keyword: Vec<ScoredDocument>) -> Vec<Candidate> {
        let mut position: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<Candidate> = Vec::new();

        for hit in semantic {
            if let Some(&i) = position.get(&hit.document.id) {
                merged[i].semantic_score = merged[i].semantic_score.max(hit.score);
                continue;
            }
            position.insert(hit.document.id.clone(), merged.len());
            merged.push(Candidate {
                document: hit.document,
                semantic_score: hit.score,
                keyword_hit: false,
            });
        }

        for hit in keyword {
            match position.get(&hit.document.id) {
                Some(&i) => merged[i].keyword_hit = true,
                None => {
                    position.insert(hit.document.id.clone(), merged.len());
                    merged.push(Candidate {
                        document: hit.document,
                        semantic_score: 0.0,
                        keyword_hit: true,
                    });
                }
            }
        }

        merged
    }

    /// Score, threshold, stable-sort and truncate. Ties keep retrieval order.
    pub fn rank(&self, ctx: &RankingContext, candidates: Vec<Candidate>) -> Vec<RankedResult> {
        let query_tokens = self.normalizer.tokens(&ctx.text, ctx.language);

        let mut results: Vec<RankedResult> = candidates
            .into_iter()
            .map(|candidate| {
                let ranking_factors = self.factors(ctx, &query_tokens, &candidate);
                RankedResult {
                    document: candidate.document,
                    ranking_factors,
                }
            })
            .filter(|r| r.ranking_factors.final_score >= ctx.threshold)
            .collect();

        results.sort_by(|a, b| {
            b.ranking_factors
                .final_score
                .total_cmp(&a.ranking_factors.final_score)
        });
        results.truncate(ctx.limit);
        results
    }

    fn factors(&self, ctx: &RankingContext, query_tokens: &[String], candidate: &Candidate) -> RankingFactors {
        let doc = &candidate.document;
        let semantic_score = candidate.semantic_score.clamp(0.0, 1.0);
        let keyword_score = if candidate.keyword_hit {
            self.keyword_score(query_tokens, doc)
        } else {
            0.0
        };
        let metadata_score = self.metadata_score(ctx, query_tokens, doc);
        let recency_score = recency_score(doc, ctx.now);
        let reliability_score = doc.reliability();

        let final_score = final_score(
            ctx.mode,
            semantic_score,
            keyword_score,
            metadata_score,
            recency_score,
            reliability_score,
            &ctx.boosts,
        );

        RankingFactors {
            semantic_score,
            keyword_score,
            metadata_score,
            recency_score,
            reliability_score,
            final_score,
        }
    }

    /// Occurrences of query tokens in title+content per document token, scaled by 10, capped at 1
    pub fn keyword_score(&self, query_tokens: &[String], doc: &Document) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let doc_tokens = self.normalizer.tokens(&doc.full_text(), doc.language);
        if doc_tokens.is_empty() {
            return 0.0;
        }
        let occurrences = doc_tokens
            .iter()
            .filter(|t| query_tokens.contains(t))
            .count();
        (occurrences as f64 / doc_tokens.len() as f64 * 10.0).min(1.0)
    }

    pub fn metadata_score(&self, ctx: &RankingContext, query_tokens: &[String], doc: &Document) -> f64 {
        let mut score = 0.0;

        if ctx.categories.is_empty() || ctx.categories.contains(&doc.category) {
            score += 0.3;
        }
        if doc.language == ctx.language {
            score += 0.2;
        }

        if !query_tokens.is_empty() && !doc.metadata.tags.is_empty() {
            let tag_tokens: Vec<String> = doc
                .metadata
                .tags
                .iter()
                .flat_map(|tag| self.normalizer.tokens(tag, doc.language))
                .collect();
            let overlap = query_tokens
                .iter()
                .filter(|t| tag_tokens.contains(t))
                .count();
            score += 0.3 * overlap as f64 / query_tokens.len() as f64;
        }

        score += 0.2 * doc.reliability();
        score.min(1.0)
    }
}

/// `exp(-days/365)`; undated documents score 0.5, future dates count as today
pub fn recency_score(doc: &Document, now: DateTime<Utc>) -> f64 {
    match doc.metadata.published_date {
        Some(published) => {
            let days = (now - published).num_seconds().max(0) as f64 / 86_400.0;
            (-days / 365.0).exp()
        }
        None => 0.5,
    }
}

pub fn final_score(
    mode: SearchMode,
    semantic: f64,
    keyword: f64,
    metadata: f64,
    recency: f64,
    reliability: f64,
    boosts: &Boosts,
) -> f64 {
    let base = match mode {
        SearchMode::Semantic => semantic,
        SearchMode::Keyword => keyword,
        SearchMode::Hybrid => 0.4 * semantic + 0.3 * keyword + 0.3 * metadata,
    };
    let boosted = base
        + boosts.recency * recency
        + boosts.reliability * reliability
        + boosts.category * metadata;
    boosted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use knowledge::DocumentMetadata;

    fn doc(id: &str, title: &str, content: &str, tags: &[&str]) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: DocumentCategory::Disease,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "test".to_string(),
                author: None,
                published_date: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                reliability: 0.5,
            },
        }
    }

    fn hit(document: Document, score: f64) -> ScoredDocument {
        ScoredDocument { document, score }
    }

    fn ctx(mode: SearchMode) -> RankingContext {
        RankingContext {
            text: "fever headache".to_string(),
            language: Language::En,
            categories: vec![DocumentCategory::Disease],
            mode,
            limit: 10,
            threshold: 0.0,
            boosts: Boosts::default(),
            now: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_merge_keeps_one_record_with_both_signals() {
        let a = doc("a", "Influenza", "fever and headache", &[]);
        let b = doc("b", "Migraine", "headache", &[]);
        let merged = HybridRanker::merge(
            vec![hit(a.clone(), 0.8)],
            vec![hit(b, 0.4), hit(a, 0.9)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].document.id, "a");
        assert!(merged[0].keyword_hit);
        assert_eq!(merged[0].semantic_score, 0.8);
        assert_eq!(merged[1].semantic_score, 0.0);
    }

    #[test]
    fn test_final_score_bounded_and_monotonic_in_semantic() {
        let boosts = Boosts {
            recency: 1.0,
            reliability: 1.0,
            category: 1.0,
        };
        for mode in [SearchMode::Semantic, SearchMode::Keyword, SearchMode::Hybrid] {
            let mut previous = 0.0;
            for step in 0..=10 {
                let semantic = step as f64 / 10.0;
                let score = final_score(mode, semantic, 0.7, 0.9, 1.0, 1.0, &boosts);
                assert!((0.0..=1.0).contains(&score));
                assert!(score >= previous);
                previous = score;
            }
        }
        let low = final_score(SearchMode::Hybrid, 0.1, 0.2, 0.3, 0.5, 0.5, &Boosts::default());
        let high = final_score(SearchMode::Hybrid, 0.6, 0.2, 0.3, 0.5, 0.5, &Boosts::default());
        assert!(high > low);
    }

    #[test]
    fn test_recency_decay() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut d = doc("a", "t", "c", &[]);
        assert_eq!(recency_score(&d, now), 0.5);

        d.metadata.published_date = Some(now);
        assert!((recency_score(&d, now) - 1.0).abs() < 1e-9);

        d.metadata.published_date = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!((recency_score(&d, now) - (-1.0f64).exp()).abs() < 1e-3);
    }

    #[test]
    fn test_keyword_and_metadata_scores() {
        let ranker = HybridRanker::default();
        let ctx = ctx(SearchMode::Hybrid);
        let tokens = vec!["fever".to_string(), "headache".to_string()];

        let dense = doc("a", "Fever", "fever headache", &["fever"]);
        assert_eq!(ranker.keyword_score(&tokens, &dense), 1.0);
        let unrelated = doc("b", "Rash", "itchy skin", &[]);
        assert_eq!(ranker.keyword_score(&tokens, &unrelated), 0.0);

        // category 0.3 + language 0.2 + half the query in tags 0.15 + reliability 0.1
        assert!((ranker.metadata_score(&ctx, &tokens, &dense) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_rank_threshold_order_and_ties() {
        let ranker = HybridRanker::default();
        let mut ctx = ctx(SearchMode::Semantic);
        ctx.boosts = Boosts {
            recency: 0.0,
            reliability: 0.0,
            category: 0.0,
        };
        ctx.threshold = 0.3;
        ctx.limit = 2;

        let candidates = HybridRanker::merge(
            vec![
                hit(doc("low", "a", "b", &[]), 0.2),
                hit(doc("tie1", "a", "b", &[]), 0.6),
                hit(doc("top", "a", "b", &[]), 0.9),
                hit(doc("tie2", "a", "b", &[]), 0.6),
            ],
            Vec::new(),
        );
        let ranked = ranker.rank(&ctx, candidates);
        let ids: Vec<&str> = ranked.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "tie1"]);
    }
}
