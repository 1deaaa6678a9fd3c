use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use extract::lexicon::{fold_char, synonyms};
use knowledge::{Catalogues, DocumentCategory, Language};

pub const MIN_PREFIX_CHARS: usize = 2;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Drug,
    Condition,
    Symptom,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
    pub score: f64,
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase().chars().map(fold_char).collect()
}

/// 1.0 for a prefix, 0.8 for a word prefix, 0.5 for any other substring
fn match_score(candidate: &str, partial: &str) -> Option<f64> {
    let candidate = fold(candidate);
    if candidate.starts_with(partial) {
        Some(1.0)
    } else if candidate.split_whitespace().any(|w| w.starts_with(partial)) {
        Some(0.8)
    } else if candidate.contains(partial) {
        Some(0.5)
    } else {
        None
    }
}

/// Autocomplete over catalogue names and document titles. Inputs shorter than
/// two characters return nothing; prefix matches come first.
pub fn suggest(
    catalogues: &Catalogues,
    partial: &str,
    language: Language,
    limit: usize,
) -> Vec<Suggestion> {
    let partial = fold(partial);
    if partial.chars().count() < MIN_PREFIX_CHARS || limit == 0 {
        return Vec::new();
    }

    let mut pool: Vec<(&str, SuggestionKind)> = Vec::new();
    for drug in catalogues.drugs() {
        pool.push((&drug.name, SuggestionKind::Drug));
        for brand in &drug.brand_names {
            pool.push((brand, SuggestionKind::Drug));
        }
    }
    for condition in catalogues.conditions() {
        pool.push((&condition.name, SuggestionKind::Condition));
    }
    for doc in catalogues.documents() {
        if doc.language != language && language != Language::Unknown {
            continue;
        }
        let kind = match doc.category {
            DocumentCategory::Symptom => SuggestionKind::Symptom,
            _ => SuggestionKind::Document,
        };
        pool.push((&doc.title, kind));
    }
    // Local-language phrases users commonly type
    if language != Language::En {
        for (phrase, _) in synonyms(language) {
            pool.push((*phrase, SuggestionKind::Symptom));
        }
    }

    let mut seen = HashSet::new();
    let mut suggestions: Vec<Suggestion> = pool
        .into_iter()
        .filter_map(|(text, kind)| {
            let score = match_score(text, &partial)?;
            seen.insert(fold(text)).then(|| Suggestion {
                text: text.to_string(),
                kind,
                score,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.text.len().cmp(&b.text.len()))
            .then(a.kind.cmp(&b.kind))
            .then(a.text.cmp(&b.text))
    });
    suggestions.truncate(limit);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::seed::seed_catalogues;

    #[test]
    fn test_prefix_matches_first() {
        let catalogues = seed_catalogues();
        let results = suggest(&catalogues, "migr", Language::En, DEFAULT_SUGGESTION_LIMIT);
        assert!(!results.is_empty());
        assert!(results.len() <= DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(results[0].score, 1.0);
        assert!(results.iter().any(|s| s.text == "Migraine"));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_short_input_returns_nothing() {
        let catalogues = seed_catalogues();
        assert!(suggest(&catalogues, "a", Language::En, 8).is_empty());
        assert!(suggest(&catalogues, "  ", Language::En, 8).is_empty());
    }

    #[test]
    fn test_spanish_phrases_and_dedup() {
        let catalogues = seed_catalogues();
        let results = suggest(&catalogues, "fie", Language::Es, 8);
        let fiebre = results.iter().filter(|s| fold(&s.text) == "fiebre").count();
        assert_eq!(fiebre, 1);
    }
}
