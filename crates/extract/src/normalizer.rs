use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use knowledge::Language;

use crate::lexicon::{fold_char, stem, stop_words, synonyms};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerOptions {
    /// Append canonical forms of known synonyms and transliterations
    pub expand_synonyms: bool,
}

/// Language-aware, deterministic text preprocessing for queries and catalogue terms
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    options: NormalizerOptions,
}

impl TextNormalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn with_synonyms() -> Self {
        Self::new(NormalizerOptions {
            expand_synonyms: true,
        })
    }

    /// Normalize text: lowercase, fold diacritics, strip punctuation and stop words, stem.
    /// Unknown languages pass through unchanged.
    pub fn normalize(&self, text: &str, language: Language) -> String {
        if language == Language::Unknown {
            return text.to_string();
        }
        self.tokens(text, language).join(" ")
    }

    /// Normalized tokens in input order
    pub fn tokens(&self, text: &str, language: Language) -> Vec<String> {
        if language == Language::Unknown {
            return text.split_whitespace().map(|t| t.to_lowercase()).collect();
        }

        let folded = fold(text);
        let stops = stop_words(language);

        let mut tokens: Vec<String> = folded
            .split_whitespace()
            .filter(|t| !stops.contains(t))
            .map(|t| stem(t, language))
            .collect();

        if self.options.expand_synonyms {
            for canonical in matched_synonyms(&folded, language) {
                for token in canonical.split_whitespace() {
                    let token = stem(token, Language::En);
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
            }
        }

        tokens
    }

    /// Canonical key for a symptom/condition/drug term so that user input and
    /// catalogue entries compare equal. Whole-phrase synonyms map to English first.
    pub fn canonical_term(&self, text: &str, language: Language) -> String {
        let folded = fold(text);
        if folded.is_empty() {
            return String::new();
        }

        let lookup_order = [language, Language::En];
        for lang in lookup_order {
            if let Some((_, canonical)) = synonyms(lang).iter().find(|(phrase, _)| *phrase == folded) {
                return plain(canonical, Language::En);
            }
        }

        match language {
            Language::Unknown => folded,
            _ => plain(&folded, language),
        }
    }
}

/// Normalize without synonym expansion
fn plain(text: &str, language: Language) -> String {
    TextNormalizer::default().normalize(text, language)
}

/// Lowercase, fold diacritics, replace punctuation with spaces, collapse whitespace
fn fold(text: &str) -> String {
    let lowered: String = text.to_lowercase().chars().map(fold_char).collect();
    NON_WORD
        .replace_all(&lowered, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical terms for every synonym phrase appearing as whole words in `folded`
fn matched_synonyms(folded: &str, language: Language) -> Vec<&'static str> {
    let padded = format!(" {} ", folded);
    let mut found = Vec::new();
    for lang in [language, Language::En] {
        for (phrase, canonical) in synonyms(lang) {
            if padded.contains(&format!(" {} ", phrase)) && !found.contains(canonical) {
                found.push(*canonical);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let normalizer = TextNormalizer::default();

        assert_eq!(normalizer.normalize("The Headaches!", Language::En), "headache");
        assert_eq!(normalizer.normalize("  fever, and chills ", Language::En), "fever chill");
        assert_eq!(normalizer.normalize("Dolores de la cabeza", Language::Es), "dolor cabez");
    }

    #[test]
    fn test_deterministic() {
        let normalizer = TextNormalizer::with_synonyms();
        let a = normalizer.normalize("Tylenol for high blood pressure?", Language::En);
        let b = normalizer.normalize("Tylenol for high blood pressure?", Language::En);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_language_passes_through() {
        let normalizer = TextNormalizer::with_synonyms();
        assert_eq!(normalizer.normalize("Kopfschmerzen!", Language::Unknown), "Kopfschmerzen!");
    }

    #[test]
    fn test_synonym_expansion() {
        let normalizer = TextNormalizer::with_synonyms();
        let tokens = normalizer.tokens("took some tylenol", Language::En);
        assert!(tokens.contains(&"acetaminophen".to_string()));

        let plain = TextNormalizer::default().tokens("took some tylenol", Language::En);
        assert!(!plain.contains(&"acetaminophen".to_string()));
    }

    #[test]
    fn test_canonical_term_across_languages() {
        let normalizer = TextNormalizer::default();
        let english = normalizer.canonical_term("Headache", Language::En);
        assert_eq!(normalizer.canonical_term("dolor de cabeza", Language::Es), english);
        assert_eq!(normalizer.canonical_term("Mal de tête", Language::Fr), english);
        assert_eq!(normalizer.canonical_term("fièvre", Language::Fr), "fever");
        assert_eq!(
            normalizer.canonical_term("Muscle aches", Language::En),
            normalizer.canonical_term("muscle ache", Language::En)
        );
    }
}
