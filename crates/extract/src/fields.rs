//! Structured field extraction from retrieved prose.
//!
//! Scoring code only sees the [`FieldExtractor`] trait, so the keyword scanner
//! below can be swapped for a trained classifier without touching rankers or engines.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use knowledge::{Document, Drug, InteractionSeverity, Onset, lookup_key};

use crate::lexicon::fold_char;

pub trait FieldExtractor: Send + Sync {
    /// Interaction severity signalled by free text
    fn severity(&self, text: &str) -> InteractionSeverity;

    fn onset(&self, text: &str) -> Onset;

    /// Sentence describing how the interaction happens
    fn mechanism(&self, text: &str) -> String;

    fn monitoring_parameters(&self, text: &str) -> Vec<String>;

    /// Build a drug record from a retrieved drug monograph
    fn drug_record(&self, doc: &Document) -> Drug;

    /// Whole-word, case- and accent-insensitive mention check
    fn mentions(&self, text: &str, term: &str) -> bool;
}

// Severity signals, strongest first. Matched on folded, lowercased text.
const CONTRAINDICATED_SIGNALS: &[&str] = &[
    "contraindicated",
    "contraindication",
    "do not use",
    "do not combine",
    "never combine",
    "avoid",
    "avoid combination",
    "contraindicado",
    "contraindicada",
    "evitar",
    "no combinar",
    "contre indique",
    "contre indiquee",
    "eviter",
];
const MAJOR_SIGNALS: &[&str] = &[
    "major",
    "serious",
    "severe",
    "life threatening",
    "fatal",
    "grave",
    "serio",
    "seria",
    "mayor",
    "majeur",
    "majeure",
];
const MODERATE_SIGNALS: &[&str] = &["moderate", "moderado", "moderada", "modere", "moderee"];

const RAPID_SIGNALS: &[&str] = &[
    "rapid",
    "rapidly",
    "immediate",
    "immediately",
    "within hours",
    "quickly",
    "rapido",
    "rapida",
    "rapide",
];
const DELAYED_SIGNALS: &[&str] = &[
    "delayed",
    "days",
    "weeks",
    "gradual",
    "gradually",
    "tardio",
    "tardia",
    "retarde",
];

const MECHANISM_CUES: &[&str] = &[
    "inhibit",
    "induce",
    "increase",
    "decrease",
    "reduce",
    "additive",
    "mechanism",
    "metabolism",
    "compete",
];

static SENTENCE_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.;\n]+").unwrap());
static GENERIC_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)generic name:\s*([^.;\n]+)").unwrap());
static BRAND_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)brand names?:\s*([^.;\n]+)").unwrap());
static INGREDIENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)active ingredients?:\s*([^.;\n]+)").unwrap());
static CONTRAINDICATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contraindications?:\s*([^.;\n]+)").unwrap());
static THERAPEUTIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)therapeutic class:\s*([^.;\n]+)").unwrap());
static ROUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)route:\s*([^.;\n]+)").unwrap());
static MONITOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)monitor(?:ing)?(?:\s+of)?\s*:?\s*([^.;\n]+)").unwrap());
static LIST_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",|\band\b").unwrap());

/// Keyword-signal extractor over an expanded en/es/fr taxonomy
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordFieldExtractor;

impl KeywordFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    fn padded(text: &str) -> String {
        let folded: String = text
            .to_lowercase()
            .chars()
            .map(fold_char)
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        format!(" {} ", folded.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn has_any(padded: &str, signals: &[&str]) -> bool {
        signals
            .iter()
            .any(|s| padded.contains(&format!(" {} ", s)))
    }

    fn capture(re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn capture_list(re: &Regex, text: &str) -> Vec<String> {
        Self::capture(re, text)
            .map(|list| split_list(&list))
            .unwrap_or_default()
    }
}

fn split_list(list: &str) -> Vec<String> {
    LIST_SPLIT
        .split(list)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl FieldExtractor for KeywordFieldExtractor {
    fn severity(&self, text: &str) -> InteractionSeverity {
        let padded = Self::padded(text);
        if Self::has_any(&padded, CONTRAINDICATED_SIGNALS) {
            InteractionSeverity::Contraindicated
        } else if Self::has_any(&padded, MAJOR_SIGNALS) {
            InteractionSeverity::Major
        } else if Self::has_any(&padded, MODERATE_SIGNALS) {
            InteractionSeverity::Moderate
        } else {
            InteractionSeverity::Minor
        }
    }

    fn onset(&self, text: &str) -> Onset {
        let padded = Self::padded(text);
        if Self::has_any(&padded, RAPID_SIGNALS) {
            Onset::Rapid
        } else if Self::has_any(&padded, DELAYED_SIGNALS) {
            Onset::Delayed
        } else {
            Onset::Variable
        }
    }

    fn mechanism(&self, text: &str) -> String {
        let sentences: Vec<&str> = SENTENCE_SPLIT
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let chosen = sentences
            .iter()
            .find(|s| {
                let lower = s.to_lowercase();
                MECHANISM_CUES.iter().any(|cue| lower.contains(cue))
            })
            .or_else(|| sentences.first())
            .copied()
            .unwrap_or("");

        chosen.chars().take(200).collect()
    }

    fn monitoring_parameters(&self, text: &str) -> Vec<String> {
        let mut params = Vec::new();
        for caps in MONITOR.captures_iter(text) {
            if let Some(list) = caps.get(1) {
                for item in split_list(list.as_str()) {
                    if !params.contains(&item) {
                        params.push(item);
                    }
                }
            }
        }
        params
    }

    fn drug_record(&self, doc: &Document) -> Drug {
        let text = &doc.content;
        let generic_name = Self::capture(&GENERIC_NAME, text)
            .map(|g| lookup_key(&g))
            .unwrap_or_else(|| lookup_key(&doc.title));

        let therapeutic_class = Self::capture(&THERAPEUTIC_CLASS, text)
            .map(|c| lookup_key(&c))
            .unwrap_or_default();
        debug!(doc_id = %doc.id, generic_name = %generic_name, class = %therapeutic_class, "Drug record from retrieved text");

        Drug {
            id: format!("retrieved:{}", doc.id),
            name: doc.title.trim().to_string(),
            generic_name,
            brand_names: Self::capture_list(&BRAND_NAMES, text),
            active_ingredients: Self::capture_list(&INGREDIENTS, text),
            contraindications: Self::capture_list(&CONTRAINDICATIONS, text)
                .iter()
                .map(|c| lookup_key(c))
                .collect(),
            route: Self::capture(&ROUTE, text).unwrap_or_default(),
            therapeutic_class,
        }
    }

    fn mentions(&self, text: &str, term: &str) -> bool {
        let term = Self::padded(term);
        let term = term.trim();
        !term.is_empty() && Self::padded(text).contains(&format!(" {} ", term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::{DocumentCategory, DocumentMetadata, Language};

    #[test]
    fn test_severity_escalation() {
        let x = KeywordFieldExtractor::new();
        assert_eq!(
            x.severity("Combination is contraindicated; a serious reaction may occur."),
            InteractionSeverity::Contraindicated
        );
        assert_eq!(x.severity("Avoid this combination."), InteractionSeverity::Contraindicated);
        assert_eq!(x.severity("A serious bleeding risk."), InteractionSeverity::Major);
        assert_eq!(x.severity("Moderate interaction."), InteractionSeverity::Moderate);
        assert_eq!(x.severity("Slight change in absorption."), InteractionSeverity::Minor);
    }

    #[test]
    fn test_severity_non_english() {
        let x = KeywordFieldExtractor::new();
        assert_eq!(x.severity("Interacción grave con sangrado"), InteractionSeverity::Major);
        assert_eq!(x.severity("Association contre-indiquée"), InteractionSeverity::Contraindicated);
        assert_eq!(x.severity("Interacción moderada"), InteractionSeverity::Moderate);
    }

    #[test]
    fn test_avoid_is_whole_word() {
        let x = KeywordFieldExtractor::new();
        assert_eq!(x.severity("Patients avoided no doses"), InteractionSeverity::Minor);
    }

    #[test]
    fn test_onset() {
        let x = KeywordFieldExtractor::new();
        assert_eq!(x.onset("Effects appear rapidly"), Onset::Rapid);
        assert_eq!(x.onset("Develops over several days"), Onset::Delayed);
        assert_eq!(x.onset("Unclear timing"), Onset::Variable);
    }

    #[test]
    fn test_drug_record_from_monograph() {
        let doc = Document {
            id: "x1".to_string(),
            title: "Ketorolac".to_string(),
            content: "Generic name: Ketorolac. Brand names: Toradol, Sprix. Therapeutic class: NSAID. \
                      Contraindications: peptic ulcer, kidney disease."
                .to_string(),
            category: DocumentCategory::Drug,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "test".to_string(),
                author: None,
                published_date: None,
                tags: Vec::new(),
                reliability: 0.5,
            },
        };
        let drug = KeywordFieldExtractor::new().drug_record(&doc);
        assert_eq!(drug.generic_name, "ketorolac");
        assert_eq!(drug.brand_names, vec!["Toradol", "Sprix"]);
        assert_eq!(drug.therapeutic_class, "nsaid");
        assert_eq!(drug.contraindications, vec!["peptic ulcer", "kidney disease"]);
    }

    #[test]
    fn test_mechanism_and_monitoring() {
        let x = KeywordFieldExtractor::new();
        let text = "Use with care. Clarithromycin inhibits CYP3A4 metabolism. Monitor creatine kinase and muscle pain.";
        assert_eq!(x.mechanism(text), "Clarithromycin inhibits CYP3A4 metabolism");
        assert_eq!(x.monitoring_parameters(text), vec!["creatine kinase", "muscle pain"]);
    }

    #[test]
    fn test_mentions() {
        let x = KeywordFieldExtractor::new();
        assert!(x.mentions("Aspirin and Warfarin together", "warfarin"));
        assert!(!x.mentions("Aspirinate", "aspirin"));
        assert!(!x.mentions("anything", ""));
    }
}
