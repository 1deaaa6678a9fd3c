use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use index::{RetrievalError, ScoredDocument};
use knowledge::{
    Catalogues, ConditionCategory, DocumentCategory, Language, MedicalCondition, PatientProfile,
    Symptom, Urgency, UrgencyLevel, disclaimer,
};
use query::HybridSearchEngine;

use crate::assessment;
use crate::model::{
    DiagnosedCondition, DiagnosisRecommendations, DiagnosisResult, DiagnosisRisk, EvidenceSource,
    RiskLevel, RuledOutCondition, SymptomMatch,
};
use crate::rules::{self, PresentSymptoms, RuleOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisSettings {
    /// Minimum retrieval score for mapping a symptom name onto a catalogue symptom
    pub symptom_lookup_threshold: f64,
    /// Minimum retrieval score for a semantically matched condition
    pub semantic_threshold: f64,
    pub semantic_limit: usize,
    pub primary_size: usize,
    pub secondary_size: usize,
    pub rule_weight: f64,
    pub semantic_weight: f64,
    pub cluster_weight: f64,
    /// Applied to diagnostic confidence when retrieval was unavailable
    pub degraded_confidence_factor: f64,
}

impl Default for DiagnosisSettings {
    fn default() -> Self {
        Self {
            symptom_lookup_threshold: 0.8,
            semantic_threshold: 0.6,
            semantic_limit: 10,
            primary_size: 5,
            secondary_size: 5,
            rule_weight: 1.0,
            semantic_weight: 1.0,
            cluster_weight: 1.0,
            degraded_confidence_factor: 0.75,
        }
    }
}

/// Accumulated evidence for one condition
struct Candidate {
    condition: MedicalCondition,
    score: f64,
    sources: Vec<EvidenceSource>,
    matched: Vec<String>,
}

impl Candidate {
    fn add(&mut self, source: EvidenceSource, score: f64, matched: &[String]) {
        self.score += score;
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        for symptom in matched {
            if !self.matched.contains(symptom) {
                self.matched.push(symptom.clone());
            }
        }
    }
}

#[derive(Default)]
struct Evidence {
    by_id: HashMap<String, Candidate>,
}

impl Evidence {
    fn add(&mut self, condition: &MedicalCondition, source: EvidenceSource, score: f64, matched: &[String]) {
        self.by_id
            .entry(condition.id.clone())
            .or_insert_with(|| Candidate {
                condition: condition.clone(),
                score: 0.0,
                sources: Vec::new(),
                matched: Vec::new(),
            })
            .add(source, score, matched);
    }
}

/// Differential diagnosis over rules, symptom clusters and semantic retrieval
#[derive(Clone)]
pub struct DiagnosisEngine {
    search: HybridSearchEngine,
    settings: DiagnosisSettings,
}

impl DiagnosisEngine {
    pub fn new(search: HybridSearchEngine, settings: DiagnosisSettings) -> Self {
        Self { search, settings }
    }

    #[tracing::instrument(skip_all, fields(symptoms = symptoms.len(), language = language.code()))]
    pub async fn analyze(
        &self,
        symptoms: &[Symptom],
        profile: Option<&PatientProfile>,
        language: Language,
    ) -> DiagnosisResult {
        let catalogues = self.search.store().snapshot();

        if symptoms.is_empty() {
            return self.empty_result(&catalogues, language);
        }

        let mut degraded = false;

        // Step 1: Normalize symptom names
        let matches = self.normalize_symptoms(symptoms, language, &mut degraded).await;
        let present = PresentSymptoms::new(
            *self.search.normalizer(),
            matches.iter().map(|m| m.canonical.clone()),
        );

        // Step 2: Symptom clusters
        let clusters = rules::match_clusters(catalogues.clusters(), &present);

        // Step 3: Diagnostic rules
        let mut evidence = Evidence::default();
        let mut ruled_out: Vec<RuledOutCondition> = Vec::new();
        for rule in catalogues.rules() {
            if let Err(e) = rules::validate(rule, &catalogues) {
                warn!(rule = %rule.id, error = %e, "Skipping malformed diagnostic rule");
                continue;
            }
            let Some(condition) = catalogues.find_condition(&rule.condition_id) else {
                continue;
            };
            match rules::evaluate(rule, &present, profile) {
                RuleOutcome::Fired { score, matched } => {
                    debug!(rule = %rule.id, score, "Rule fired");
                    evidence.add(condition, EvidenceSource::Rule, score * self.settings.rule_weight, &matched);
                }
                RuleOutcome::Excluded { excluding } => {
                    if !ruled_out.iter().any(|r| r.condition_id == condition.id) {
                        ruled_out.push(RuledOutCondition {
                            condition_id: condition.id.clone(),
                            name: condition.name.clone(),
                            excluding_symptoms: excluding,
                        });
                    }
                }
                RuleOutcome::NotFired => {}
            }
        }

        for cluster in &clusters {
            let Some(source) = catalogues.clusters().iter().find(|c| c.id == cluster.cluster_id) else {
                continue;
            };
            for id in &source.related_conditions {
                if let Some(condition) = catalogues.find_condition(id) {
                    evidence.add(
                        condition,
                        EvidenceSource::Cluster,
                        cluster.confidence * self.settings.cluster_weight,
                        &cluster.matched_symptoms,
                    );
                }
            }
        }

        // Step 4: Semantic fallback, always run
        let text = matches
            .iter()
            .map(|m| m.matched.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match self
            .search
            .retrieve(
                &text,
                language,
                &[DocumentCategory::Disease],
                self.settings.semantic_limit,
                self.settings.semantic_threshold,
            )
            .await
        {
            Ok(hits) => {
                for hit in hits {
                    let condition = condition_for(&catalogues, &hit);
                    evidence.add(
                        &condition,
                        EvidenceSource::Semantic,
                        hit.score * self.settings.semantic_weight,
                        &[],
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Semantic condition search unavailable, using rules only");
                degraded = true;
            }
        }

        // Step 5: Merge and split
        let (primary, secondary) = self.rank(evidence);

        // Step 6-9: Assessment
        let normalizer = self.search.normalizer();
        let (red_flags, urgency) =
            assessment::red_flags(normalizer, symptoms, &matches, &primary, language);
        let risk = assessment::risk(symptoms, &primary, profile);
        let mut diagnostic_confidence = assessment::confidence(&primary);
        if degraded {
            diagnostic_confidence *= self.settings.degraded_confidence_factor;
        }
        let recommendations = assessment::recommendations(urgency, &primary, language);

        info!(
            primary = primary.len(),
            secondary = secondary.len(),
            urgency = ?urgency,
            degraded,
            "Diagnosis complete"
        );

        DiagnosisResult {
            symptoms: matches,
            clusters,
            primary_conditions: primary,
            secondary_conditions: secondary,
            ruled_out,
            red_flags,
            urgency,
            risk,
            diagnostic_confidence,
            recommendations,
            disclaimer: disclaimer(language).to_string(),
            degraded,
            catalogue_version: catalogues.version().to_string(),
        }
    }

    async fn normalize_symptoms(
        &self,
        symptoms: &[Symptom],
        language: Language,
        degraded: &mut bool,
    ) -> Vec<SymptomMatch> {
        let mut lookups = Vec::with_capacity(symptoms.len());
        for symptom in symptoms {
            lookups.push(self.lookup_symptom(symptom, language));
        }

        let normalizer = self.search.normalizer();
        join_all(lookups)
            .await
            .into_iter()
            .map(|(symptom, symptom_language, result)| match result {
                Ok(Some(hit)) => SymptomMatch {
                    input: symptom.name.clone(),
                    canonical: normalizer.canonical_term(&hit.document.title, hit.document.language),
                    matched: hit.document.title,
                    verified: true,
                },
                Ok(None) => SymptomMatch {
                    input: symptom.name.clone(),
                    matched: symptom.name.clone(),
                    canonical: normalizer.canonical_term(&symptom.name, symptom_language),
                    verified: false,
                },
                Err(e) => {
                    warn!(symptom = %symptom.name, error = %e, "Symptom lookup unavailable");
                    *degraded = true;
                    SymptomMatch {
                        input: symptom.name.clone(),
                        matched: symptom.name.clone(),
                        canonical: normalizer.canonical_term(&symptom.name, symptom_language),
                        verified: false,
                    }
                }
            })
            .collect()
    }

    async fn lookup_symptom<'a>(
        &self,
        symptom: &'a Symptom,
        language: Language,
    ) -> (&'a Symptom, Language, Result<Option<ScoredDocument>, RetrievalError>) {
        let symptom_language = if symptom.language == Language::Unknown {
            language
        } else {
            symptom.language
        };
        let result = self
            .search
            .lookup(
                &symptom.name,
                symptom_language,
                &[DocumentCategory::Symptom],
                self.settings.symptom_lookup_threshold,
            )
            .await;
        (symptom, symptom_language, result)
    }

    /// An excluded rule only withholds its own score; other evidence for the
    /// same condition still ranks.
    fn rank(&self, evidence: Evidence) -> (Vec<DiagnosedCondition>, Vec<DiagnosedCondition>) {
        let mut candidates: Vec<Candidate> = evidence
            .by_id
            .into_values()
            .filter(|c| c.score > 0.0)
            .collect();

        // Score, then urgency, then id keeps the order independent of map iteration
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.condition.urgency_level.cmp(&a.condition.urgency_level))
                .then(a.condition.id.cmp(&b.condition.id))
        });

        let total: f64 = candidates.iter().map(|c| c.score).sum();
        let mut diagnosed = candidates.into_iter().map(|c| DiagnosedCondition {
            likelihood: if total > 0.0 { c.score / total } else { 0.0 },
            condition: c.condition,
            score: c.score,
            sources: c.sources,
            matched_symptoms: c.matched,
        });

        let primary: Vec<_> = diagnosed.by_ref().take(self.settings.primary_size).collect();
        let secondary: Vec<_> = diagnosed.take(self.settings.secondary_size).collect();
        (primary, secondary)
    }

    fn empty_result(&self, catalogues: &Catalogues, language: Language) -> DiagnosisResult {
        DiagnosisResult {
            symptoms: Vec::new(),
            clusters: Vec::new(),
            primary_conditions: Vec::new(),
            secondary_conditions: Vec::new(),
            ruled_out: Vec::new(),
            red_flags: Vec::new(),
            urgency: Urgency::Routine,
            risk: DiagnosisRisk {
                score: 0.0,
                level: RiskLevel::Low,
            },
            diagnostic_confidence: 0.0,
            recommendations: DiagnosisRecommendations::default(),
            disclaimer: disclaimer(language).to_string(),
            degraded: false,
            catalogue_version: catalogues.version().to_string(),
        }
    }
}

/// Catalogue condition for a retrieved document, or a minimal record built from it
fn condition_for(catalogues: &Catalogues, hit: &ScoredDocument) -> MedicalCondition {
    let doc = &hit.document;
    catalogues
        .find_condition(&doc.id)
        .or_else(|| catalogues.find_condition(&doc.title))
        .cloned()
        .unwrap_or_else(|| MedicalCondition {
            id: doc.id.clone(),
            name: doc.title.clone(),
            category: ConditionCategory::Routine,
            common_symptoms: Vec::new(),
            risk_factors: Vec::new(),
            prevalence: 0.0,
            urgency_level: UrgencyLevel::Low,
            recommended_tests: Vec::new(),
            specialists: Vec::new(),
            monitoring: Vec::new(),
        })
}
