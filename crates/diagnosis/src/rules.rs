//! Diagnostic rule evaluation and symptom cluster matching. Pure and synchronous.

use std::collections::HashSet;

use extract::TextNormalizer;
use knowledge::{Catalogues, DiagnosticRule, Language, PatientProfile, SymptomCluster, lookup_key};

use crate::error::RuleError;
use crate::model::ClusterMatch;

const AGE_MISMATCH_FACTOR: f64 = 0.5;
const GENDER_MISMATCH_FACTOR: f64 = 0.7;
const RISK_FACTOR_BONUS: f64 = 0.5;

/// Canonical symptom keys present in one request
#[derive(Debug, Clone, Default)]
pub struct PresentSymptoms {
    keys: HashSet<String>,
    normalizer: TextNormalizer,
}

impl PresentSymptoms {
    pub fn new(normalizer: TextNormalizer, canonical: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: canonical.into_iter().filter(|k| !k.is_empty()).collect(),
            normalizer,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Catalogue symptom names are English
    pub fn contains(&self, catalogue_name: &str) -> bool {
        self.keys
            .contains(&self.normalizer.canonical_term(catalogue_name, Language::En))
    }

    fn matching<'a>(&self, names: &'a [String]) -> Vec<&'a String> {
        names.iter().filter(|n| self.contains(n)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Fired { score: f64, matched: Vec<String> },
    /// An excluding symptom matched while the rule was otherwise relevant
    Excluded { excluding: Vec<String> },
    NotFired,
}

pub fn validate(rule: &DiagnosticRule, catalogues: &Catalogues) -> Result<(), RuleError> {
    if rule.condition_id.trim().is_empty() {
        return Err(RuleError::MissingCondition {
            rule: rule.id.clone(),
        });
    }
    if catalogues.find_condition(&rule.condition_id).is_none() {
        return Err(RuleError::UnknownCondition {
            rule: rule.id.clone(),
            condition: rule.condition_id.clone(),
        });
    }
    if !rule.confidence_weight.is_finite() || rule.confidence_weight < 0.0 {
        return Err(RuleError::InvalidWeight {
            rule: rule.id.clone(),
            weight: rule.confidence_weight,
        });
    }
    if rule.required_symptoms.is_empty() && rule.optional_symptoms.is_empty() {
        return Err(RuleError::NoSymptoms {
            rule: rule.id.clone(),
        });
    }
    if let Some(range) = rule.age_range {
        if range.min > range.max {
            return Err(RuleError::InvalidAgeRange {
                rule: rule.id.clone(),
                min: range.min,
                max: range.max,
            });
        }
    }
    Ok(())
}

pub fn evaluate(
    rule: &DiagnosticRule,
    present: &PresentSymptoms,
    profile: Option<&PatientProfile>,
) -> RuleOutcome {
    let required = present.matching(&rule.required_symptoms);
    let optional = present.matching(&rule.optional_symptoms);
    let excluding = present.matching(&rule.excluding_symptoms);

    if !excluding.is_empty() {
        if required.is_empty() && optional.is_empty() {
            return RuleOutcome::NotFired;
        }
        return RuleOutcome::Excluded {
            excluding: excluding.into_iter().cloned().collect(),
        };
    }

    if required.len() < rule.required_symptoms.len() {
        return RuleOutcome::NotFired;
    }
    if required.len() + optional.len() < rule.minimum_symptoms {
        return RuleOutcome::NotFired;
    }

    let mut score = (2 * required.len() + optional.len()) as f64 * rule.confidence_weight;

    if let Some(profile) = profile {
        if let (Some(range), Some(age)) = (rule.age_range, profile.age) {
            if !range.contains(age) {
                score *= AGE_MISMATCH_FACTOR;
            }
        }
        if let (Some(expected), Some(gender)) = (rule.gender, profile.gender) {
            if expected != gender {
                score *= GENDER_MISMATCH_FACTOR;
            }
        }
        score += RISK_FACTOR_BONUS * matched_risk_factors(rule, profile) as f64;
    }

    RuleOutcome::Fired {
        score,
        matched: required.into_iter().chain(optional).cloned().collect(),
    }
}

/// Rule risk factors found anywhere in the patient's history
fn matched_risk_factors(rule: &DiagnosticRule, profile: &PatientProfile) -> usize {
    let history: HashSet<String> = profile
        .risk_factors
        .iter()
        .chain(profile.all_conditions())
        .map(|h| lookup_key(h))
        .collect();

    rule.risk_factors
        .iter()
        .filter(|rf| history.contains(&lookup_key(rf)))
        .count()
}

/// Clusters with at least two of their symptoms present
pub fn match_clusters(clusters: &[SymptomCluster], present: &PresentSymptoms) -> Vec<ClusterMatch> {
    clusters
        .iter()
        .filter(|c| !c.symptoms.is_empty())
        .filter_map(|cluster| {
            let matched: Vec<String> = present.matching(&cluster.symptoms).into_iter().cloned().collect();
            (matched.len() >= 2).then(|| ClusterMatch {
                cluster_id: cluster.id.clone(),
                name: cluster.name.clone(),
                confidence: matched.len() as f64 / cluster.symptoms.len() as f64,
                matched_symptoms: matched,
            })
        })
        .collect()
}
