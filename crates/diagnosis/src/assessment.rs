//! Red flags, risk scoring, confidence and recommendations for a ranked differential.

use std::collections::HashSet;

use extract::TextNormalizer;
use extract::lexicon::fold_char;
use knowledge::{Language, PatientProfile, Symptom, SymptomSeverity, Urgency, UrgencyLevel};

use crate::model::{
    DiagnosedCondition, DiagnosisRecommendations, DiagnosisRisk, RedFlag, RedFlagReason, RiskLevel,
    SymptomMatch,
};

/// Symptoms that always call for emergency care, per language (diacritics folded)
fn critical_symptoms(language: Language) -> &'static [&'static str] {
    match language {
        Language::Es => &[
            "dolor de pecho",
            "dolor toracico",
            "dificultad para respirar",
            "rigidez de nuca",
            "confusion",
            "perdida de conocimiento",
            "desmayo",
            "convulsiones",
            "sangrado abundante",
            "debilidad repentina",
            "dificultad para hablar",
            "tos con sangre",
        ],
        Language::Fr => &[
            "douleur thoracique",
            "difficulte a respirer",
            "raideur de la nuque",
            "confusion",
            "perte de connaissance",
            "convulsions",
            "saignement abondant",
        ],
        _ => &[
            "chest pain",
            "difficulty breathing",
            "shortness of breath",
            "stiff neck",
            "confusion",
            "loss of consciousness",
            "fainting",
            "seizure",
            "severe bleeding",
            "sudden weakness",
            "slurred speech",
            "coughing blood",
            "suicidal thoughts",
        ],
    }
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(fold_char)
        .collect()
}

fn is_critical(normalizer: &TextNormalizer, matched: &SymptomMatch, language: Language) -> bool {
    let input = fold(&matched.input);
    if critical_symptoms(language).contains(&input.as_str()) {
        return true;
    }
    critical_symptoms(Language::En)
        .iter()
        .any(|c| normalizer.canonical_term(c, Language::En) == matched.canonical)
}

/// Scan symptoms and primary conditions; returns the flags and the escalated urgency
pub fn red_flags(
    normalizer: &TextNormalizer,
    symptoms: &[Symptom],
    matches: &[SymptomMatch],
    primary: &[DiagnosedCondition],
    language: Language,
) -> (Vec<RedFlag>, Urgency) {
    let mut flags = Vec::new();

    for (symptom, matched) in symptoms.iter().zip(matches) {
        if is_critical(normalizer, matched, language) {
            flags.push(RedFlag {
                subject: symptom.name.clone(),
                reason: RedFlagReason::CriticalSymptom,
                urgency: Urgency::Immediate,
            });
        } else if symptom.severity >= SymptomSeverity::Severe {
            flags.push(RedFlag {
                subject: symptom.name.clone(),
                reason: RedFlagReason::SevereSymptom,
                urgency: Urgency::Urgent,
            });
        }
    }

    for diagnosed in primary {
        let condition = &diagnosed.condition;
        if condition.is_emergency() {
            flags.push(RedFlag {
                subject: condition.name.clone(),
                reason: RedFlagReason::EmergencyCondition,
                urgency: Urgency::Immediate,
            });
        } else if condition.urgency_level >= UrgencyLevel::High {
            let urgency = if condition.urgency_level == UrgencyLevel::Critical {
                Urgency::Immediate
            } else {
                Urgency::Urgent
            };
            flags.push(RedFlag {
                subject: condition.name.clone(),
                reason: RedFlagReason::HighUrgencyCondition,
                urgency,
            });
        }
    }

    let urgency = flags
        .iter()
        .map(|f| f.urgency)
        .max()
        .unwrap_or_default();
    (flags, urgency)
}

pub fn risk(
    symptoms: &[Symptom],
    primary: &[DiagnosedCondition],
    profile: Option<&PatientProfile>,
) -> DiagnosisRisk {
    let avg_severity = if symptoms.is_empty() {
        0.0
    } else {
        symptoms.iter().map(|s| s.severity.score() as f64).sum::<f64>() / symptoms.len() as f64
    };
    let emergencies = primary.iter().filter(|d| d.condition.is_emergency()).count();

    let mut score = 10.0 * avg_severity + 20.0 * emergencies as f64;
    if let Some(profile) = profile {
        if profile.is_elderly() {
            score += 10.0;
        }
        if profile.medical_history.len() > 3 {
            score += 5.0;
        }
        if profile.smoking {
            score += 5.0;
        }
    }

    let score = score.min(100.0);
    DiagnosisRisk {
        score,
        level: RiskLevel::from_score(score),
    }
}

/// Fewer, more urgent primary candidates give higher confidence; none gives 0
pub fn confidence(primary: &[DiagnosedCondition]) -> f64 {
    if primary.is_empty() {
        return 0.0;
    }
    let avg_urgency = primary
        .iter()
        .map(|d| d.condition.urgency_level.level() as f64)
        .sum::<f64>()
        / primary.len() as f64;
    0.7 * (1.0 / primary.len() as f64) + 0.3 * (avg_urgency / 4.0)
}

fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, item: &str) {
    if seen.insert(item.to_lowercase()) {
        list.push(item.to_string());
    }
}

pub fn recommendations(
    urgency: Urgency,
    primary: &[DiagnosedCondition],
    language: Language,
) -> DiagnosisRecommendations {
    let spanish = language == Language::Es;
    let mut out = DiagnosisRecommendations::default();

    match urgency {
        Urgency::Immediate => out.immediate.push(if spanish {
            "Busque atención médica de emergencia de inmediato.".to_string()
        } else {
            "Seek emergency medical care immediately.".to_string()
        }),
        Urgency::Urgent => out.immediate.push(if spanish {
            "Contacte a un profesional sanitario hoy mismo.".to_string()
        } else {
            "Contact a healthcare provider today.".to_string()
        }),
        Urgency::Routine => out.general.push(if spanish {
            "Consulte a un profesional sanitario si los síntomas persisten o empeoran.".to_string()
        } else {
            "Consult a healthcare provider if symptoms persist or worsen.".to_string()
        }),
    }

    let mut seen_tests = HashSet::new();
    let mut seen_specialists = HashSet::new();
    let mut seen_monitoring = HashSet::new();
    for diagnosed in primary {
        let condition = &diagnosed.condition;
        for test in &condition.recommended_tests {
            push_unique(&mut out.tests, &mut seen_tests, test);
        }
        for specialist in &condition.specialists {
            push_unique(&mut out.specialists, &mut seen_specialists, specialist);
        }
        for item in &condition.monitoring {
            push_unique(&mut out.monitoring, &mut seen_monitoring, item);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::seed::seed_catalogues;

    fn diagnosed(id: &str) -> DiagnosedCondition {
        DiagnosedCondition {
            condition: seed_catalogues().find_condition(id).cloned().unwrap(),
            score: 1.0,
            likelihood: 0.5,
            sources: Vec::new(),
            matched_symptoms: Vec::new(),
        }
    }

    fn matched(normalizer: &TextNormalizer, name: &str, language: Language) -> SymptomMatch {
        SymptomMatch {
            input: name.to_string(),
            matched: name.to_string(),
            canonical: normalizer.canonical_term(name, language),
            verified: true,
        }
    }

    #[test]
    fn test_critical_symptom_in_spanish_is_immediate() {
        let normalizer = TextNormalizer::default();
        let symptoms = vec![Symptom::new("Dolor de pecho", SymptomSeverity::Mild)];
        let matches = vec![matched(&normalizer, "Dolor de pecho", Language::Es)];
        let (flags, urgency) = red_flags(&normalizer, &symptoms, &matches, &[], Language::Es);
        assert_eq!(urgency, Urgency::Immediate);
        assert_eq!(flags[0].reason, RedFlagReason::CriticalSymptom);
    }

    #[test]
    fn test_severe_symptom_and_high_urgency_condition_are_urgent() {
        let normalizer = TextNormalizer::default();
        let symptoms = vec![Symptom::new("cough", SymptomSeverity::Severe)];
        let matches = vec![matched(&normalizer, "cough", Language::En)];
        let (flags, urgency) = red_flags(
            &normalizer,
            &symptoms,
            &matches,
            &[diagnosed("pneumonia")],
            Language::En,
        );
        assert_eq!(urgency, Urgency::Urgent);
        assert_eq!(flags.len(), 2);

        let (_, routine) = red_flags(&normalizer, &[], &[], &[diagnosed("influenza")], Language::En);
        assert_eq!(routine, Urgency::Routine);
    }

    #[test]
    fn test_risk_score_and_buckets() {
        let symptoms = vec![
            Symptom::new("chest pain", SymptomSeverity::Critical),
            Symptom::new("sweating", SymptomSeverity::Severe),
        ];
        let profile = PatientProfile {
            age: Some(72),
            smoking: true,
            medical_history: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Default::default()
        };
        // 10 * 3.5 + 20 + 10 + 5 + 5
        let risk = risk(&symptoms, &[diagnosed("myocardial-infarction")], Some(&profile));
        assert!((risk.score - 75.0).abs() < 1e-9);
        assert_eq!(risk.level, RiskLevel::High);

        assert_eq!(RiskLevel::from_score(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Critical);
    }

    #[test]
    fn test_confidence_prefers_few_urgent_candidates() {
        assert_eq!(confidence(&[]), 0.0);
        let single = confidence(&[diagnosed("meningitis")]);
        let several = confidence(&[diagnosed("influenza"), diagnosed("common-cold")]);
        assert!((single - 1.0).abs() < 1e-9);
        assert!(single > several);
    }

    #[test]
    fn test_recommendations_deduplicate() {
        let recs = recommendations(
            Urgency::Routine,
            &[diagnosed("influenza"), diagnosed("covid-19")],
            Language::En,
        );
        assert!(recs.immediate.is_empty());
        assert_eq!(recs.general.len(), 1);
        let pcp = recs
            .specialists
            .iter()
            .filter(|s| s.as_str() == "primary care physician")
            .count();
        assert_eq!(pcp, 1);
        assert!(recs.monitoring.contains(&"body temperature".to_string()));
    }
}
