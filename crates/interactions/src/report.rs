//! Alerts, risk aggregation, safety classification and recommendations.

use std::collections::HashSet;
use uuid::Uuid;

use knowledge::{
    Catalogues, Interaction, InteractionKind, InteractionSeverity, Language, PatientProfile,
    Urgency, lookup_key,
};

use crate::model::{
    Alternative, InteractionAlert, InteractionRecommendations, ResolvedDrug, RiskBreakdown,
    RiskScore, SafetyLevel, SafetyProfile,
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RiskMultipliers {
    pub elderly_drug_drug: f64,
    pub elderly_drug_condition: f64,
    pub organ_impairment_drug_drug: f64,
}

impl Default for RiskMultipliers {
    fn default() -> Self {
        Self {
            elderly_drug_drug: 1.2,
            elderly_drug_condition: 1.3,
            organ_impairment_drug_drug: 1.3,
        }
    }
}

fn kind_label(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::DrugDrug => "drug-drug",
        InteractionKind::DrugFood => "drug-food",
        InteractionKind::DrugCondition => "drug-condition",
        InteractionKind::DrugAllergy => "drug-allergy",
    }
}

pub fn urgency_for(severity: InteractionSeverity) -> Urgency {
    match severity {
        InteractionSeverity::Contraindicated => Urgency::Immediate,
        InteractionSeverity::Major => Urgency::Urgent,
        _ => Urgency::Routine,
    }
}

/// One alert per interaction, most severe first
pub fn alerts(interactions: &[Interaction]) -> Vec<InteractionAlert> {
    let mut alerts: Vec<InteractionAlert> = interactions
        .iter()
        .map(|i| {
            let identity = format!("{}|{}|{}", kind_label(i.kind), i.key(), i.severity.as_str());
            InteractionAlert {
                id: Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes()).to_string(),
                kind: i.kind,
                severity: i.severity,
                urgency: urgency_for(i.severity),
                title: format!(
                    "{} {} interaction: {} + {}",
                    capitalize(i.severity.as_str()),
                    kind_label(i.kind),
                    i.drug1,
                    i.drug2
                ),
                message: if i.description.is_empty() {
                    i.mechanism.clone()
                } else {
                    i.description.clone()
                },
                subjects: vec![i.drug1.clone(), i.drug2.clone()],
                dismissible: i.severity != InteractionSeverity::Contraindicated,
            }
        })
        .collect();

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn risk_score(
    interactions: &[Interaction],
    profile: Option<&PatientProfile>,
    multipliers: &RiskMultipliers,
) -> RiskScore {
    let mut breakdown = RiskBreakdown::default();
    for interaction in interactions {
        let slot = breakdown.get_mut(interaction.kind);
        *slot = slot.max(interaction.severity.weight());
    }

    if let Some(profile) = profile {
        if profile.is_elderly() {
            breakdown.drug_drug *= multipliers.elderly_drug_drug;
            breakdown.drug_condition *= multipliers.elderly_drug_condition;
        }
        if profile.kidney_function.is_impaired() || profile.liver_function.is_impaired() {
            breakdown.drug_drug *= multipliers.organ_impairment_drug_drug;
        }
    }

    for kind in [
        InteractionKind::DrugDrug,
        InteractionKind::DrugFood,
        InteractionKind::DrugCondition,
        InteractionKind::DrugAllergy,
    ] {
        let slot = breakdown.get_mut(kind);
        *slot = slot.min(100.0);
    }

    RiskScore {
        overall: breakdown.max().min(100.0),
        breakdown,
    }
}

pub fn safety_profile(
    interactions: &[Interaction],
    risk: &RiskScore,
    drugs: &[ResolvedDrug],
    profile: Option<&PatientProfile>,
) -> SafetyProfile {
    let worst = interactions.iter().map(|i| i.severity).max();

    let level = if worst == Some(InteractionSeverity::Contraindicated) {
        SafetyLevel::Contraindicated
    } else if worst == Some(InteractionSeverity::Major) || risk.overall >= 75.0 {
        SafetyLevel::Warning
    } else if worst == Some(InteractionSeverity::Moderate) || risk.overall >= 50.0 {
        SafetyLevel::Caution
    } else {
        SafetyLevel::Safe
    };

    let mut factors = Vec::new();
    for interaction in interactions {
        if interaction.severity >= InteractionSeverity::Moderate {
            factors.push(format!(
                "{} {} interaction: {} + {}",
                interaction.severity.as_str(),
                kind_label(interaction.kind),
                interaction.drug1,
                interaction.drug2
            ));
        }
    }
    if let Some(profile) = profile {
        if profile.is_elderly() {
            factors.push("patient older than 65".to_string());
        }
        if profile.kidney_function.is_impaired() {
            factors.push("impaired kidney function".to_string());
        }
        if profile.liver_function.is_impaired() {
            factors.push("impaired liver function".to_string());
        }
    }
    for drug in drugs.iter().filter(|d| !d.verified()) {
        factors.push(format!("unverified drug: {}", drug.input));
    }

    SafetyProfile { level, factors }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Avoidance, consult and monitoring advice. Alternatives are filled in separately.
pub fn recommendations(interactions: &[Interaction], language: Language) -> InteractionRecommendations {
    let spanish = language == Language::Es;
    let mut recs = InteractionRecommendations::default();

    for interaction in interactions {
        let (a, b) = (&interaction.drug1, &interaction.drug2);
        match (interaction.severity, interaction.kind) {
            (InteractionSeverity::Contraindicated, InteractionKind::DrugAllergy) => push_unique(
                &mut recs.immediate,
                if spanish {
                    format!("No tome {}: alergia declarada a {}.", a, b)
                } else {
                    format!("Do not take {}: declared allergy to {}.", a, b)
                },
            ),
            (InteractionSeverity::Contraindicated, InteractionKind::DrugDrug) => push_unique(
                &mut recs.immediate,
                if spanish {
                    format!("Evite combinar {} y {}; contacte a su médico antes de la próxima dosis.", a, b)
                } else {
                    format!("Avoid combining {} and {}; contact your prescriber before the next dose.", a, b)
                },
            ),
            (InteractionSeverity::Contraindicated, _) => push_unique(
                &mut recs.immediate,
                if spanish {
                    format!("Evite {} con {}.", a, b)
                } else {
                    format!("Avoid {} with {}.", a, b)
                },
            ),
            (InteractionSeverity::Major, _) => push_unique(
                &mut recs.consult,
                if spanish {
                    format!("Consulte a su profesional sanitario sobre {} y {}.", a, b)
                } else {
                    format!("Consult your healthcare provider about {} and {}.", a, b)
                },
            ),
            _ => {}
        }

        for parameter in &interaction.monitoring_parameters {
            push_unique(&mut recs.monitoring, parameter.clone());
        }
    }

    recs
}

/// Drugs taking part in any contraindicated interaction, in first-seen order
pub fn contraindicated_drugs<'a>(
    interactions: &[Interaction],
    drugs: &'a [ResolvedDrug],
) -> Vec<&'a ResolvedDrug> {
    let mut involved: Vec<&ResolvedDrug> = Vec::new();
    for interaction in interactions
        .iter()
        .filter(|i| i.severity == InteractionSeverity::Contraindicated)
    {
        let members: Vec<&String> = match interaction.kind {
            InteractionKind::DrugDrug => vec![&interaction.drug1, &interaction.drug2],
            _ => vec![&interaction.drug1],
        };
        for name in members {
            if let Some(drug) = drugs.iter().find(|d| d.drug.matches_name(name)) {
                if !involved.iter().any(|d| d.drug.id == drug.drug.id) {
                    involved.push(drug);
                }
            }
        }
    }
    involved
}

/// Same-class catalogue drugs that are not already prescribed, not part of a
/// contraindication, and not cross-reactive with a declared allergy.
pub fn catalogue_alternatives(
    catalogues: &Catalogues,
    replace: &ResolvedDrug,
    prescribed: &[ResolvedDrug],
    excluded: &HashSet<String>,
    limit: usize,
) -> Alternative {
    let class = lookup_key(&replace.drug.therapeutic_class);
    let candidates = if class.is_empty() {
        Vec::new()
    } else {
        catalogues
            .drugs()
            .iter()
            .filter(|d| lookup_key(&d.therapeutic_class) == class)
            .filter(|d| d.id != replace.drug.id)
            .filter(|d| !prescribed.iter().any(|p| p.drug.id == d.id))
            .filter(|d| !excluded.contains(&lookup_key(&d.generic_name)))
            .take(limit)
            .map(|d| d.name.clone())
            .collect()
    };

    Alternative {
        replaces: replace.drug.name.clone(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::{InteractionSource, ManagementStrategy, OrganFunction, Onset};

    fn interaction(kind: InteractionKind, a: &str, b: &str, severity: InteractionSeverity) -> Interaction {
        Interaction {
            kind,
            drug1: a.to_string(),
            drug2: b.to_string(),
            severity,
            mechanism: "m".to_string(),
            onset: Onset::Variable,
            probability: 0.5,
            clinical_significance: 5.0,
            management: ManagementStrategy::default(),
            monitoring_parameters: vec!["INR".to_string()],
            description: String::new(),
            source: InteractionSource::Catalogue,
        }
    }

    #[test]
    fn test_alerts_sorted_and_dismissible() {
        let interactions = vec![
            interaction(InteractionKind::DrugFood, "warfarin", "alcohol", InteractionSeverity::Moderate),
            interaction(InteractionKind::DrugDrug, "warfarin", "apixaban", InteractionSeverity::Contraindicated),
        ];
        let alerts = alerts(&interactions);
        assert_eq!(alerts[0].severity, InteractionSeverity::Contraindicated);
        assert_eq!(alerts[0].urgency, Urgency::Immediate);
        assert!(!alerts[0].dismissible);
        assert!(alerts[1].dismissible);
        assert_ne!(alerts[0].id, alerts[1].id);

        let again = super::alerts(&interactions);
        assert_eq!(alerts[0].id, again[0].id);
    }

    #[test]
    fn test_risk_multipliers() {
        let interactions = vec![
            interaction(InteractionKind::DrugDrug, "a", "b", InteractionSeverity::Moderate),
            interaction(InteractionKind::DrugCondition, "a", "x", InteractionSeverity::Major),
        ];
        let profile = PatientProfile {
            age: Some(80),
            kidney_function: OrganFunction::Moderate,
            ..Default::default()
        };
        let risk = risk_score(&interactions, Some(&profile), &RiskMultipliers::default());
        assert!((risk.breakdown.drug_drug - 50.0 * 1.2 * 1.3).abs() < 1e-9);
        assert!((risk.breakdown.drug_condition - 97.5).abs() < 1e-9);
        assert!((risk.overall - 97.5).abs() < 1e-9);

        let plain = risk_score(&interactions, None, &RiskMultipliers::default());
        assert_eq!(plain.overall, 75.0);
    }

    #[test]
    fn test_safety_levels() {
        let none = RiskScore::default();
        assert_eq!(safety_profile(&[], &none, &[], None).level, SafetyLevel::Safe);

        let minor = vec![interaction(InteractionKind::DrugDrug, "a", "b", InteractionSeverity::Minor)];
        let risk = risk_score(&minor, None, &RiskMultipliers::default());
        assert_eq!(safety_profile(&minor, &risk, &[], None).level, SafetyLevel::Safe);

        // Multipliers alone can push a minor interaction into caution
        let boosted = RiskScore {
            overall: 55.0,
            ..Default::default()
        };
        assert_eq!(safety_profile(&minor, &boosted, &[], None).level, SafetyLevel::Caution);

        let major = vec![interaction(InteractionKind::DrugDrug, "a", "b", InteractionSeverity::Major)];
        let risk = risk_score(&major, None, &RiskMultipliers::default());
        assert_eq!(safety_profile(&major, &risk, &[], None).level, SafetyLevel::Warning);
    }

    #[test]
    fn test_recommendations_deduplicate() {
        let interactions = vec![
            interaction(InteractionKind::DrugDrug, "a", "b", InteractionSeverity::Major),
            interaction(InteractionKind::DrugDrug, "a", "b", InteractionSeverity::Major),
            interaction(InteractionKind::DrugAllergy, "a", "a", InteractionSeverity::Contraindicated),
        ];
        let recs = recommendations(&interactions, Language::En);
        assert_eq!(recs.consult.len(), 1);
        assert_eq!(recs.immediate.len(), 1);
        assert_eq!(recs.monitoring, vec!["INR".to_string()]);
    }
}
