//! Drug-food, drug-condition and drug-allergy checks against catalogue tables
//! and the patient profile.

use extract::FieldExtractor;
use knowledge::{
    Catalogues, Interaction, InteractionKind, InteractionSeverity, InteractionSource,
    ManagementStrategy, Onset, PatientProfile, lookup_key,
};

use crate::model::ResolvedDrug;

pub fn management_for(severity: InteractionSeverity) -> ManagementStrategy {
    ManagementStrategy {
        avoid: severity == InteractionSeverity::Contraindicated,
        monitor: true,
        adjust_dose: severity == InteractionSeverity::Major,
        separate_administration: false,
    }
}

#[allow(clippy::too_many_arguments)]
fn contextual(
    kind: InteractionKind,
    drug: &ResolvedDrug,
    other: &str,
    severity: InteractionSeverity,
    mechanism: &str,
    description: String,
    probability: f64,
    source: InteractionSource,
) -> Interaction {
    Interaction {
        kind,
        drug1: drug.key_name().to_string(),
        drug2: other.to_string(),
        severity,
        mechanism: mechanism.to_string(),
        onset: Onset::Variable,
        probability,
        clinical_significance: severity.weight() / 10.0,
        management: management_for(severity),
        monitoring_parameters: Vec::new(),
        description,
        source,
    }
}

pub fn food_interactions(catalogues: &Catalogues, drugs: &[ResolvedDrug]) -> Vec<Interaction> {
    let mut found = Vec::new();
    for drug in drugs {
        for entry in catalogues.food_interactions() {
            if !drug.drug.matches_name(&entry.drug) {
                continue;
            }
            found.push(contextual(
                InteractionKind::DrugFood,
                drug,
                &entry.food,
                entry.severity,
                &entry.mechanism,
                entry.recommendation.clone(),
                0.5,
                InteractionSource::Catalogue,
            ));
        }
    }
    found
}

/// Table entries first; otherwise a patient condition named in the drug's
/// contraindications counts as contraindicated.
pub fn condition_interactions(
    catalogues: &Catalogues,
    extractor: &dyn FieldExtractor,
    drugs: &[ResolvedDrug],
    profile: &PatientProfile,
) -> Vec<Interaction> {
    let mut found = Vec::new();
    for drug in drugs {
        for condition in profile.all_conditions() {
            let key = lookup_key(condition);
            if key.is_empty() || found.iter().any(|i: &Interaction| {
                i.drug1 == drug.key_name() && lookup_key(&i.drug2) == key
            }) {
                continue;
            }

            let table = catalogues.condition_interactions().iter().find(|entry| {
                drug.drug.matches_name(&entry.drug)
                    && (lookup_key(&entry.condition) == key
                        || extractor.mentions(condition, &entry.condition))
            });
            if let Some(entry) = table {
                found.push(contextual(
                    InteractionKind::DrugCondition,
                    drug,
                    condition,
                    entry.severity,
                    &entry.description,
                    format!("{} with {}: {}", drug.drug.name, condition, entry.description),
                    0.8,
                    InteractionSource::Catalogue,
                ));
                continue;
            }

            let listed = drug
                .drug
                .contraindications
                .iter()
                .find(|c| extractor.mentions(c, condition) || extractor.mentions(condition, c));
            if let Some(contraindication) = listed {
                found.push(contextual(
                    InteractionKind::DrugCondition,
                    drug,
                    condition,
                    InteractionSeverity::Contraindicated,
                    contraindication,
                    format!("{} is contraindicated in {}", drug.drug.name, contraindication),
                    0.9,
                    InteractionSource::Catalogue,
                ));
            }
        }
    }
    found
}

/// Direct name or ingredient matches are contraindicated; declared or catalogued
/// cross-reactivity is major. At most one interaction per drug and allergy.
pub fn allergy_interactions(
    catalogues: &Catalogues,
    drugs: &[ResolvedDrug],
    profile: &PatientProfile,
) -> Vec<Interaction> {
    let mut found = Vec::new();
    for allergy in &profile.allergies {
        let allergen = lookup_key(&allergy.drug_name);
        if allergen.is_empty() {
            continue;
        }
        for drug in drugs {
            if drug.drug.matches_name(&allergy.drug_name) {
                found.push(contextual(
                    InteractionKind::DrugAllergy,
                    drug,
                    &allergy.drug_name,
                    InteractionSeverity::Contraindicated,
                    "declared allergy",
                    format!(
                        "Patient is allergic to {}{}",
                        allergy.drug_name,
                        allergy
                            .reaction
                            .as_deref()
                            .map(|r| format!(" ({})", r))
                            .unwrap_or_default()
                    ),
                    1.0,
                    InteractionSource::Patient,
                ));
                continue;
            }

            if cross_reacts(catalogues, drug, &allergen, &allergy.cross_reactivity) {
                found.push(contextual(
                    InteractionKind::DrugAllergy,
                    drug,
                    &allergy.drug_name,
                    InteractionSeverity::Major,
                    "allergy cross-reactivity",
                    format!(
                        "{} may cross-react with the declared {} allergy",
                        drug.drug.name, allergy.drug_name
                    ),
                    0.5,
                    InteractionSource::Patient,
                ));
            }
        }
    }
    found
}

/// Names and class of a drug that cross-reactivity lists refer to
fn drug_terms(drug: &ResolvedDrug) -> Vec<String> {
    let mut terms = drug.drug.aliases();
    let class = lookup_key(&drug.drug.therapeutic_class);
    if !class.is_empty() {
        terms.push(class);
    }
    terms
}

pub fn cross_reacts(
    catalogues: &Catalogues,
    drug: &ResolvedDrug,
    allergen: &str,
    declared: &[String],
) -> bool {
    let terms = drug_terms(drug);
    let listed = |items: &[String]| items.iter().any(|item| terms.contains(&lookup_key(item)));

    listed(declared)
        || catalogues
            .cross_reactivity()
            .iter()
            .filter(|group| lookup_key(&group.allergen) == allergen)
            .any(|group| listed(&group.cross_reactive))
}
