//! Built-in starter catalogues used when no catalogue directory is configured.

use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

use crate::catalogue::{CatalogueData, Catalogues};
use crate::clinical::{
    AgeRange, ConditionCategory, DiagnosticRule, Gender, MedicalCondition, SymptomCluster,
    UrgencyLevel,
};
use crate::document::{Document, DocumentCategory, DocumentMetadata, Language};
use crate::drug::{
    ConditionInteraction, CrossReactivityGroup, Drug, FoodInteraction, Interaction,
    InteractionKind, InteractionSeverity, InteractionSource, ManagementStrategy, Onset,
};

pub const SEED_VERSION: &str = "seed-1";

pub fn seed_catalogues() -> Catalogues {
    Catalogues::new(SEED_VERSION, seed_data())
}

pub fn seed_data() -> CatalogueData {
    let drugs = drugs();
    let conditions = conditions();
    let mut documents = condition_documents(&conditions);
    documents.extend(symptom_documents(&conditions));
    documents.extend(drug_documents(&drugs));
    documents.extend(reference_documents());

    CatalogueData {
        documents,
        drugs,
        interactions: interactions(),
        food_interactions: food_interactions(),
        condition_interactions: condition_interactions(),
        cross_reactivity: cross_reactivity(),
        conditions,
        rules: rules(),
        clusters: clusters(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn drug(
    id: &str,
    brands: &[&str],
    ingredients: &[&str],
    contraindications: &[&str],
    class: &str,
) -> Drug {
    let mut name = id.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Drug {
        id: id.to_string(),
        name,
        generic_name: id.to_string(),
        brand_names: strings(brands),
        active_ingredients: strings(ingredients),
        contraindications: strings(contraindications),
        route: "oral".to_string(),
        therapeutic_class: class.to_string(),
    }
}

fn drugs() -> Vec<Drug> {
    vec![
        drug(
            "aspirin",
            &["Bayer", "Ecotrin"],
            &["acetylsalicylic acid"],
            &["active bleeding", "peptic ulcer", "hemophilia"],
            "nsaid",
        ),
        drug(
            "warfarin",
            &["Coumadin", "Jantoven"],
            &["warfarin sodium"],
            &["active bleeding", "pregnancy", "severe liver disease"],
            "anticoagulant",
        ),
        drug(
            "apixaban",
            &["Eliquis"],
            &["apixaban"],
            &["active bleeding", "prosthetic heart valve"],
            "anticoagulant",
        ),
        drug(
            "ibuprofen",
            &["Advil", "Motrin"],
            &["ibuprofen"],
            &["peptic ulcer", "kidney disease", "heart failure"],
            "nsaid",
        ),
        drug(
            "naproxen",
            &["Aleve", "Naprosyn"],
            &["naproxen sodium"],
            &["peptic ulcer", "kidney disease", "heart failure"],
            "nsaid",
        ),
        drug(
            "acetaminophen",
            &["Tylenol", "Panadol"],
            &["paracetamol"],
            &["severe liver disease"],
            "analgesic",
        ),
        drug(
            "lisinopril",
            &["Zestril", "Prinivil"],
            &["lisinopril"],
            &["pregnancy", "angioedema"],
            "ace-inhibitor",
        ),
        drug(
            "enalapril",
            &["Vasotec"],
            &["enalapril maleate"],
            &["pregnancy", "angioedema"],
            "ace-inhibitor",
        ),
        drug(
            "metformin",
            &["Glucophage"],
            &["metformin hydrochloride"],
            &["kidney disease", "metabolic acidosis"],
            "biguanide",
        ),
        drug(
            "simvastatin",
            &["Zocor"],
            &["simvastatin"],
            &["liver disease", "pregnancy"],
            "statin",
        ),
        drug(
            "atorvastatin",
            &["Lipitor"],
            &["atorvastatin calcium"],
            &["liver disease", "pregnancy"],
            "statin",
        ),
        drug(
            "pravastatin",
            &["Pravachol"],
            &["pravastatin sodium"],
            &["liver disease", "pregnancy"],
            "statin",
        ),
        drug(
            "clarithromycin",
            &["Biaxin"],
            &["clarithromycin"],
            &["long qt syndrome"],
            "macrolide",
        ),
        drug(
            "azithromycin",
            &["Zithromax"],
            &["azithromycin"],
            &["long qt syndrome"],
            "macrolide",
        ),
        drug("amoxicillin", &["Amoxil"], &["amoxicillin"], &[], "penicillin"),
        drug(
            "penicillin",
            &["Penicillin VK"],
            &["phenoxymethylpenicillin"],
            &[],
            "penicillin",
        ),
        drug("cephalexin", &["Keflex"], &["cephalexin"], &[], "cephalosporin"),
        drug(
            "sertraline",
            &["Zoloft"],
            &["sertraline hydrochloride"],
            &["bipolar disorder"],
            "ssri",
        ),
        drug(
            "tramadol",
            &["Ultram"],
            &["tramadol hydrochloride"],
            &["epilepsy", "respiratory depression"],
            "opioid",
        ),
        drug(
            "clopidogrel",
            &["Plavix"],
            &["clopidogrel bisulfate"],
            &["active bleeding"],
            "antiplatelet",
        ),
        drug("omeprazole", &["Prilosec"], &["omeprazole"], &[], "ppi"),
        drug("pantoprazole", &["Protonix"], &["pantoprazole sodium"], &[], "ppi"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn ddi(
    a: &str,
    b: &str,
    severity: InteractionSeverity,
    mechanism: &str,
    onset: Onset,
    probability: f64,
    significance: f64,
    management: ManagementStrategy,
    monitoring: &[&str],
) -> Interaction {
    Interaction {
        kind: InteractionKind::DrugDrug,
        drug1: a.to_string(),
        drug2: b.to_string(),
        severity,
        mechanism: mechanism.to_string(),
        onset,
        probability,
        clinical_significance: significance,
        management,
        monitoring_parameters: strings(monitoring),
        description: format!("{} may interact with {}: {}", a, b, mechanism),
        source: InteractionSource::Catalogue,
    }
}

fn interactions() -> Vec<Interaction> {
    use InteractionSeverity::*;

    let avoid = ManagementStrategy {
        avoid: true,
        monitor: true,
        ..Default::default()
    };
    let monitor_adjust = ManagementStrategy {
        monitor: true,
        adjust_dose: true,
        ..Default::default()
    };
    let monitor = ManagementStrategy {
        monitor: true,
        ..Default::default()
    };
    let separate = ManagementStrategy {
        monitor: true,
        separate_administration: true,
        ..Default::default()
    };

    vec![
        ddi(
            "aspirin",
            "warfarin",
            Major,
            "additive antiplatelet and anticoagulant effect increases bleeding risk",
            Onset::Delayed,
            0.7,
            8.0,
            monitor_adjust,
            &["INR", "signs of bleeding", "hemoglobin"],
        ),
        ddi(
            "warfarin",
            "ibuprofen",
            Major,
            "NSAID inhibits platelet function and may injure gastric mucosa during anticoagulation",
            Onset::Delayed,
            0.6,
            8.0,
            monitor_adjust,
            &["INR", "signs of bleeding"],
        ),
        ddi(
            "warfarin",
            "naproxen",
            Major,
            "NSAID inhibits platelet function and may injure gastric mucosa during anticoagulation",
            Onset::Delayed,
            0.6,
            8.0,
            monitor_adjust,
            &["INR", "signs of bleeding"],
        ),
        ddi(
            "warfarin",
            "apixaban",
            Contraindicated,
            "duplicate anticoagulation",
            Onset::Rapid,
            0.9,
            10.0,
            avoid,
            &["signs of bleeding"],
        ),
        ddi(
            "apixaban",
            "aspirin",
            Major,
            "additive bleeding risk",
            Onset::Delayed,
            0.5,
            7.0,
            monitor,
            &["signs of bleeding", "hemoglobin"],
        ),
        ddi(
            "simvastatin",
            "clarithromycin",
            Contraindicated,
            "strong CYP3A4 inhibition raises statin exposure and the risk of rhabdomyolysis",
            Onset::Delayed,
            0.8,
            9.0,
            avoid,
            &["creatine kinase", "muscle pain"],
        ),
        ddi(
            "atorvastatin",
            "clarithromycin",
            Major,
            "CYP3A4 inhibition raises statin exposure",
            Onset::Delayed,
            0.5,
            7.0,
            monitor_adjust,
            &["creatine kinase", "muscle pain"],
        ),
        ddi(
            "sertraline",
            "tramadol",
            Major,
            "additive serotonergic effect may cause serotonin syndrome and lowers seizure threshold",
            Onset::Rapid,
            0.4,
            8.0,
            monitor,
            &["mental status", "body temperature", "neuromuscular signs"],
        ),
        ddi(
            "lisinopril",
            "ibuprofen",
            Moderate,
            "NSAIDs blunt the antihypertensive effect and may impair kidney function",
            Onset::Delayed,
            0.5,
            5.0,
            monitor,
            &["blood pressure", "serum creatinine", "potassium"],
        ),
        ddi(
            "enalapril",
            "naproxen",
            Moderate,
            "NSAIDs blunt the antihypertensive effect and may impair kidney function",
            Onset::Delayed,
            0.5,
            5.0,
            monitor,
            &["blood pressure", "serum creatinine"],
        ),
        ddi(
            "aspirin",
            "ibuprofen",
            Moderate,
            "ibuprofen competes for the COX-1 binding site and reduces the cardioprotective effect of aspirin",
            Onset::Rapid,
            0.6,
            5.0,
            separate,
            &["cardiovascular symptoms"],
        ),
        ddi(
            "clopidogrel",
            "omeprazole",
            Moderate,
            "CYP2C19 inhibition reduces activation of clopidogrel",
            Onset::Delayed,
            0.5,
            6.0,
            monitor,
            &["platelet function"],
        ),
        ddi(
            "warfarin",
            "acetaminophen",
            Moderate,
            "regular acetaminophen use can raise the INR",
            Onset::Delayed,
            0.3,
            4.0,
            monitor,
            &["INR"],
        ),
        ddi(
            "metformin",
            "lisinopril",
            Minor,
            "ACE inhibitors may slightly enhance the glucose-lowering effect",
            Onset::Variable,
            0.2,
            2.0,
            monitor,
            &["blood glucose"],
        ),
    ]
}

fn food(drug: &str, food: &str, severity: InteractionSeverity, mechanism: &str, advice: &str) -> FoodInteraction {
    FoodInteraction {
        drug: drug.to_string(),
        food: food.to_string(),
        severity,
        mechanism: mechanism.to_string(),
        recommendation: advice.to_string(),
    }
}

fn food_interactions() -> Vec<FoodInteraction> {
    use InteractionSeverity::*;
    vec![
        food(
            "warfarin",
            "leafy green vegetables",
            Moderate,
            "vitamin K antagonizes the anticoagulant effect",
            "Keep vitamin K intake consistent from day to day",
        ),
        food(
            "warfarin",
            "alcohol",
            Moderate,
            "alcohol alters warfarin metabolism",
            "Limit alcohol intake",
        ),
        food(
            "simvastatin",
            "grapefruit juice",
            Major,
            "CYP3A4 inhibition raises statin levels",
            "Avoid grapefruit juice",
        ),
        food(
            "atorvastatin",
            "grapefruit juice",
            Moderate,
            "CYP3A4 inhibition raises statin levels",
            "Limit grapefruit juice",
        ),
        food(
            "metformin",
            "alcohol",
            Moderate,
            "alcohol increases the risk of lactic acidosis",
            "Avoid heavy alcohol use",
        ),
        food(
            "aspirin",
            "alcohol",
            Moderate,
            "additive gastric irritation and bleeding risk",
            "Limit alcohol intake",
        ),
        food(
            "acetaminophen",
            "alcohol",
            Major,
            "chronic alcohol use increases hepatotoxicity",
            "Avoid alcohol",
        ),
        food(
            "lisinopril",
            "potassium salt substitutes",
            Moderate,
            "additive potassium retention",
            "Avoid potassium-based salt substitutes",
        ),
    ]
}

fn condition_interactions() -> Vec<ConditionInteraction> {
    use InteractionSeverity::*;
    let entry = |drug: &str, condition: &str, severity, description: &str| ConditionInteraction {
        drug: drug.to_string(),
        condition: condition.to_string(),
        severity,
        description: description.to_string(),
    };
    vec![
        entry("ibuprofen", "kidney disease", Major, "NSAIDs reduce renal blood flow"),
        entry("naproxen", "heart failure", Major, "NSAIDs cause fluid retention"),
        entry("metformin", "kidney disease", Contraindicated, "risk of lactic acidosis with reduced clearance"),
        entry("warfarin", "pregnancy", Contraindicated, "teratogenic"),
        entry("lisinopril", "pregnancy", Contraindicated, "fetal toxicity"),
        entry("simvastatin", "liver disease", Contraindicated, "hepatotoxicity"),
        entry("acetaminophen", "liver disease", Major, "reduced hepatic clearance"),
        entry("aspirin", "peptic ulcer", Major, "gastrointestinal bleeding"),
        entry("tramadol", "epilepsy", Major, "lowers seizure threshold"),
    ]
}

fn cross_reactivity() -> Vec<CrossReactivityGroup> {
    vec![
        CrossReactivityGroup {
            allergen: "penicillin".to_string(),
            cross_reactive: strings(&["penicillin", "amoxicillin", "ampicillin", "cephalosporin"]),
            note: "beta-lactam cross-sensitivity".to_string(),
        },
        CrossReactivityGroup {
            allergen: "aspirin".to_string(),
            cross_reactive: strings(&["nsaid", "ibuprofen", "naproxen"]),
            note: "NSAID-exacerbated respiratory disease".to_string(),
        },
        CrossReactivityGroup {
            allergen: "sulfa".to_string(),
            cross_reactive: strings(&["sulfamethoxazole", "sulfasalazine"]),
            note: "sulfonamide antibiotics".to_string(),
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn condition(
    id: &str,
    name: &str,
    category: ConditionCategory,
    symptoms: &[&str],
    risk_factors: &[&str],
    prevalence: f64,
    urgency: UrgencyLevel,
    tests: &[&str],
    specialists: &[&str],
    monitoring: &[&str],
) -> MedicalCondition {
    MedicalCondition {
        id: id.to_string(),
        name: name.to_string(),
        category,
        common_symptoms: strings(symptoms),
        risk_factors: strings(risk_factors),
        prevalence,
        urgency_level: urgency,
        recommended_tests: strings(tests),
        specialists: strings(specialists),
        monitoring: strings(monitoring),
    }
}

fn conditions() -> Vec<MedicalCondition> {
    use ConditionCategory::*;
    use UrgencyLevel::*;
    vec![
        condition(
            "influenza",
            "Influenza",
            Acute,
            &["fever", "headache", "cough", "muscle aches", "fatigue", "chills"],
            &["advanced age", "asthma", "pregnancy"],
            0.1,
            Medium,
            &["rapid influenza test"],
            &["primary care physician"],
            &["body temperature", "hydration"],
        ),
        condition(
            "common-cold",
            "Common cold",
            Acute,
            &["runny nose", "sore throat", "sneezing", "cough", "headache", "fever"],
            &[],
            0.3,
            Low,
            &[],
            &["primary care physician"],
            &["symptom duration"],
        ),
        condition(
            "covid-19",
            "COVID-19",
            Acute,
            &["fever", "cough", "fatigue", "loss of taste", "shortness of breath", "headache"],
            &["advanced age", "diabetes", "obesity", "smoking"],
            0.05,
            Medium,
            &["SARS-CoV-2 PCR test"],
            &["primary care physician"],
            &["oxygen saturation", "body temperature"],
        ),
        condition(
            "migraine",
            "Migraine",
            Chronic,
            &["headache", "nausea", "light sensitivity", "visual aura"],
            &["family history"],
            0.12,
            Low,
            &["neurological examination"],
            &["neurologist"],
            &["headache diary"],
        ),
        condition(
            "tension-headache",
            "Tension headache",
            Routine,
            &["headache", "neck pain", "stress"],
            &["stress"],
            0.2,
            Low,
            &[],
            &["primary care physician"],
            &["headache diary"],
        ),
        condition(
            "meningitis",
            "Meningitis",
            Emergency,
            &["fever", "headache", "stiff neck", "confusion", "light sensitivity", "rash"],
            &["immunosuppression"],
            0.0001,
            Critical,
            &["lumbar puncture", "blood culture"],
            &["infectious disease specialist", "neurologist"],
            &["neurological status", "vital signs"],
        ),
        condition(
            "myocardial-infarction",
            "Myocardial infarction",
            Emergency,
            &["chest pain", "shortness of breath", "sweating", "nausea", "arm pain"],
            &["smoking", "hypertension", "diabetes", "high cholesterol", "advanced age"],
            0.003,
            Critical,
            &["ECG", "troponin"],
            &["cardiologist"],
            &["heart rhythm", "blood pressure"],
        ),
        condition(
            "pneumonia",
            "Pneumonia",
            Acute,
            &["fever", "cough", "shortness of breath", "chest pain", "fatigue"],
            &["advanced age", "smoking", "copd"],
            0.01,
            High,
            &["chest x-ray", "complete blood count"],
            &["pulmonologist"],
            &["oxygen saturation", "respiratory rate"],
        ),
        condition(
            "gastroenteritis",
            "Gastroenteritis",
            Acute,
            &["diarrhea", "nausea", "vomiting", "abdominal pain", "fever"],
            &[],
            0.05,
            Low,
            &["stool test"],
            &["primary care physician"],
            &["hydration"],
        ),
        condition(
            "appendicitis",
            "Appendicitis",
            Emergency,
            &["abdominal pain", "nausea", "vomiting", "fever", "loss of appetite"],
            &[],
            0.001,
            High,
            &["abdominal ultrasound", "complete blood count"],
            &["general surgeon"],
            &["pain progression"],
        ),
        condition(
            "hypertension",
            "Hypertension",
            Chronic,
            &["headache", "dizziness", "blurred vision"],
            &["obesity", "smoking", "family history"],
            0.3,
            Medium,
            &["blood pressure measurement", "basic metabolic panel"],
            &["cardiologist"],
            &["blood pressure"],
        ),
        condition(
            "type-2-diabetes",
            "Type 2 diabetes",
            Chronic,
            &["increased thirst", "frequent urination", "fatigue", "blurred vision"],
            &["obesity", "family history", "sedentary lifestyle"],
            0.1,
            Medium,
            &["HbA1c", "fasting glucose"],
            &["endocrinologist"],
            &["blood glucose"],
        ),
        condition(
            "strep-throat",
            "Strep throat",
            Acute,
            &["sore throat", "fever", "swollen lymph nodes", "headache"],
            &[],
            0.02,
            Low,
            &["rapid strep test"],
            &["primary care physician"],
            &["body temperature"],
        ),
        condition(
            "urinary-tract-infection",
            "Urinary tract infection",
            Acute,
            &["painful urination", "frequent urination", "lower abdominal pain", "fever"],
            &["pregnancy", "diabetes"],
            0.05,
            Low,
            &["urinalysis", "urine culture"],
            &["primary care physician"],
            &["symptom resolution"],
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn rule(
    id: &str,
    condition_id: &str,
    required: &[&str],
    optional: &[&str],
    excluding: &[&str],
    minimum: usize,
    weight: f64,
    risk_factors: &[&str],
) -> DiagnosticRule {
    DiagnosticRule {
        id: id.to_string(),
        condition_id: condition_id.to_string(),
        required_symptoms: strings(required),
        optional_symptoms: strings(optional),
        excluding_symptoms: strings(excluding),
        minimum_symptoms: minimum,
        confidence_weight: weight,
        age_range: None,
        gender: None,
        risk_factors: strings(risk_factors),
    }
}

fn rules() -> Vec<DiagnosticRule> {
    let mut mi = rule(
        "rule-myocardial-infarction",
        "myocardial-infarction",
        &["chest pain"],
        &["shortness of breath", "sweating", "nausea", "arm pain"],
        &[],
        2,
        1.0,
        &["smoking", "hypertension", "diabetes", "high cholesterol"],
    );
    mi.age_range = Some(AgeRange { min: 30, max: 120 });

    let mut appendicitis = rule(
        "rule-appendicitis",
        "appendicitis",
        &["abdominal pain"],
        &["nausea", "vomiting", "fever", "loss of appetite"],
        &["diarrhea"],
        3,
        0.9,
        &[],
    );
    appendicitis.age_range = Some(AgeRange { min: 5, max: 60 });

    let mut uti = rule(
        "rule-urinary-tract-infection",
        "urinary-tract-infection",
        &["painful urination"],
        &["frequent urination", "lower abdominal pain", "fever"],
        &[],
        2,
        0.8,
        &["pregnancy", "diabetes"],
    );
    uti.gender = Some(Gender::Female);

    let mut hypertension = rule(
        "rule-hypertension",
        "hypertension",
        &["headache", "dizziness"],
        &["blurred vision"],
        &[],
        2,
        0.5,
        &["obesity", "smoking", "family history"],
    );
    hypertension.age_range = Some(AgeRange { min: 40, max: 120 });

    vec![
        rule(
            "rule-influenza",
            "influenza",
            &["fever"],
            &["headache", "cough", "muscle aches", "fatigue", "chills"],
            &[],
            2,
            0.8,
            &["advanced age", "asthma", "pregnancy"],
        ),
        rule(
            "rule-common-cold",
            "common-cold",
            &[],
            &["runny nose", "sore throat", "sneezing", "cough", "headache", "fever"],
            &[],
            2,
            0.5,
            &[],
        ),
        rule(
            "rule-covid-19",
            "covid-19",
            &["fever"],
            &["cough", "loss of taste", "loss of smell", "shortness of breath", "fatigue"],
            &[],
            3,
            0.7,
            &["advanced age", "diabetes", "obesity", "smoking"],
        ),
        rule(
            "rule-migraine",
            "migraine",
            &["headache"],
            &["nausea", "light sensitivity", "visual aura", "vomiting"],
            &["fever"],
            2,
            0.9,
            &["family history"],
        ),
        rule(
            "rule-tension-headache",
            "tension-headache",
            &["headache"],
            &["neck pain", "stress", "fatigue"],
            &["fever", "vomiting"],
            2,
            0.6,
            &["stress"],
        ),
        rule(
            "rule-meningitis",
            "meningitis",
            &["fever", "headache", "stiff neck"],
            &["confusion", "light sensitivity", "rash", "vomiting"],
            &[],
            3,
            1.0,
            &["immunosuppression"],
        ),
        mi,
        rule(
            "rule-pneumonia",
            "pneumonia",
            &["cough", "fever"],
            &["shortness of breath", "chest pain", "fatigue"],
            &[],
            3,
            0.8,
            &["smoking", "copd", "advanced age"],
        ),
        rule(
            "rule-gastroenteritis",
            "gastroenteritis",
            &["diarrhea"],
            &["nausea", "vomiting", "abdominal pain", "fever"],
            &[],
            2,
            0.7,
            &[],
        ),
        appendicitis,
        hypertension,
        rule(
            "rule-type-2-diabetes",
            "type-2-diabetes",
            &["increased thirst", "frequent urination"],
            &["fatigue", "blurred vision"],
            &[],
            2,
            0.7,
            &["obesity", "family history", "sedentary lifestyle"],
        ),
        rule(
            "rule-strep-throat",
            "strep-throat",
            &["sore throat", "fever"],
            &["swollen lymph nodes", "headache"],
            &["cough", "runny nose"],
            2,
            0.7,
            &[],
        ),
        uti,
    ]
}

fn clusters() -> Vec<SymptomCluster> {
    let cluster = |id: &str, name: &str, symptoms: &[&str], related: &[&str]| SymptomCluster {
        id: id.to_string(),
        name: name.to_string(),
        symptoms: strings(symptoms),
        related_conditions: strings(related),
    };
    vec![
        cluster(
            "flu-like",
            "Flu-like illness",
            &["fever", "headache", "muscle aches", "fatigue", "chills"],
            &["influenza", "covid-19"],
        ),
        cluster(
            "respiratory",
            "Respiratory infection",
            &["cough", "shortness of breath", "sore throat", "runny nose", "chest congestion"],
            &["common-cold", "pneumonia", "covid-19"],
        ),
        cluster(
            "gastrointestinal",
            "Gastrointestinal upset",
            &["nausea", "vomiting", "diarrhea", "abdominal pain"],
            &["gastroenteritis", "appendicitis"],
        ),
        cluster(
            "cardiac",
            "Cardiac warning signs",
            &["chest pain", "shortness of breath", "sweating", "arm pain", "dizziness"],
            &["myocardial-infarction"],
        ),
        cluster(
            "meningeal",
            "Meningeal irritation",
            &["stiff neck", "confusion", "light sensitivity", "rash"],
            &["meningitis"],
        ),
        cluster(
            "metabolic",
            "Metabolic",
            &["increased thirst", "frequent urination", "fatigue", "blurred vision"],
            &["type-2-diabetes"],
        ),
    ]
}

fn metadata(tags: Vec<String>, reliability: f64) -> DocumentMetadata {
    DocumentMetadata {
        source: "seed".to_string(),
        author: None,
        published_date: None,
        tags,
        reliability,
    }
}

fn condition_documents(conditions: &[MedicalCondition]) -> Vec<Document> {
    conditions
        .iter()
        .map(|c| Document {
            id: c.id.clone(),
            title: c.name.clone(),
            content: format!(
                "{} commonly presents with {}. Risk factors include {}.",
                c.name,
                c.common_symptoms.join(", "),
                if c.risk_factors.is_empty() {
                    "none known".to_string()
                } else {
                    c.risk_factors.join(", ")
                }
            ),
            category: DocumentCategory::Disease,
            language: Language::En,
            metadata: metadata(c.common_symptoms.clone(), 0.9),
        })
        .collect()
}

fn symptom_documents(conditions: &[MedicalCondition]) -> Vec<Document> {
    let mut by_symptom: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for c in conditions {
        for s in &c.common_symptoms {
            by_symptom.entry(s.as_str()).or_default().push(c.name.as_str());
        }
    }
    by_symptom
        .into_iter()
        .map(|(symptom, names)| Document {
            id: format!("symptom-{}", symptom.replace(' ', "-")),
            title: symptom.to_string(),
            content: format!("{} is a symptom seen in {}.", symptom, names.join(", ")),
            category: DocumentCategory::Symptom,
            language: Language::En,
            metadata: metadata(vec![symptom.to_string()], 0.8),
        })
        .collect()
}

fn drug_documents(drugs: &[Drug]) -> Vec<Document> {
    drugs
        .iter()
        .map(|d| Document {
            id: format!("drug-{}", d.id),
            title: d.name.clone(),
            content: format!(
                "Generic name: {}. Brand names: {}. Therapeutic class: {}. Contraindications: {}.",
                d.generic_name,
                d.brand_names.join(", "),
                d.therapeutic_class,
                d.contraindications.join(", ")
            ),
            category: DocumentCategory::Drug,
            language: Language::En,
            metadata: metadata(vec![d.therapeutic_class.clone()], 0.9),
        })
        .collect()
}

fn reference_documents() -> Vec<Document> {
    vec![
        Document {
            id: "treatment-fever-management".to_string(),
            title: "Managing fever at home".to_string(),
            content: "Rest, fluids and antipyretics such as acetaminophen or ibuprofen relieve fever. \
                      Seek care if fever exceeds three days."
                .to_string(),
            category: DocumentCategory::Treatment,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "seed".to_string(),
                author: Some("Clinical editorial team".to_string()),
                published_date: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).single(),
                tags: strings(&["fever", "antipyretic", "home care"]),
                reliability: 0.85,
            },
        },
        Document {
            id: "procedure-lumbar-puncture".to_string(),
            title: "Lumbar puncture".to_string(),
            content: "A lumbar puncture samples cerebrospinal fluid to diagnose meningitis."
                .to_string(),
            category: DocumentCategory::Procedure,
            language: Language::En,
            metadata: DocumentMetadata {
                source: "seed".to_string(),
                author: None,
                published_date: Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).single(),
                tags: strings(&["meningitis", "cerebrospinal fluid"]),
                reliability: 0.95,
            },
        },
        Document {
            id: "es-fiebre".to_string(),
            title: "fiebre".to_string(),
            content: "La fiebre es una temperatura corporal elevada.".to_string(),
            category: DocumentCategory::Symptom,
            language: Language::Es,
            metadata: metadata(strings(&["fiebre"]), 0.7),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_is_consistent() {
        let catalogues = seed_catalogues();
        assert_eq!(catalogues.version(), SEED_VERSION);

        for rule in catalogues.rules() {
            assert!(
                catalogues.find_condition(&rule.condition_id).is_some(),
                "rule {} points at a missing condition",
                rule.id
            );
        }
        for cluster in catalogues.clusters() {
            for id in &cluster.related_conditions {
                assert!(catalogues.find_condition(id).is_some());
            }
        }
        for interaction in &catalogues.data().interactions {
            assert!(catalogues.find_drug(&interaction.drug1).is_some());
            assert!(catalogues.find_drug(&interaction.drug2).is_some());
        }
    }

    #[test]
    fn test_seed_document_ids_unique() {
        let data = seed_data();
        let ids: HashSet<_> = data.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), data.documents.len());
    }

    #[test]
    fn test_aspirin_warfarin_is_major() {
        let catalogues = seed_catalogues();
        let interaction = catalogues.find_interaction("Warfarin", "Aspirin").unwrap();
        assert_eq!(interaction.severity, InteractionSeverity::Major);
    }
}
