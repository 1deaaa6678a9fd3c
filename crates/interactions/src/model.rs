use serde::{Deserialize, Serialize};

use knowledge::{Drug, Interaction, InteractionKind, InteractionSeverity, Language, PatientProfile, Urgency};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub drugs: Vec<String>,
    #[serde(default)]
    pub patient: Option<PatientProfile>,
    #[serde(default = "default_true")]
    pub include_food: bool,
    #[serde(default = "default_true")]
    pub include_conditions: bool,
    #[serde(default)]
    pub language: Language,
}

impl InteractionRequest {
    pub fn new<S: AsRef<str>>(drugs: &[S]) -> Self {
        Self {
            drugs: drugs.iter().map(|d| d.as_ref().to_string()).collect(),
            patient: None,
            include_food: true,
            include_conditions: true,
            language: Language::En,
        }
    }

    pub fn patient(mut self, patient: PatientProfile) -> Self {
        self.patient = Some(patient);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrugResolution {
    /// Exact or alias match in the drug catalogue
    Registry,
    /// Matched semantically and extracted from a retrieved monograph
    Retrieved,
    /// Nothing matched; the input passes through as-is
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDrug {
    pub input: String,
    pub drug: Drug,
    pub resolution: DrugResolution,
}

impl ResolvedDrug {
    pub fn verified(&self) -> bool {
        self.resolution != DrugResolution::Unverified
    }

    /// Name used in keys and messages
    pub fn key_name(&self) -> &str {
        &self.drug.generic_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionAlert {
    /// Stable for identical interactions across requests
    pub id: String,
    pub kind: InteractionKind,
    pub severity: InteractionSeverity,
    pub urgency: Urgency,
    pub title: String,
    pub message: String,
    pub subjects: Vec<String>,
    pub dismissible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub drug_drug: f64,
    pub drug_food: f64,
    pub drug_condition: f64,
    pub drug_allergy: f64,
}

impl RiskBreakdown {
    pub fn get_mut(&mut self, kind: InteractionKind) -> &mut f64 {
        match kind {
            InteractionKind::DrugDrug => &mut self.drug_drug,
            InteractionKind::DrugFood => &mut self.drug_food,
            InteractionKind::DrugCondition => &mut self.drug_condition,
            InteractionKind::DrugAllergy => &mut self.drug_allergy,
        }
    }

    pub fn max(&self) -> f64 {
        self.drug_drug
            .max(self.drug_food)
            .max(self.drug_condition)
            .max(self.drug_allergy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// 0..=100
    pub overall: f64,
    pub breakdown: RiskBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Warning,
    Contraindicated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyProfile {
    pub level: SafetyLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub replaces: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecommendations {
    pub immediate: Vec<String>,
    pub consult: Vec<String>,
    pub monitoring: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResult {
    pub drugs: Vec<ResolvedDrug>,
    pub interactions: Vec<Interaction>,
    pub alerts: Vec<InteractionAlert>,
    pub risk_score: RiskScore,
    pub safety_profile: SafetyProfile,
    pub recommendations: InteractionRecommendations,
    pub disclaimer: String,
    /// Retrieval failed somewhere and only catalogue data was consulted
    pub degraded: bool,
    pub catalogue_version: String,
}
