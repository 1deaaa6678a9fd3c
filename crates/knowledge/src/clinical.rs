use serde::{Deserialize, Serialize};

use crate::document::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomSeverity {
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl SymptomSeverity {
    /// 1 (mild) ..= 4 (critical)
    pub fn score(&self) -> u8 {
        match self {
            SymptomSeverity::Mild => 1,
            SymptomSeverity::Moderate => 2,
            SymptomSeverity::Severe => 3,
            SymptomSeverity::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomFrequency {
    Rare,
    #[default]
    Occasional,
    Frequent,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    pub name: String,
    pub severity: SymptomSeverity,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub frequency: SymptomFrequency,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub associated_symptoms: Vec<String>,
    #[serde(default)]
    pub language: Language,
}

impl Symptom {
    pub fn new(name: &str, severity: SymptomSeverity) -> Self {
        Self {
            name: name.to_string(),
            severity,
            duration: String::new(),
            frequency: SymptomFrequency::default(),
            triggers: Vec::new(),
            associated_symptoms: Vec::new(),
            language: Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionCategory {
    Acute,
    Chronic,
    Emergency,
    Routine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    /// 1 (low) ..= 4 (critical)
    pub fn level(&self) -> u8 {
        match self {
            UrgencyLevel::Low => 1,
            UrgencyLevel::Medium => 2,
            UrgencyLevel::High => 3,
            UrgencyLevel::Critical => 4,
        }
    }
}

/// How quickly a patient should act on a result. Ordered: routine < urgent < immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalCondition {
    pub id: String,
    pub name: String,
    pub category: ConditionCategory,
    #[serde(default)]
    pub common_symptoms: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    /// Population prevalence in [0, 1]
    #[serde(default)]
    pub prevalence: f64,
    pub urgency_level: UrgencyLevel,
    #[serde(default)]
    pub recommended_tests: Vec<String>,
    #[serde(default)]
    pub specialists: Vec<String>,
    #[serde(default)]
    pub monitoring: Vec<String>,
}

impl MedicalCondition {
    pub fn is_emergency(&self) -> bool {
        self.category == ConditionCategory::Emergency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }
}

/// A rule fires only if every required symptom matches and no excluding symptom does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRule {
    pub id: String,
    pub condition_id: String,
    #[serde(default)]
    pub required_symptoms: Vec<String>,
    #[serde(default)]
    pub optional_symptoms: Vec<String>,
    #[serde(default)]
    pub excluding_symptoms: Vec<String>,
    pub minimum_symptoms: usize,
    pub confidence_weight: f64,
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// Predefined symptom group pointing at the conditions it suggests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomCluster {
    pub id: String,
    pub name: String,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub related_conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganFunction {
    #[default]
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl OrganFunction {
    pub fn is_impaired(&self) -> bool {
        *self != OrganFunction::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allergy {
    pub drug_name: String,
    #[serde(default)]
    pub reaction: Option<String>,
    /// Drugs or therapeutic classes the patient reports reacting to as well
    #[serde(default)]
    pub cross_reactivity: Vec<String>,
}

impl Allergy {
    pub fn new(drug_name: &str) -> Self {
        Self {
            drug_name: drug_name.to_string(),
            reaction: None,
            cross_reactivity: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub medical_history: Vec<String>,
    pub current_conditions: Vec<String>,
    pub risk_factors: Vec<String>,
    pub allergies: Vec<Allergy>,
    pub smoking: bool,
    pub kidney_function: OrganFunction,
    pub liver_function: OrganFunction,
}

impl PatientProfile {
    pub fn is_elderly(&self) -> bool {
        self.age.is_some_and(|age| age > 65)
    }

    /// Conditions the patient has now or had before, in declaration order
    pub fn all_conditions(&self) -> impl Iterator<Item = &String> {
        self.current_conditions.iter().chain(self.medical_history.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_and_urgency_ordering() {
        assert!(SymptomSeverity::Mild < SymptomSeverity::Critical);
        assert_eq!(SymptomSeverity::Severe.score(), 3);
        assert!(Urgency::Routine < Urgency::Urgent && Urgency::Urgent < Urgency::Immediate);
        assert_eq!(UrgencyLevel::Critical.level(), 4);
    }

    #[test]
    fn test_profile_defaults() {
        let profile: PatientProfile = serde_json::from_str(r#"{"age": 70}"#).unwrap();
        assert!(profile.is_elderly());
        assert!(!profile.kidney_function.is_impaired());
        assert!(profile.allergies.is_empty());
    }
}
