use serde::{Deserialize, Serialize};

use knowledge::{MedicalCondition, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    Rule,
    Semantic,
    Cluster,
}

/// How a caller's symptom name was understood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomMatch {
    pub input: String,
    /// Catalogue name the input resolved to, or the input itself
    pub matched: String,
    /// Canonical key used for rule and cluster matching
    pub canonical: String,
    /// False when no catalogue symptom matched closely enough
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMatch {
    pub cluster_id: String,
    pub name: String,
    pub matched_symptoms: Vec<String>,
    /// Matched symptoms over symptoms in the cluster
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosedCondition {
    pub condition: MedicalCondition,
    /// Sum of rule, semantic and cluster contributions
    pub score: f64,
    /// Share of the total score over every ranked candidate
    pub likelihood: f64,
    pub sources: Vec<EvidenceSource>,
    pub matched_symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuledOutCondition {
    pub condition_id: String,
    pub name: String,
    pub excluding_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagReason {
    CriticalSymptom,
    SevereSymptom,
    EmergencyCondition,
    HighUrgencyCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    /// Symptom or condition name that raised the flag
    pub subject: String,
    pub reason: RedFlagReason,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            RiskLevel::Low
        } else if score < 60.0 {
            RiskLevel::Medium
        } else if score < 80.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRisk {
    /// 0..=100
    pub score: f64,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecommendations {
    pub immediate: Vec<String>,
    pub general: Vec<String>,
    pub tests: Vec<String>,
    pub specialists: Vec<String>,
    pub monitoring: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub symptoms: Vec<SymptomMatch>,
    pub clusters: Vec<ClusterMatch>,
    pub primary_conditions: Vec<DiagnosedCondition>,
    pub secondary_conditions: Vec<DiagnosedCondition>,
    pub ruled_out: Vec<RuledOutCondition>,
    pub red_flags: Vec<RedFlag>,
    pub urgency: Urgency,
    pub risk: DiagnosisRisk,
    pub diagnostic_confidence: f64,
    pub recommendations: DiagnosisRecommendations,
    pub disclaimer: String,
    /// Retrieval failed somewhere and the result rests on catalogue data only
    pub degraded: bool,
    pub catalogue_version: String,
}
