//! Symptom-based differential diagnosis.
//!
//! Rules, symptom clusters and semantic retrieval each contribute evidence per
//! condition; the merged ranking drives red flags, risk and recommendations.

pub mod assessment;
pub mod engine;
pub mod error;
pub mod model;
pub mod rules;

pub use engine::{DiagnosisEngine, DiagnosisSettings};
pub use error::RuleError;
pub use model::{
    ClusterMatch, DiagnosedCondition, DiagnosisRecommendations, DiagnosisResult, DiagnosisRisk,
    EvidenceSource, RedFlag, RedFlagReason, RiskLevel, RuledOutCondition, SymptomMatch,
};
