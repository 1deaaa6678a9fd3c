//! Drug interaction checking: drug resolution, pairwise drug-drug lookups,
//! food/condition/allergy context, risk scoring and patient-facing advice.

pub mod context;
pub mod engine;
pub mod model;
pub mod report;

pub use engine::{InteractionEngine, InteractionSettings};
pub use model::{
    Alternative, DrugResolution, InteractionAlert, InteractionRecommendations, InteractionRequest,
    InteractionResult, ResolvedDrug, RiskBreakdown, RiskScore, SafetyLevel, SafetyProfile,
};
pub use report::RiskMultipliers;
