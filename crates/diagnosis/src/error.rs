use thiserror::Error;

/// A diagnostic rule that cannot be evaluated. The rule is skipped, never the request.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("rule {rule} has no condition")]
    MissingCondition { rule: String },

    #[error("rule {rule} points at unknown condition {condition}")]
    UnknownCondition { rule: String, condition: String },

    #[error("rule {rule} has invalid confidence weight {weight}")]
    InvalidWeight { rule: String, weight: f64 },

    #[error("rule {rule} lists no symptoms")]
    NoSymptoms { rule: String },

    #[error("rule {rule} has an empty age range {min}..={max}")]
    InvalidAgeRange { rule: String, min: u32, max: u32 },
}
