pub mod catalogue;
pub mod clinical;
pub mod disclaimer;
pub mod document;
pub mod drug;
pub mod error;
pub mod reader;
pub mod seed;

pub use catalogue::{CatalogueData, CatalogueStore, Catalogues};
pub use clinical::{
    AgeRange, Allergy, ConditionCategory, DiagnosticRule, Gender, MedicalCondition,
    OrganFunction, PatientProfile, Symptom, SymptomCluster, SymptomFrequency, SymptomSeverity,
    Urgency, UrgencyLevel,
};
pub use disclaimer::disclaimer;
pub use document::{Document, DocumentCategory, DocumentMetadata, Language};
pub use drug::{
    ConditionInteraction, CrossReactivityGroup, Drug, FoodInteraction, Interaction,
    InteractionKind, InteractionSeverity, InteractionSource, ManagementStrategy, Onset, pair_key,
};
pub use error::KnowledgeError;
pub use reader::CatalogueReader;

use sha2::{Digest, Sha256};

/// Generate a stable document ID from its title and source
pub fn generate_doc_id(title: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(source.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Lowercase, trim and collapse inner whitespace. Used for every catalogue key.
pub fn lookup_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable() {
        let a = generate_doc_id("Fever", "seed");
        let b = generate_doc_id("Fever", "seed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, generate_doc_id("Fever", "other"));
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(lookup_key("  Chest   Pain "), "chest pain");
    }
}
