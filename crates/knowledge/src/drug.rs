use serde::{Deserialize, Serialize};

use crate::lookup_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drug {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    #[serde(default)]
    pub active_ingredients: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub therapeutic_class: String,
}

impl Drug {
    /// Minimal record for a name nothing could resolve
    pub fn unresolved(name: &str) -> Self {
        let key = lookup_key(name);
        Self {
            id: format!("unverified:{}", key),
            name: name.trim().to_string(),
            generic_name: key,
            brand_names: Vec::new(),
            active_ingredients: Vec::new(),
            contraindications: Vec::new(),
            route: String::new(),
            therapeutic_class: String::new(),
        }
    }

    /// Every name this drug is known by, lowercased
    pub fn aliases(&self) -> Vec<String> {
        let mut names = vec![lookup_key(&self.name), lookup_key(&self.generic_name)];
        names.extend(self.brand_names.iter().map(|b| lookup_key(b)));
        names.retain(|n| !n.is_empty());
        names.dedup();
        names
    }

    /// Name, generic, brand or active-ingredient match
    pub fn matches_name(&self, name: &str) -> bool {
        let key = lookup_key(name);
        if key.is_empty() {
            return false;
        }
        self.aliases().contains(&key)
            || self.active_ingredients.iter().any(|i| lookup_key(i) == key)
    }
}

/// Strictly ordered: minor < moderate < major < contraindicated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
    Contraindicated,
}

impl InteractionSeverity {
    pub const ALL: [InteractionSeverity; 4] = [
        InteractionSeverity::Minor,
        InteractionSeverity::Moderate,
        InteractionSeverity::Major,
        InteractionSeverity::Contraindicated,
    ];

    /// Risk weight used by category scoring
    pub fn weight(&self) -> f64 {
        match self {
            InteractionSeverity::Minor => 25.0,
            InteractionSeverity::Moderate => 50.0,
            InteractionSeverity::Major => 75.0,
            InteractionSeverity::Contraindicated => 100.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionSeverity::Minor => "minor",
            InteractionSeverity::Moderate => "moderate",
            InteractionSeverity::Major => "major",
            InteractionSeverity::Contraindicated => "contraindicated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Onset {
    Rapid,
    Delayed,
    #[default]
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    #[default]
    DrugDrug,
    DrugFood,
    DrugCondition,
    DrugAllergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSource {
    #[default]
    Catalogue,
    Retrieved,
    Patient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementStrategy {
    pub avoid: bool,
    pub monitor: bool,
    pub adjust_dose: bool,
    pub separate_administration: bool,
}

/// One interaction between a drug and another drug, a food, a condition or an allergy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub kind: InteractionKind,
    pub drug1: String,
    /// Second drug, or the food / condition / allergen reference
    pub drug2: String,
    pub severity: InteractionSeverity,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub onset: Onset,
    /// Probability in [0, 1]
    #[serde(default)]
    pub probability: f64,
    /// Clinical significance in [0, 10]
    #[serde(default)]
    pub clinical_significance: f64,
    #[serde(default)]
    pub management: ManagementStrategy,
    #[serde(default)]
    pub monitoring_parameters: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: InteractionSource,
}

impl Interaction {
    pub fn key(&self) -> String {
        pair_key(&self.drug1, &self.drug2)
    }
}

/// Symmetric key for an unordered pair: `pair_key(a, b) == pair_key(b, a)`
pub fn pair_key(a: &str, b: &str) -> String {
    let a = lookup_key(a);
    let b = lookup_key(b);
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodInteraction {
    /// Generic drug name
    pub drug: String,
    pub food: String,
    pub severity: InteractionSeverity,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionInteraction {
    pub drug: String,
    pub condition: String,
    pub severity: InteractionSeverity,
    #[serde(default)]
    pub description: String,
}

/// Allergen and the drugs or therapeutic classes that commonly cross-react with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReactivityGroup {
    pub allergen: String,
    pub cross_reactive: Vec<String>,
    #[serde(default)]
    pub note: String,
}
