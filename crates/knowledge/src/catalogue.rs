use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::clinical::{DiagnosticRule, MedicalCondition, SymptomCluster};
use crate::document::Document;
use crate::drug::{
    ConditionInteraction, CrossReactivityGroup, Drug, FoodInteraction, Interaction, pair_key,
};
use crate::lookup_key;

/// Raw catalogue tables, as loaded from disk or seeded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueData {
    pub documents: Vec<Document>,
    pub drugs: Vec<Drug>,
    pub interactions: Vec<Interaction>,
    pub food_interactions: Vec<FoodInteraction>,
    pub condition_interactions: Vec<ConditionInteraction>,
    pub cross_reactivity: Vec<CrossReactivityGroup>,
    pub conditions: Vec<MedicalCondition>,
    pub rules: Vec<DiagnosticRule>,
    pub clusters: Vec<SymptomCluster>,
}

/// Read-only lookup tables for one catalogue version
#[derive(Debug, Clone)]
pub struct Catalogues {
    version: String,
    data: CatalogueData,
    drug_index: HashMap<String, usize>,
    interaction_index: HashMap<String, usize>,
    condition_index: HashMap<String, usize>,
}

impl Catalogues {
    pub fn new(version: impl Into<String>, data: CatalogueData) -> Self {
        let mut drug_index = HashMap::new();
        for (i, drug) in data.drugs.iter().enumerate() {
            for alias in drug.aliases() {
                drug_index.entry(alias).or_insert(i);
            }
        }

        let mut interaction_index = HashMap::new();
        for (i, interaction) in data.interactions.iter().enumerate() {
            interaction_index.entry(interaction.key()).or_insert(i);
        }

        let mut condition_index = HashMap::new();
        for (i, condition) in data.conditions.iter().enumerate() {
            condition_index.entry(lookup_key(&condition.id)).or_insert(i);
            condition_index.entry(lookup_key(&condition.name)).or_insert(i);
        }

        Self {
            version: version.into(),
            data,
            drug_index,
            interaction_index,
            condition_index,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn data(&self) -> &CatalogueData {
        &self.data
    }

    pub fn documents(&self) -> &[Document] {
        &self.data.documents
    }

    pub fn drugs(&self) -> &[Drug] {
        &self.data.drugs
    }

    pub fn conditions(&self) -> &[MedicalCondition] {
        &self.data.conditions
    }

    pub fn rules(&self) -> &[DiagnosticRule] {
        &self.data.rules
    }

    pub fn clusters(&self) -> &[SymptomCluster] {
        &self.data.clusters
    }

    pub fn food_interactions(&self) -> &[FoodInteraction] {
        &self.data.food_interactions
    }

    pub fn condition_interactions(&self) -> &[ConditionInteraction] {
        &self.data.condition_interactions
    }

    pub fn cross_reactivity(&self) -> &[CrossReactivityGroup] {
        &self.data.cross_reactivity
    }

    /// Exact or alias (generic/brand) match
    pub fn find_drug(&self, name: &str) -> Option<&Drug> {
        self.drug_index
            .get(&lookup_key(name))
            .map(|&i| &self.data.drugs[i])
    }

    pub fn find_interaction(&self, drug_a: &str, drug_b: &str) -> Option<&Interaction> {
        self.interaction_index
            .get(&pair_key(drug_a, drug_b))
            .map(|&i| &self.data.interactions[i])
    }

    /// Lookup by condition id or display name
    pub fn find_condition(&self, id_or_name: &str) -> Option<&MedicalCondition> {
        self.condition_index
            .get(&lookup_key(id_or_name))
            .map(|&i| &self.data.conditions[i])
    }
}

/// Holder for the current catalogue snapshot plus the runtime overlay of
/// records discovered through retrieval.
pub struct CatalogueStore {
    current: RwLock<Arc<Catalogues>>,
    discovered_drugs: DashMap<String, Drug>,
    discovered_interactions: DashMap<String, Option<Interaction>>,
}

impl CatalogueStore {
    pub fn new(catalogues: Catalogues) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogues)),
            discovered_drugs: DashMap::new(),
            discovered_interactions: DashMap::new(),
        }
    }

    pub fn seeded() -> Self {
        Self::new(crate::seed::seed_catalogues())
    }

    /// Snapshot held for the duration of one request
    pub fn snapshot(&self) -> Arc<Catalogues> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn version(&self) -> String {
        self.snapshot().version().to_string()
    }

    /// Atomically replace the catalogues. Discovered records are dropped with the old snapshot.
    pub fn swap(&self, catalogues: Catalogues) -> Arc<Catalogues> {
        let next = Arc::new(catalogues);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        self.discovered_drugs.clear();
        self.discovered_interactions.clear();
        info!(
            previous = previous.version(),
            current = next.version(),
            "Catalogues swapped"
        );
        previous
    }

    /// Catalogue drug first, then the runtime overlay
    pub fn find_drug(&self, name: &str) -> Option<Drug> {
        if let Some(drug) = self.snapshot().find_drug(name) {
            return Some(drug.clone());
        }
        self.discovered_drugs
            .get(&lookup_key(name))
            .map(|r| r.value().clone())
    }

    /// Record a drug under its own names and the name the caller asked for
    pub fn insert_discovered_drug(&self, requested_as: &str, drug: Drug) {
        let requested = lookup_key(requested_as);
        if !requested.is_empty() {
            self.discovered_drugs.insert(requested, drug.clone());
        }
        for alias in drug.aliases() {
            self.discovered_drugs.insert(alias, drug.clone());
        }
    }

    /// `Some(None)` means the pair was looked up before and nothing was found.
    pub fn discovered_interaction(&self, drug_a: &str, drug_b: &str) -> Option<Option<Interaction>> {
        self.discovered_interactions
            .get(&pair_key(drug_a, drug_b))
            .map(|r| r.value().clone())
    }

    pub fn insert_discovered_interaction(
        &self,
        drug_a: &str,
        drug_b: &str,
        interaction: Option<Interaction>,
    ) {
        self.discovered_interactions
            .insert(pair_key(drug_a, drug_b), interaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drug::{InteractionSeverity, InteractionSource};

    fn tiny() -> Catalogues {
        let mut data = CatalogueData::default();
        data.drugs.push(Drug {
            id: "warfarin".to_string(),
            name: "Warfarin".to_string(),
            generic_name: "warfarin".to_string(),
            brand_names: vec!["Coumadin".to_string()],
            active_ingredients: vec!["warfarin sodium".to_string()],
            contraindications: vec!["active bleeding".to_string()],
            route: "oral".to_string(),
            therapeutic_class: "anticoagulant".to_string(),
        });
        Catalogues::new("test-1", data)
    }

    #[test]
    fn test_find_drug_by_brand() {
        let catalogues = tiny();
        assert_eq!(catalogues.find_drug("coumadin").unwrap().id, "warfarin");
        assert!(catalogues.find_drug("aspirin").is_none());
    }

    #[test]
    fn test_swap_replaces_snapshot_and_clears_overlay() {
        let store = CatalogueStore::new(tiny());
        store.insert_discovered_drug("Zzyzx", Drug::unresolved("Zzyzx"));
        store.insert_discovered_interaction(
            "a",
            "b",
            Some(Interaction {
                kind: Default::default(),
                drug1: "a".to_string(),
                drug2: "b".to_string(),
                severity: InteractionSeverity::Minor,
                mechanism: String::new(),
                onset: Default::default(),
                probability: 0.1,
                clinical_significance: 1.0,
                management: Default::default(),
                monitoring_parameters: Vec::new(),
                description: String::new(),
                source: InteractionSource::Retrieved,
            }),
        );
        let held = store.snapshot();
        assert!(store.find_drug("zzyzx").is_some());

        let previous = store.swap(Catalogues::new("test-2", CatalogueData::default()));
        assert_eq!(previous.version(), "test-1");
        assert_eq!(store.version(), "test-2");
        // A request holding the old snapshot still sees it
        assert!(held.find_drug("warfarin").is_some());
        assert!(store.find_drug("warfarin").is_none());
        assert!(store.find_drug("zzyzx").is_none());
        assert!(store.discovered_interaction("b", "a").is_none());
    }
}
