use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use extract::{FieldExtractor, KeywordFieldExtractor};
use index::{RetrievalError, ScoredDocument};
use knowledge::{
    Catalogues, DocumentCategory, Drug, Interaction, InteractionKind, InteractionSource, Language,
    disclaimer, lookup_key,
};
use query::HybridSearchEngine;

use crate::context::{self, management_for};
use crate::model::{
    Alternative, DrugResolution, InteractionRequest, InteractionResult, ResolvedDrug,
};
use crate::report::{self, RiskMultipliers};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Minimum retrieval score for mapping a drug name onto a monograph
    pub drug_lookup_threshold: f64,
    /// Minimum retrieval score for a document describing a drug pair
    pub interaction_threshold: f64,
    pub interaction_search_limit: usize,
    /// Upper bound on concurrent lookups
    pub max_parallel: usize,
    pub alternatives_limit: usize,
    pub multipliers: RiskMultipliers,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            drug_lookup_threshold: 0.8,
            interaction_threshold: 0.5,
            interaction_search_limit: 3,
            max_parallel: 4,
            alternatives_limit: 3,
            multipliers: RiskMultipliers::default(),
        }
    }
}

/// Drug interaction checking over the drug catalogue, its runtime overlay and
/// semantic retrieval.
#[derive(Clone)]
pub struct InteractionEngine {
    search: HybridSearchEngine,
    extractor: Arc<dyn FieldExtractor>,
    settings: InteractionSettings,
}

impl InteractionEngine {
    pub fn new(search: HybridSearchEngine, settings: InteractionSettings) -> Self {
        Self::with_extractor(search, Arc::new(KeywordFieldExtractor::new()), settings)
    }

    pub fn with_extractor(
        search: HybridSearchEngine,
        extractor: Arc<dyn FieldExtractor>,
        settings: InteractionSettings,
    ) -> Self {
        Self {
            search,
            extractor,
            settings,
        }
    }

    #[tracing::instrument(skip_all, fields(drugs = request.drugs.len(), language = request.language.code()))]
    pub async fn check(&self, request: &InteractionRequest) -> InteractionResult {
        let catalogues = self.search.store().snapshot();
        let profile = request.patient.as_ref();
        let mut degraded = false;

        // Step 1-2: Resolve drug names to records
        let (drugs, failed) = self.resolve_drugs(&catalogues, &request.drugs, request.language).await;
        degraded |= failed;

        // Step 3: Pairwise drug-drug interactions
        let (mut interactions, failed) = self.pairwise(&catalogues, &drugs, request.language).await;
        degraded |= failed;

        // Step 4: Food, condition and allergy context
        if request.include_food {
            interactions.extend(context::food_interactions(&catalogues, &drugs));
        }
        if let Some(profile) = profile {
            if request.include_conditions {
                interactions.extend(context::condition_interactions(
                    &catalogues,
                    self.extractor.as_ref(),
                    &drugs,
                    profile,
                ));
            }
            interactions.extend(context::allergy_interactions(&catalogues, &drugs, profile));
        }

        // Step 5-7: Alerts, risk, safety
        let alerts = report::alerts(&interactions);
        let risk_score = report::risk_score(&interactions, profile, &self.settings.multipliers);
        let safety_profile = report::safety_profile(&interactions, &risk_score, &drugs, profile);

        // Step 8: Recommendations
        let mut recommendations = report::recommendations(&interactions, request.language);
        let (alternatives, failed) = self
            .alternatives(&catalogues, &interactions, &drugs, profile, request.language)
            .await;
        recommendations.alternatives = alternatives;
        degraded |= failed;

        info!(
            drugs = drugs.len(),
            interactions = interactions.len(),
            level = ?safety_profile.level,
            degraded,
            "Interaction check complete"
        );

        InteractionResult {
            drugs,
            interactions,
            alerts,
            risk_score,
            safety_profile,
            recommendations,
            disclaimer: disclaimer(request.language).to_string(),
            degraded,
            catalogue_version: catalogues.version().to_string(),
        }
    }

    /// Resolve in input order. Duplicate inputs naming the same drug collapse to one.
    async fn resolve_drugs(
        &self,
        catalogues: &Catalogues,
        names: &[String],
        language: Language,
    ) -> (Vec<ResolvedDrug>, bool) {
        let pending: Vec<_> = names
            .iter()
            .filter(|n| !n.trim().is_empty())
            .map(|name| self.resolve_drug(catalogues, name, language))
            .collect();
        let outcomes: Vec<(ResolvedDrug, bool)> = stream::iter(pending)
            .buffered(self.settings.max_parallel.max(1))
            .collect()
            .await;

        let mut degraded = false;
        let mut drugs: Vec<ResolvedDrug> = Vec::new();
        for (drug, failed) in outcomes {
            degraded |= failed;
            if drugs.iter().any(|d| d.drug.id == drug.drug.id) {
                debug!(input = %drug.input, "Duplicate drug in request");
                continue;
            }
            drugs.push(drug);
        }
        (drugs, degraded)
    }

    async fn resolve_drug(&self, catalogues: &Catalogues, name: &str, language: Language) -> (ResolvedDrug, bool) {
        let resolved = |drug: Drug, resolution| ResolvedDrug {
            input: name.to_string(),
            drug,
            resolution,
        };

        if let Some(drug) = catalogues.find_drug(name) {
            return (resolved(drug.clone(), DrugResolution::Registry), false);
        }
        if let Some(drug) = self.search.store().find_drug(name) {
            return (resolved(drug, DrugResolution::Retrieved), false);
        }

        match self
            .search
            .lookup(name, language, &[DocumentCategory::Drug], self.settings.drug_lookup_threshold)
            .await
        {
            Ok(Some(hit)) => {
                if let Some(drug) = catalogues.find_drug(&hit.document.title) {
                    return (resolved(drug.clone(), DrugResolution::Registry), false);
                }
                let drug = self.extractor.drug_record(&hit.document);
                self.search.store().insert_discovered_drug(name, drug.clone());
                debug!(input = name, drug = %drug.name, "Drug resolved from retrieval");
                (resolved(drug, DrugResolution::Retrieved), false)
            }
            Ok(None) => {
                warn!(input = name, "Unrecognized drug name, passing through unverified");
                (resolved(Drug::unresolved(name), DrugResolution::Unverified), false)
            }
            Err(e) => {
                warn!(input = name, error = %e, "Drug lookup unavailable");
                (resolved(Drug::unresolved(name), DrugResolution::Unverified), true)
            }
        }
    }

    /// Every unordered pair, looked up with bounded concurrency and returned in pair order
    async fn pairwise(
        &self,
        catalogues: &Catalogues,
        drugs: &[ResolvedDrug],
        language: Language,
    ) -> (Vec<Interaction>, bool) {
        let pairs: Vec<(usize, usize)> = (0..drugs.len())
            .flat_map(|i| (i + 1..drugs.len()).map(move |j| (i, j)))
            .collect();

        let mut outcomes: Vec<((usize, usize), Result<Option<Interaction>, RetrievalError>)> =
            stream::iter(pairs)
                .map(|(i, j)| async move {
                    let found = self.pair_interaction(catalogues, &drugs[i], &drugs[j], language).await;
                    ((i, j), found)
                })
                .buffer_unordered(self.settings.max_parallel.max(1))
                .collect()
                .await;
        outcomes.sort_by_key(|(pair, _)| *pair);

        let mut degraded = false;
        let mut interactions = Vec::new();
        for ((i, j), outcome) in outcomes {
            match outcome {
                Ok(Some(interaction)) => interactions.push(interaction),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        drug1 = %drugs[i].key_name(),
                        drug2 = %drugs[j].key_name(),
                        error = %e,
                        "Interaction search unavailable"
                    );
                    degraded = true;
                }
            }
        }
        (interactions, degraded)
    }

    async fn pair_interaction(
        &self,
        catalogues: &Catalogues,
        a: &ResolvedDrug,
        b: &ResolvedDrug,
        language: Language,
    ) -> Result<Option<Interaction>, RetrievalError> {
        if let Some(found) = catalogues.find_interaction(a.key_name(), b.key_name()) {
            return Ok(Some(found.clone()));
        }
        let store = self.search.store();
        if let Some(cached) = store.discovered_interaction(a.key_name(), b.key_name()) {
            return Ok(cached);
        }

        let text = format!("{} {} interaction", a.drug.name, b.drug.name);
        let hits = self
            .search
            .retrieve(
                &text,
                language,
                &[DocumentCategory::Drug, DocumentCategory::Treatment],
                self.settings.interaction_search_limit,
                self.settings.interaction_threshold,
            )
            .await?;

        let found = hits
            .iter()
            .find(|hit| self.mentions_drug(hit, a) && self.mentions_drug(hit, b))
            .map(|hit| self.classify(a, b, hit));

        store.insert_discovered_interaction(a.key_name(), b.key_name(), found.clone());
        Ok(found)
    }

    fn mentions_drug(&self, hit: &ScoredDocument, drug: &ResolvedDrug) -> bool {
        let text = hit.document.full_text();
        self.extractor.mentions(&text, &drug.drug.name)
            || self.extractor.mentions(&text, &drug.drug.generic_name)
    }

    /// Severity and onset come from the retrieved text; probability from retrieval relevance
    fn classify(&self, a: &ResolvedDrug, b: &ResolvedDrug, hit: &ScoredDocument) -> Interaction {
        let text = hit.document.full_text();
        let severity = self.extractor.severity(&text);
        Interaction {
            kind: InteractionKind::DrugDrug,
            drug1: a.key_name().to_string(),
            drug2: b.key_name().to_string(),
            severity,
            mechanism: self.extractor.mechanism(&hit.document.content),
            onset: self.extractor.onset(&text),
            probability: hit.score.clamp(0.0, 1.0),
            clinical_significance: severity.weight() / 10.0,
            management: management_for(severity),
            monitoring_parameters: self.extractor.monitoring_parameters(&hit.document.content),
            description: hit.document.title.clone(),
            source: InteractionSource::Retrieved,
        }
    }

    async fn alternatives(
        &self,
        catalogues: &Catalogues,
        interactions: &[Interaction],
        drugs: &[ResolvedDrug],
        profile: Option<&knowledge::PatientProfile>,
        language: Language,
    ) -> (Vec<Alternative>, bool) {
        let involved = report::contraindicated_drugs(interactions, drugs);
        if involved.is_empty() {
            return (Vec::new(), false);
        }

        // Never suggest something the patient is allergic or cross-reactive to
        let mut excluded: HashSet<String> = HashSet::new();
        for drug in &involved {
            excluded.insert(lookup_key(drug.key_name()));
        }
        if let Some(profile) = profile {
            for candidate in catalogues.drugs() {
                let candidate_drug = ResolvedDrug {
                    input: candidate.name.clone(),
                    drug: candidate.clone(),
                    resolution: DrugResolution::Registry,
                };
                let allergic = profile.allergies.iter().any(|allergy| {
                    candidate.matches_name(&allergy.drug_name)
                        || context::cross_reacts(
                            catalogues,
                            &candidate_drug,
                            &lookup_key(&allergy.drug_name),
                            &allergy.cross_reactivity,
                        )
                });
                if allergic {
                    excluded.insert(lookup_key(&candidate.generic_name));
                }
            }
        }

        let mut degraded = false;
        let mut alternatives = Vec::new();
        for drug in involved {
            let mut alternative = report::catalogue_alternatives(
                catalogues,
                drug,
                drugs,
                &excluded,
                self.settings.alternatives_limit,
            );
            if alternative.candidates.is_empty() && !drug.drug.therapeutic_class.is_empty() {
                match self.retrieved_alternatives(drug, &excluded, language).await {
                    Ok(found) => alternative.candidates = found,
                    Err(e) => {
                        warn!(drug = %drug.drug.name, error = %e, "Alternative search unavailable");
                        degraded = true;
                    }
                }
            }
            if !alternative.candidates.is_empty() {
                alternatives.push(alternative);
            }
        }
        (alternatives, degraded)
    }

    /// Same-class drugs found through retrieval when the catalogue has none
    async fn retrieved_alternatives(
        &self,
        drug: &ResolvedDrug,
        excluded: &HashSet<String>,
        language: Language,
    ) -> Result<Vec<String>, RetrievalError> {
        let class = lookup_key(&drug.drug.therapeutic_class);
        let hits = self
            .search
            .retrieve(
                &drug.drug.therapeutic_class,
                language,
                &[DocumentCategory::Drug],
                self.settings.alternatives_limit * 2,
                self.settings.drug_lookup_threshold / 2.0,
            )
            .await?;

        Ok(hits
            .iter()
            .map(|hit| self.extractor.drug_record(&hit.document))
            .filter(|candidate| lookup_key(&candidate.therapeutic_class) == class)
            .filter(|candidate| !drug.drug.matches_name(&candidate.name))
            .filter(|candidate| !excluded.contains(&lookup_key(&candidate.generic_name)))
            .map(|candidate| candidate.name)
            .take(self.settings.alternatives_limit)
            .collect())
    }
}
