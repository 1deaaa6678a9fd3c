use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use interactions::InteractionRequest;
use knowledge::{Gender, Language, OrganFunction, PatientProfile, Symptom, lookup_key};
use query::SearchQuery;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// External key-value store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process TTL store, bounded to `max_entries`
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl MemoryCacheStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop expired entries, then a quarter of the rest if still full
    fn evict(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() < self.max_entries {
            return;
        }

        let to_remove: Vec<String> = self
            .entries
            .iter()
            .take((self.max_entries / 4).max(1))
            .map(|r| r.key().clone())
            .collect();
        for key in &to_remove {
            self.entries.remove(key);
        }
        debug!(evicted = to_remove.len(), "Cache full, evicted entries");
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if hit {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if self.max_entries == 0 {
            return Ok(());
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict();
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Typed, timeout-bounded access to a [`CacheStore`]. Failures never surface:
/// a failed read is a miss and a failed write is logged.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match timeout(self.timeout, self.store.get(key)).await {
            Ok(Ok(found)) => found?,
            Ok(Err(e)) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                warn!(key, error = %CacheError::Timeout(self.timeout), "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached entry could not be decoded");
                None
            }
        }
    }

    /// Returns whether the entry was written
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Cache write failed: could not encode response");
                return false;
            }
        };

        match timeout(self.timeout, self.store.set_with_expiry(key, bytes, ttl)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(key, error = %e, "Cache write failed, response returned uncached");
                false
            }
            Err(_) => {
                warn!(key, error = %CacheError::Timeout(self.timeout), "Cache write failed, response returned uncached");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    Diagnosis,
    Interactions,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Diagnosis => "diagnosis",
            Operation::Interactions => "interactions",
        }
    }
}

/// Patient fields that influence a result, with list order removed
#[derive(Serialize)]
struct CanonicalPatient {
    age: Option<u32>,
    gender: Option<Gender>,
    current_conditions: Vec<String>,
    medical_history: Vec<String>,
    risk_factors: Vec<String>,
    allergies: Vec<(String, Vec<String>)>,
    smoking: bool,
    kidney_function: OrganFunction,
    liver_function: OrganFunction,
}

fn sorted_keys<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = items.map(|s| lookup_key(s)).filter(|s| !s.is_empty()).collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Sorted but not deduplicated: the entry count feeds the risk score
fn sorted_entries<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut entries: Vec<String> = items.map(|s| lookup_key(s)).collect();
    entries.sort();
    entries
}

impl CanonicalPatient {
    fn from_profile(profile: &PatientProfile) -> Self {
        let mut allergies: Vec<(String, Vec<String>)> = profile
            .allergies
            .iter()
            .map(|a| (lookup_key(&a.drug_name), sorted_keys(a.cross_reactivity.iter())))
            .collect();
        allergies.sort();
        allergies.dedup();

        Self {
            age: profile.age,
            gender: profile.gender,
            current_conditions: sorted_keys(profile.current_conditions.iter()),
            medical_history: sorted_entries(profile.medical_history.iter()),
            risk_factors: sorted_keys(profile.risk_factors.iter()),
            allergies,
            smoking: profile.smoking,
            kidney_function: profile.kidney_function,
            liver_function: profile.liver_function,
        }
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a, T: Serialize> {
    operation: &'static str,
    catalogue_version: &'a str,
    body: T,
}

fn hash_request<T: Serialize>(operation: Operation, catalogue_version: &str, body: T) -> String {
    let canonical = CanonicalRequest {
        operation: operation.as_str(),
        catalogue_version,
        body,
    };
    // Serializing plain structs, vectors and enums cannot fail
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("medkb:{}:{}", operation.as_str(), hex::encode(hasher.finalize()))
}

/// Key for an interaction check. Drug order and letter case do not matter.
pub fn interaction_key(request: &InteractionRequest, catalogue_version: &str) -> String {
    #[derive(Serialize)]
    struct Body {
        drugs: Vec<String>,
        patient: Option<CanonicalPatient>,
        include_food: bool,
        include_conditions: bool,
        language: Language,
    }

    hash_request(
        Operation::Interactions,
        catalogue_version,
        Body {
            drugs: sorted_keys(request.drugs.iter()),
            patient: request.patient.as_ref().map(CanonicalPatient::from_profile),
            include_food: request.include_food,
            include_conditions: request.include_conditions,
            language: request.language,
        },
    )
}

/// Key for a symptom analysis. Symptom order and name case do not matter.
pub fn diagnosis_key(
    symptoms: &[Symptom],
    profile: Option<&PatientProfile>,
    language: Language,
    catalogue_version: &str,
) -> String {
    #[derive(Serialize)]
    struct Body {
        symptoms: Vec<String>,
        patient: Option<CanonicalPatient>,
        language: Language,
    }

    let mut canonical: Vec<String> = symptoms
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.name = lookup_key(&s.name);
            s.triggers = sorted_keys(s.triggers.iter());
            s.associated_symptoms = sorted_keys(s.associated_symptoms.iter());
            serde_json::to_string(&s).unwrap_or_default()
        })
        .collect();
    canonical.sort();

    hash_request(
        Operation::Diagnosis,
        catalogue_version,
        Body {
            symptoms: canonical,
            patient: profile.map(CanonicalPatient::from_profile),
            language,
        },
    )
}

pub fn search_key(query: &SearchQuery, catalogue_version: &str) -> String {
    let mut query = query.clone();
    query.text = lookup_key(&query.text);
    query.categories.sort_by_key(|c| c.as_str());
    query.categories.dedup();
    hash_request(Operation::Search, catalogue_version, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::{Allergy, SymptomSeverity};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Broken {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for Broken {
        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Unavailable("connection reset".to_string()))
        }

        async fn set_with_expiry(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryCacheStore::new(10);
        store
            .set_with_expiry("a", b"1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_with_expiry("b", b"2".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("b").await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_stays_bounded() {
        let store = MemoryCacheStore::new(8);
        for i in 0..50 {
            store
                .set_with_expiry(&format!("k{}", i), vec![i as u8], Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert!(store.len() <= 8);
        assert_eq!(store.get("k49").await.unwrap(), Some(vec![49]));
    }

    #[tokio::test]
    async fn test_gateway_failures_are_misses() {
        let broken = Arc::new(Broken {
            writes: AtomicUsize::new(0),
        });
        let gateway = CacheGateway::new(broken.clone(), Duration::from_millis(100));

        assert_eq!(gateway.get::<String>("k").await, None);
        assert!(!gateway.set("k", &"v".to_string(), Duration::from_secs(1)).await);
        assert_eq!(broken.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gateway_round_trip() {
        let gateway = CacheGateway::new(Arc::new(MemoryCacheStore::new(4)), Duration::from_millis(100));
        assert!(gateway.set("k", &vec![1u32, 2, 3], Duration::from_secs(5)).await);
        assert_eq!(gateway.get::<Vec<u32>>("k").await, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_interaction_key_is_canonical() {
        let a = InteractionRequest::new(&["Warfarin", "aspirin"]).patient(PatientProfile {
            age: Some(70),
            allergies: vec![Allergy::new("Penicillin")],
            current_conditions: vec!["Asthma".to_string(), "gout".to_string()],
            ..Default::default()
        });
        let b = InteractionRequest::new(&["Aspirin ", "warfarin"]).patient(PatientProfile {
            age: Some(70),
            allergies: vec![Allergy::new("penicillin")],
            current_conditions: vec!["Gout".to_string(), "asthma".to_string()],
            ..Default::default()
        });
        assert_eq!(interaction_key(&a, "v1"), interaction_key(&b, "v1"));
        assert_ne!(interaction_key(&a, "v1"), interaction_key(&a, "v2"));

        let mut other_language = a.clone();
        other_language.language = Language::Es;
        assert_ne!(interaction_key(&a, "v1"), interaction_key(&other_language, "v1"));

        let mut younger = a.clone();
        if let Some(p) = younger.patient.as_mut() {
            p.age = Some(30);
        }
        assert_ne!(interaction_key(&a, "v1"), interaction_key(&younger, "v1"));
    }

    #[test]
    fn test_diagnosis_key_ignores_symptom_order() {
        let fever = Symptom::new("Fever", SymptomSeverity::Moderate);
        let headache = Symptom::new("headache", SymptomSeverity::Mild);
        let a = diagnosis_key(&[fever.clone(), headache.clone()], None, Language::En, "v1");
        let b = diagnosis_key(&[headache.clone(), fever.clone()], None, Language::En, "v1");
        assert_eq!(a, b);

        let severe = Symptom::new("Fever", SymptomSeverity::Severe);
        assert_ne!(a, diagnosis_key(&[severe, headache], None, Language::En, "v1"));
    }

    #[test]
    fn test_diagnosis_key_keeps_history_apart_from_current_conditions() {
        let fever = [Symptom::new("fever", SymptomSeverity::Moderate)];
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let key = |current: &[&str], history: &[&str]| {
            let profile = PatientProfile {
                current_conditions: strings(current),
                medical_history: strings(history),
                ..Default::default()
            };
            diagnosis_key(&fever, Some(&profile), Language::En, "v1")
        };

        // Four history entries score higher than two
        assert_ne!(key(&[], &["a", "b", "c", "d"]), key(&["a", "b"], &["c", "d"]));
        assert_ne!(key(&[], &["a", "a", "b", "c"]), key(&[], &["a", "b", "c"]));
        assert_eq!(key(&[], &["B", "a"]), key(&[], &["a", "b"]));
        assert_eq!(key(&["Gout", "gout"], &[]), key(&["gout"], &[]));
    }

    #[test]
    fn test_search_key_distinguishes_mode() {
        let q = SearchQuery::new("Migraine", Language::En);
        let lower = SearchQuery::new(" migraine", Language::En);
        assert_eq!(search_key(&q, "v1"), search_key(&lower, "v1"));
        let keyword = q.clone().mode(query::SearchMode::Keyword);
        assert_ne!(search_key(&q, "v1"), search_key(&keyword, "v1"));
    }
}
