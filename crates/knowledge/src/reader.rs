use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::catalogue::{CatalogueData, Catalogues};
use crate::error::KnowledgeError;
use crate::generate_doc_id;
use crate::seed;

pub struct CatalogueReader;

impl CatalogueReader {
    /// Load every catalogue table found in `dir`. Tables without a file keep their seeded contents.
    pub async fn read_directory(dir: &Path) -> Result<Catalogues, KnowledgeError> {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            return Err(KnowledgeError::MissingDirectory(dir.to_path_buf()));
        }

        let mut data = seed::seed_data();
        let mut hasher = Sha256::new();
        let mut loaded = 0usize;

        macro_rules! table {
            ($file:literal, $field:ident) => {
                if let Some((rows, raw)) = Self::read_table(&dir.join($file)).await? {
                    hasher.update($file.as_bytes());
                    hasher.update(&raw);
                    data.$field = rows;
                    loaded += 1;
                }
            };
        }

        table!("documents.json", documents);
        table!("drugs.json", drugs);
        table!("interactions.json", interactions);
        table!("food_interactions.json", food_interactions);
        table!("condition_interactions.json", condition_interactions);
        table!("cross_reactivity.json", cross_reactivity);
        table!("conditions.json", conditions);
        table!("rules.json", rules);
        table!("clusters.json", clusters);

        Self::assign_missing_ids(&mut data);

        let version = if loaded == 0 {
            seed::SEED_VERSION.to_string()
        } else {
            hex::encode(&hasher.finalize()[..8])
        };

        info!(
            dir = %dir.display(),
            tables_loaded = loaded,
            version = %version,
            "Catalogues loaded"
        );

        Ok(Catalogues::new(version, data))
    }

    async fn read_table<T: DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<(Vec<T>, Vec<u8>)>, KnowledgeError> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Catalogue table not present, keeping seed");
            return Ok(None);
        }

        let raw = fs::read(path).await.map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rows = serde_json::from_slice(&raw).map_err(|source| KnowledgeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some((rows, raw)))
    }

    fn assign_missing_ids(data: &mut CatalogueData) {
        for doc in data.documents.iter_mut().filter(|d| d.id.trim().is_empty()) {
            doc.id = generate_doc_id(&doc.title, &doc.metadata.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_directory() {
        let result = CatalogueReader::read_directory(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(KnowledgeError::MissingDirectory(_))));
    }

    #[tokio::test]
    async fn test_partial_directory_keeps_seed_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("drugs.json"),
            r#"[{"id": "zolpidem", "name": "Zolpidem", "generic_name": "zolpidem", "therapeutic_class": "hypnotic"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("documents.json"),
            r#"[{"title": "Insomnia", "content": "Trouble sleeping", "category": "disease", "metadata": {"source": "local"}}]"#,
        )
        .unwrap();

        let catalogues = CatalogueReader::read_directory(dir.path()).await.unwrap();
        assert_ne!(catalogues.version(), seed::SEED_VERSION);
        assert_eq!(catalogues.drugs().len(), 1);
        assert!(catalogues.find_drug("zolpidem").is_some());
        // Untouched tables come from the seed
        assert!(!catalogues.rules().is_empty());
        assert_eq!(catalogues.documents()[0].id.len(), 32);
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rules.json"), "{not json").unwrap();
        let result = CatalogueReader::read_directory(dir.path()).await;
        assert!(matches!(result, Err(KnowledgeError::Parse { .. })));
    }
}
