use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Symptom,
    Disease,
    Treatment,
    Drug,
    Procedure,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Symptom => "symptom",
            DocumentCategory::Disease => "disease",
            DocumentCategory::Treatment => "treatment",
            DocumentCategory::Drug => "drug",
            DocumentCategory::Procedure => "procedure",
        }
    }
}

/// Request/document language. Codes outside the supported set parse as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    #[serde(other)]
    Unknown,
}

impl Language {
    /// Parse a BCP-47-ish code ("en", "en-US", "ES").
    pub fn from_code(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        match primary.as_str() {
            "en" => Language::En,
            "es" => Language::Es,
            "fr" => Language::Fr,
            _ => Language::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source trust in [0, 1]
    #[serde(default = "default_reliability")]
    pub reliability: f64,
}

fn default_reliability() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: DocumentCategory,
    #[serde(default)]
    pub language: Language,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Title and content joined, the text every scorer looks at
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    pub fn reliability(&self) -> f64 {
        self.metadata.reliability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("en-US"), Language::En);
        assert_eq!(Language::from_code("ES"), Language::Es);
        assert_eq!(Language::from_code("de"), Language::Unknown);
        assert_eq!(Language::from_code(""), Language::Unknown);
    }

    #[test]
    fn test_unknown_language_deserializes() {
        let lang: Language = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(lang, Language::Unknown);
    }
}
