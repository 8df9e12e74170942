use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::normalize::normalize;

pub const DEFAULT_NAME: &str = "Unnamed Assessment";
pub const DEFAULT_DESCRIPTION: &str = "No description available.";
pub const DEFAULT_JOB_LEVELS: &str = "General";
pub const DEFAULT_TEST_TYPE: &str = "Unknown";
pub const DEFAULT_LENGTH: &str = "Not specified";
pub const DEFAULT_FLAG: &str = "No";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AssessmentLength {
    Minutes(serde_json::Number),
    Text(String),
}

impl Default for AssessmentLength {
    fn default() -> Self {
        Self::Text(DEFAULT_LENGTH.to_string())
    }
}

impl fmt::Display for AssessmentLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(f, "{minutes}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueFields {
    pub name: String,
    pub description: String,
    pub job_levels: String,
    pub test_type: String,
    pub length: AssessmentLength,
    pub remote: String,
    pub adaptive: String,
    pub url: String,
}

impl Default for CatalogueFields {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            job_levels: DEFAULT_JOB_LEVELS.to_string(),
            test_type: DEFAULT_TEST_TYPE.to_string(),
            length: AssessmentLength::default(),
            remote: DEFAULT_FLAG.to_string(),
            adaptive: DEFAULT_FLAG.to_string(),
            url: String::new(),
        }
    }
}

/// Fields are read-only so the canonical text derived in `new` never goes
/// stale.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogueItem {
    name: String,
    description: String,
    job_levels: String,
    test_type: String,
    length: AssessmentLength,
    remote: String,
    adaptive: String,
    url: String,
    canonical_text: String,
}

impl CatalogueItem {
    pub fn new(fields: CatalogueFields) -> Self {
        let canonical_text = canonical_text(&fields);
        Self {
            name: fields.name,
            description: fields.description,
            job_levels: fields.job_levels,
            test_type: fields.test_type,
            length: fields.length,
            remote: fields.remote,
            adaptive: fields.adaptive,
            url: fields.url,
            canonical_text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn job_levels(&self) -> &str {
        &self.job_levels
    }

    pub fn test_type(&self) -> &str {
        &self.test_type
    }

    pub fn length(&self) -> &AssessmentLength {
        &self.length
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn adaptive(&self) -> &str {
        &self.adaptive
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn canonical_text(&self) -> &str {
        &self.canonical_text
    }

    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn fields(&self) -> CatalogueFields {
        CatalogueFields {
            name: self.name.clone(),
            description: self.description.clone(),
            job_levels: self.job_levels.clone(),
            test_type: self.test_type.clone(),
            length: self.length.clone(),
            remote: self.remote.clone(),
            adaptive: self.adaptive.clone(),
            url: self.url.clone(),
        }
    }
}

pub fn canonical_text(fields: &CatalogueFields) -> String {
    format!(
        "Assessment: {}\nDescription: {}\nSuitable For: {}\nTest Type: {}\nDuration: {}\nRemote Testing: {}\nAdaptive/IRT: {}\nURL: {}",
        fields.name,
        fields.description,
        fields.job_levels,
        fields.test_type,
        fields.length,
        fields.remote,
        fields.adaptive,
        fields.url,
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ResolutionPath {
    KeywordOverride { keyword: String },
    Vector,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedItem {
    pub position: usize,
    pub score: Option<f32>,
    pub item: CatalogueItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub query: String,
    pub resolution: ResolutionPath,
    pub hits: Vec<RankedItem>,
}

impl Recommendation {
    pub fn into_items(self) -> Vec<CatalogueItem> {
        self.hits.into_iter().map(|hit| hit.item).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordOverride {
    pub triggers: Vec<String>,
    pub keyword: String,
}

impl Default for KeywordOverride {
    fn default() -> Self {
        Self {
            triggers: ["spanish", "language proficiency", "beginner", "foreign language"]
                .into_iter()
                .map(String::from)
                .collect(),
            keyword: "spanish".to_string(),
        }
    }
}

impl KeywordOverride {
    // substring match, so "beginners" fires the "beginner" trigger
    pub fn is_triggered(&self, normalized_query: &str) -> bool {
        self.triggers
            .iter()
            .map(|trigger| normalize(trigger))
            .filter(|trigger| !trigger.is_empty())
            .any(|trigger| normalized_query.contains(&trigger))
    }

    pub fn matches(&self, item: &CatalogueItem) -> bool {
        item.canonical_text()
            .to_lowercase()
            .contains(&self.keyword.to_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub overrides: Vec<KeywordOverride>,
    pub embedding_timeout: Option<Duration>,
    pub max_concurrent_embeddings: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            overrides: vec![KeywordOverride::default()],
            embedding_timeout: Some(Duration::from_secs(30)),
            max_concurrent_embeddings: None,
        }
    }
}
