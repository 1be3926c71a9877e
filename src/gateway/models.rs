//! Request, record and envelope models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Columns of the summary projection
pub const SUMMARY_COLUMNS: &[&str] = &["topic_id", "title", "language"];

/// Columns of the full projection
pub const FULL_COLUMNS: &[&str] = &[
    "topic_id",
    "title",
    "language",
    "url",
    "meta_desc",
    "full_summary",
    "aliases",
    "mesh_headings",
    "groups",
    "primary_institute",
    "date_created",
];

/// Columns read by the health check
pub const HEALTH_COLUMNS: &[&str] = &["topic_id", "title"];

/// Column subset returned by search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseProjection {
    /// `topic_id`, `title`, `language`
    #[default]
    Summary,
    /// Every descriptive field
    Full,
}

impl ResponseProjection {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ResponseProjection::Summary => SUMMARY_COLUMNS,
            ResponseProjection::Full => FULL_COLUMNS,
        }
    }
}

/// Incoming search request.
///
/// Omitted fields fall back to the configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Substring matched case-insensitively against titles
    pub query: String,
    /// Maximum number of rows
    #[serde(default)]
    pub n_results: Option<i64>,
    /// Exact-match language filter
    #[serde(default)]
    pub language: Option<String>,
}

impl SearchRequest {
    /// Create a request using the default row count and language
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            n_results: None,
            language: None,
        }
    }

    pub fn with_results(mut self, n_results: i64) -> Self {
        self.n_results = Some(n_results);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Health topic identifier, numeric or textual depending on the table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicId::Number(n) => write!(f, "{}", n),
            TopicId::Text(s) => f.write_str(s),
        }
    }
}

/// A MedlinePlus health topic row. Fields outside the active projection
/// are absent; nulls inside the row are passed through as nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalTopicRecord {
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_headings: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_institute: Option<String>,
    /// Creation timestamp as rendered by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

/// Outcome marker shared by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Search envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: Status,
    /// Upstream that served the rows
    pub source: String,
    pub query: String,
    pub language: String,
    pub n_results: i64,
    /// Number of rows in `results`
    pub count: usize,
    pub results: Vec<MedicalTopicRecord>,
}

/// Reachability of the external source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connection {
    Valid,
    Invalid,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: Status,
    pub connection: Connection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Vec<MedicalTopicRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ConnectionStatus {
    pub fn valid(sample_data: Vec<MedicalTopicRecord>) -> Self {
        Self {
            status: Status::Success,
            connection: Connection::Valid,
            sample_data: Some(sample_data),
            error: None,
            checked_at: Utc::now(),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            connection: Connection::Invalid,
            sample_data: None,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.connection == Connection::Valid
    }
}

/// Languages present in the table with one sample record each
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageSummary {
    /// Distinct non-null languages, sorted
    pub available_languages: Vec<String>,
    pub sample_by_language: BTreeMap<String, MedicalTopicRecord>,
    /// Rows read by the language scan
    pub rows_scanned: usize,
    /// The scan hit its row bound, so languages may be missing
    pub truncated: bool,
}
