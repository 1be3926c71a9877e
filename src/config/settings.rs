//! Settings structures for the search gateway

use crate::gateway::ResponseProjection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid data source configuration: {0}")]
    InvalidSource(String),

    #[error("invalid CORS configuration: {0}")]
    InvalidCors(String),

    #[error("invalid search configuration: {0}")]
    InvalidSearch(String),
}

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub source: SourceSettings,
    pub search: SearchSettings,
    pub cors: CorsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            server: ServerSettings::default(),
            source: SourceSettings::default(),
            search: SearchSettings::default(),
            cors: CorsSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Merge with process environment variables
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Merge with variables resolved by `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("MEDLINE_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("MEDLINE_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = lookup("SUPABASE_URL") {
            self.source.url = val;
        }
        if let Some(val) = lookup("SUPABASE_KEY") {
            self.source.key = val;
        }
        if let Some(val) = lookup("SUPABASE_TABLE") {
            self.source.table = val;
        }
        if let Some(val) = lookup("MEDLINE_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = val
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Check the settings before the service starts
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.source.validate()?;
        self.search.validate()?;
        self.cors.validate()?;
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Name reported by the root endpoint
    pub service_name: String,
    /// Greeting returned by the hello endpoint
    pub greeting: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            service_name: "Medical History Search API".to_string(),
            greeting: "Hello from the Medical History Search API".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// External data source settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Name echoed in search responses
    pub name: String,
    /// Project endpoint, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Access key; never serialized or logged
    #[serde(skip_serializing)]
    pub key: String,
    /// REST path appended to the endpoint
    pub rest_path: String,
    /// Table holding the health topics
    pub table: String,
    /// Request timeout in seconds
    pub timeout_secs: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            name: "supabase".to_string(),
            url: String::new(),
            key: String::new(),
            rest_path: "/rest/v1".to_string(),
            table: "MEDLINEPLUS".to_string(),
            timeout_secs: 10.0,
        }
    }
}

impl fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSettings")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("rest_path", &self.rest_path)
            .field("table", &self.table)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SourceSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.url.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_URL"));
        }
        if self.key.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_KEY"));
        }
        let url = Url::parse(&self.url)
            .map_err(|e| SettingsError::InvalidSource(format!("bad url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidSource(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if self.table.trim().is_empty() {
            return Err(SettingsError::Missing("source.table"));
        }
        self.timeout()?;
        Ok(())
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Result<Duration, SettingsError> {
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(SettingsError::InvalidSource(format!(
                "timeout_secs must be a positive number of seconds, got {}",
                self.timeout_secs
            ))),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Language used when the request names none
    pub default_language: String,
    /// Row count used when the request names none
    pub default_results: i64,
    /// Largest accepted `n_results`
    pub max_results: i64,
    /// Columns returned by search
    pub projection: ResponseProjection,
    /// Explicit ordering column; source default order when unset
    pub order_by: Option<String>,
    /// Log a small unfiltered sample when a search matches nothing
    pub sample_on_empty: bool,
    /// Maximum rows read by the language listing scan
    pub language_scan_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_language: "English".to_string(),
            default_results: 5,
            max_results: 100,
            projection: ResponseProjection::default(),
            order_by: None,
            sample_on_empty: false,
            language_scan_limit: 10_000,
        }
    }
}

impl SearchSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.max_results <= 0 {
            return Err(SettingsError::InvalidSearch(
                "max_results must be positive".to_string(),
            ));
        }
        if self.default_results <= 0 || self.default_results > self.max_results {
            return Err(SettingsError::InvalidSearch(format!(
                "default_results must be between 1 and {}",
                self.max_results
            )));
        }
        if self.language_scan_limit == 0 {
            return Err(SettingsError::InvalidSearch(
                "language_scan_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    /// Exact origins, `*`, or patterns with one `*` (e.g. `https://app-*.example.com`)
    pub allowed_origins: Vec<String>,
    /// Send `Access-Control-Allow-Credentials: true`
    pub allow_credentials: bool,
    /// Allowed request methods
    pub allowed_methods: Vec<String>,
    /// Allowed request headers
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime in seconds
    pub max_age_secs: u64,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            allow_credentials: true,
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["content-type".to_string(), "accept".to_string()],
            max_age_secs: 3600,
        }
    }
}

impl CorsSettings {
    /// Whether any origin is allowed
    pub fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        if self.allowed_origins.is_empty() {
            return Err(SettingsError::InvalidCors(
                "at least one allowed origin is required".to_string(),
            ));
        }
        if self.is_wildcard() && self.allowed_origins.len() > 1 {
            return Err(SettingsError::InvalidCors(
                "'*' cannot be mixed with explicit origins".to_string(),
            ));
        }
        if self.is_wildcard() && self.allow_credentials {
            return Err(SettingsError::InvalidCors(
                "wildcard origin cannot be combined with credentials".to_string(),
            ));
        }
        if self
            .allowed_headers
            .iter()
            .chain(self.allowed_methods.iter())
            .any(|v| v == "*")
        {
            return Err(SettingsError::InvalidCors(
                "methods and headers must be listed explicitly".to_string(),
            ));
        }
        for origin in &self.allowed_origins {
            if origin != "*" && origin.matches('*').count() > 1 {
                return Err(SettingsError::InvalidCors(format!(
                    "origin pattern '{}' may contain at most one '*'",
                    origin
                )));
            }
        }
        Ok(())
    }
}
