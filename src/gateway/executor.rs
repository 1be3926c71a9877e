//! Search gateway: shapes requests into reads against the data source

use super::error::GatewayError;
use super::models::*;
use crate::config::Settings;
use crate::source::{contains_pattern, Page, Row, SelectQuery, TableSource};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rows read for the diagnostic sample on an empty search
const EMPTY_SAMPLE_ROWS: usize = 5;

/// Tunables for the gateway
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Table holding the health topics
    pub table: String,
    pub default_language: String,
    pub default_results: i64,
    pub max_results: i64,
    pub projection: ResponseProjection,
    pub order_by: Option<String>,
    pub sample_on_empty: bool,
    pub language_scan_limit: usize,
}

impl GatewayOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let search = &settings.search;
        Self {
            table: settings.source.table.clone(),
            default_language: search.default_language.clone(),
            default_results: search.default_results,
            max_results: search.max_results,
            projection: search.projection,
            order_by: search.order_by.clone(),
            sample_on_empty: search.sample_on_empty,
            language_scan_limit: search.language_scan_limit,
        }
    }
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Request after defaults and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSearch {
    pub query: String,
    pub language: String,
    pub n_results: i64,
}

/// Search gateway over a tabular data source.
///
/// Stateless between calls; the source is injected so tests can substitute
/// an in-memory table.
pub struct SearchGateway {
    source: Arc<dyn TableSource>,
    options: GatewayOptions,
}

impl SearchGateway {
    pub fn new(source: Arc<dyn TableSource>, options: GatewayOptions) -> Self {
        Self { source, options }
    }

    /// Name of the upstream, echoed in responses
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Apply defaults and check bounds
    pub fn resolve(&self, request: SearchRequest) -> Result<ResolvedSearch, GatewayError> {
        let n_results = request.n_results.unwrap_or(self.options.default_results);
        if n_results <= 0 {
            return Err(GatewayError::ValidationFailed(
                "n_results must be greater than 0".to_string(),
            ));
        }
        if n_results > self.options.max_results {
            return Err(GatewayError::ValidationFailed(format!(
                "n_results must not exceed {}",
                self.options.max_results
            )));
        }

        let language = request
            .language
            .unwrap_or_else(|| self.options.default_language.clone());
        if language.trim().is_empty() {
            return Err(GatewayError::ValidationFailed(
                "language must not be empty".to_string(),
            ));
        }

        Ok(ResolvedSearch {
            query: request.query,
            language,
            n_results,
        })
    }

    /// The single read issued for a search
    pub fn build_query(&self, search: &ResolvedSearch) -> SelectQuery {
        let mut query = SelectQuery::from(&self.options.table)
            .select(self.options.projection.columns())
            .ilike("title", contains_pattern(&search.query))
            .eq("language", &search.language);

        if let Some(ref column) = self.options.order_by {
            query = query.order(column, true);
        }

        query.limit(search.n_results as usize)
    }

    /// Run a title search
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, GatewayError> {
        let search = self.resolve(request)?;
        info!(
            "Searching for query: {} in language: {}",
            search.query, search.language
        );

        let start = Instant::now();
        let rows = self.source.execute(&self.build_query(&search)).await?;
        let results = to_records(rows)?;

        info!(
            "{} results count: {} in {:?}",
            self.source.name(),
            results.len(),
            start.elapsed()
        );

        if results.is_empty() && self.options.sample_on_empty {
            self.log_sample().await;
        }

        Ok(SearchResponse {
            status: Status::Success,
            source: self.source.name().to_string(),
            query: search.query,
            language: search.language,
            n_results: search.n_results,
            count: results.len(),
            results,
        })
    }

    /// Verify the source is reachable with a one-row read. Never fails.
    pub async fn health_check(&self) -> ConnectionStatus {
        let query = SelectQuery::from(&self.options.table)
            .select(HEALTH_COLUMNS)
            .limit(1);

        let outcome = match self.source.execute(&query).await {
            Ok(rows) => to_records(rows),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(sample) => ConnectionStatus::valid(sample),
            Err(e) => {
                warn!("{} connection test error: {}", self.source.name(), e);
                ConnectionStatus::invalid(e.to_string())
            }
        }
    }

    /// List distinct languages with one sample record each.
    ///
    /// Costs one scan of the `language` column plus one read per language,
    /// so it only suits small tables. The scan reads at most
    /// `language_scan_limit` rows; the summary is marked truncated when the
    /// table holds more rows than were read, including when the source caps
    /// the page below the limit.
    pub async fn list_languages(&self) -> Result<LanguageSummary, GatewayError> {
        let limit = self.options.language_scan_limit;
        // one extra row tells a full table apart from a cut-off one when the
        // source reports no total
        let scan = SelectQuery::from(&self.options.table)
            .select(&["language"])
            .limit(limit.saturating_add(1))
            .count_exact();

        let Page { mut rows, total } = self.source.fetch(&scan).await?;
        let truncated = match total {
            Some(total) => total > rows.len().min(limit),
            None => rows.len() > limit,
        };
        rows.truncate(limit);
        let rows_scanned = rows.len();

        if truncated {
            warn!(
                rows_scanned,
                ?total,
                "Language scan stopped early; the language list may be incomplete"
            );
        }

        let languages: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.get("language").and_then(Value::as_str))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect();

        debug!("Fetching samples for {} languages", languages.len());

        let samples = try_join_all(languages.iter().map(|lang| async move {
            let query = SelectQuery::from(&self.options.table)
                .select(SUMMARY_COLUMNS)
                .eq("language", lang)
                .limit(1);
            let rows = self.source.execute(&query).await?;
            let sample = to_records(rows)?.into_iter().next();
            Ok::<_, GatewayError>((lang.clone(), sample))
        }))
        .await?;

        let sample_by_language: BTreeMap<String, MedicalTopicRecord> = samples
            .into_iter()
            .filter_map(|(lang, sample)| sample.map(|s| (lang, s)))
            .collect();

        Ok(LanguageSummary {
            available_languages: languages.into_iter().collect(),
            sample_by_language,
            rows_scanned,
            truncated,
        })
    }

    /// Log a few unfiltered rows to help diagnose empty results
    async fn log_sample(&self) {
        let query = SelectQuery::from(&self.options.table)
            .select(SUMMARY_COLUMNS)
            .limit(EMPTY_SAMPLE_ROWS);

        match self.source.execute(&query).await {
            Ok(rows) => debug!("Sample of table contents: {:?}", rows),
            Err(e) => debug!("Could not sample table contents: {}", e),
        }
    }
}

fn to_records(rows: Vec<Row>) -> Result<Vec<MedicalTopicRecord>, GatewayError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| {
                GatewayError::UpstreamQueryFailed(format!(
                    "invalid response from data source: {}",
                    e
                ))
            })
        })
        .collect()
}
