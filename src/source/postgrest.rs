//! PostgREST (Supabase) data source over HTTP

use super::traits::{Page, Row, SelectQuery, SourceError, TableSource};
use crate::config::SourceSettings;
use async_trait::async_trait;
use reqwest::{header::CONTENT_RANGE, Client, Response};
use serde::Deserialize;
use tracing::debug;

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

/// HTTP client for a PostgREST endpoint.
///
/// Built once at startup and shared; the underlying reqwest client pools
/// connections across requests.
#[derive(Clone)]
pub struct PostgrestSource {
    client: Client,
    name: String,
    rest_url: String,
    api_key: String,
}

impl PostgrestSource {
    /// Create a new source from settings
    pub fn with_settings(settings: &SourceSettings) -> Result<Self, SourceError> {
        let timeout = settings
            .timeout()
            .map_err(|e| SourceError::Misconfigured(e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("medline-search/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let rest_url = format!(
            "{}/{}",
            settings.url.trim_end_matches('/'),
            settings.rest_path.trim_matches('/')
        );

        Ok(Self {
            client,
            name: settings.name.clone(),
            rest_url,
            api_key: settings.key.clone(),
        })
    }

    /// URL of a table resource
    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Query string parameters for a select
    fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), query.columns_param())];

        for filter in &query.filters {
            params.push((filter.column().to_string(), filter.to_postgrest()));
        }

        if let Some(ref order) = query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Parse a response into rows or a rejection
    async fn parse_response(response: Response) -> Result<Page, SourceError> {
        let status = response.status();
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total);
        let text = response.text().await?;

        if !status.is_success() {
            let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (body.message, body.code),
                Err(_) if text.trim().is_empty() => (status.to_string(), None),
                Err(_) => (text, None),
            };
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let rows = serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(Page { rows, total })
    }
}

/// Total from a `Content-Range` value such as `0-999/5230` or `*/0`
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl TableSource for PostgrestSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>, SourceError> {
        self.fetch(query).await.map(|page| page.rows)
    }

    async fn fetch(&self, query: &SelectQuery) -> Result<Page, SourceError> {
        let params = Self::query_params(query);
        debug!(table = %query.table, ?params, "Querying data source");

        let mut request = self
            .client
            .get(self.table_url(&query.table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(&params);
        if query.count {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(url: &str) -> SourceSettings {
        SourceSettings {
            url: url.to_string(),
            key: "test-key".to_string(),
            ..SourceSettings::default()
        }
    }

    #[test]
    fn test_query_params() {
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["topic_id", "title", "language"])
            .ilike("title", "%asthma%")
            .eq("language", "English")
            .order("topic_id", true)
            .limit(5);

        let params = PostgrestSource::query_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "topic_id,title,language".to_string()),
                ("title".to_string(), "ilike.%asthma%".to_string()),
                ("language".to_string(), "eq.English".to_string()),
                ("order".to_string(), "topic_id.asc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_table_url_joins_cleanly() {
        let source =
            PostgrestSource::with_settings(&settings_for("https://abc.supabase.co/")).unwrap();
        assert_eq!(
            source.table_url("MEDLINEPLUS"),
            "https://abc.supabase.co/rest/v1/MEDLINEPLUS"
        );
    }

    #[test]
    fn test_unusable_timeout_is_an_error() {
        let mut settings = settings_for("https://abc.supabase.co");
        settings.timeout_secs = f64::INFINITY;
        assert!(matches!(
            PostgrestSource::with_settings(&settings),
            Err(SourceError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("0-999/5230"), Some(5230));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-9/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_counted_fetch_reads_total_from_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/MEDLINEPLUS"))
            .and(header("prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-range", "0-1/5")
                    .set_body_json(json!([{"language": "English"}, {"language": "English"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = PostgrestSource::with_settings(&settings_for(&server.uri())).unwrap();
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["language"])
            .limit(10)
            .count_exact();
        let page = source.fetch(&query).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, Some(5));
    }

    #[tokio::test]
    async fn test_execute_sends_filters_and_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/MEDLINEPLUS"))
            .and(query_param("select", "topic_id,title"))
            .and(query_param("title", "ilike.%diabetes%"))
            .and(query_param("language", "eq.English"))
            .and(query_param("limit", "2"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"topic_id": 1, "title": "Diabetes"},
                {"topic_id": 2, "title": "Diabetes Type 1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let source = PostgrestSource::with_settings(&settings_for(&server.uri())).unwrap();
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["topic_id", "title"])
            .ilike("title", "%diabetes%")
            .eq("language", "English")
            .limit(2);

        let rows = source.execute(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Diabetes");
    }

    #[tokio::test]
    async fn test_rejection_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "42703",
                "details": null,
                "hint": null,
                "message": "column MEDLINEPLUS.bogus does not exist"
            })))
            .mount(&server)
            .await;

        let source = PostgrestSource::with_settings(&settings_for(&server.uri())).unwrap();
        let err = source
            .execute(&SelectQuery::from("MEDLINEPLUS").select(&["bogus"]))
            .await
            .unwrap_err();

        match &err {
            SourceError::Rejected {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(code.as_deref(), Some("42703"));
                assert_eq!(message, "column MEDLINEPLUS.bogus does not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "column MEDLINEPLUS.bogus does not exist");
    }

    #[tokio::test]
    async fn test_plain_text_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let source = PostgrestSource::with_settings(&settings_for(&server.uri())).unwrap();
        let err = source
            .execute(&SelectQuery::from("MEDLINEPLUS"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_non_array_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let source = PostgrestSource::with_settings(&settings_for(&server.uri())).unwrap();
        let err = source
            .execute(&SelectQuery::from("MEDLINEPLUS"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_transport_error() {
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let source = PostgrestSource::with_settings(&settings_for(&uri)).unwrap();
        let err = source
            .execute(&SelectQuery::from("MEDLINEPLUS").limit(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Transport(_)));
    }
}
