//! Source traits and query types

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single row as returned by the data source
pub type Row = Map<String, Value>;

/// Errors raised while reading from a data source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request never produced a response (connect, TLS, timeout)
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// The source answered with an error status
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// The source answered with a body we could not read
    #[error("invalid response from data source: {0}")]
    Decode(String),
    /// The source is not reachable at all
    #[error("{0}")]
    Unavailable(String),
    /// The source cannot be built from its settings
    #[error("invalid data source configuration: {0}")]
    Misconfigured(String),
}

/// A row filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-insensitive LIKE match (`%` any run, `_` any char, `\` escapes)
    ILike { column: String, pattern: String },
    /// Exact equality
    Eq { column: String, value: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::ILike { column, .. } | Filter::Eq { column, .. } => column,
        }
    }

    /// Render the filter as a PostgREST operator expression
    pub fn to_postgrest(&self) -> String {
        match self {
            Filter::ILike { pattern, .. } => format!("ilike.{}", pattern),
            Filter::Eq { value, .. } => format!("eq.{}", value),
        }
    }
}

/// Explicit ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A single filtered, projected, limited read against one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Table name
    pub table: String,
    /// Projected columns (empty means every column)
    pub columns: Vec<String>,
    /// Filters, all of which must hold
    pub filters: Vec<Filter>,
    /// Optional ordering
    pub order: Option<Order>,
    /// Maximum number of rows
    pub limit: Option<usize>,
    /// Ask the source for the total number of matching rows
    pub count: bool,
}

/// Rows returned by a read, with the total match count when requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Rows matching the filters before any limit; `None` if the source
    /// did not report it
    pub total: Option<usize>,
}

impl SelectQuery {
    /// Start a query against a table
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            count: false,
        }
    }

    /// Set the projected columns
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a case-insensitive LIKE filter
    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ILike {
            column: column.into(),
            pattern: pattern.into(),
        });
        self
    }

    /// Add an equality filter
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Order by a column
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Cap the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Request the exact total match count along with the rows
    pub fn count_exact(mut self) -> Self {
        self.count = true;
        self
    }

    /// The `select` parameter value
    pub fn columns_param(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }
}

/// Build a LIKE pattern matching `needle` as a literal substring.
///
/// `*` cannot be escaped upstream (PostgREST aliases it to `%`), so it is
/// left untouched and still acts as a wildcard.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A remote tabular data source exposing filter/project/limit/execute
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Short name of the source, echoed in responses
    fn name(&self) -> &str;

    /// Execute a read and return the matching rows
    async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>, SourceError>;

    /// Execute a read, reporting the total match count if the source can
    async fn fetch(&self, query: &SelectQuery) -> Result<Page, SourceError> {
        Ok(Page {
            rows: self.execute(query).await?,
            total: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["topic_id", "title"])
            .ilike("title", "%asthma%")
            .eq("language", "English")
            .limit(3);

        assert_eq!(query.columns_param(), "topic_id,title");
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].to_postgrest(), "ilike.%asthma%");
        assert_eq!(query.filters[1].to_postgrest(), "eq.English");
        assert_eq!(query.limit, Some(3));
        assert!(query.order.is_none());
        assert!(!query.count);
        assert!(query.count_exact().count);
    }

    #[test]
    fn test_empty_projection_selects_everything() {
        assert_eq!(SelectQuery::from("t").columns_param(), "*");
    }

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("diabetes"), "%diabetes%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
