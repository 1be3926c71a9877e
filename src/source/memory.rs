//! In-memory data source
//!
//! Evaluates a [`SelectQuery`] against rows held in memory with the same
//! filter semantics as the remote source. Used to substitute the upstream
//! in tests and local runs.

use super::traits::{Filter, Page, Row, SelectQuery, SourceError, TableSource};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// In-memory table
pub struct MemorySource {
    name: String,
    table: String,
    rows: Vec<Row>,
    failure: Option<String>,
    reads: AtomicUsize,
}

impl MemorySource {
    /// Create an empty table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            name: "memory".to_string(),
            table: table.into(),
            rows: Vec::new(),
            failure: None,
            reads: AtomicUsize::new(0),
        }
    }

    /// Seed the table with rows. Values that are not JSON objects are skipped.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Value>) -> Self {
        self.rows.extend(rows.into_iter().filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        }));
        self
    }

    /// Override the reported source name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every read fail with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of reads executed so far
    pub fn reads(&self) -> usize {
        self.reads.load(AtomicOrdering::SeqCst)
    }

    fn matches(row: &Row, filter: &Filter) -> bool {
        let Some(text) = row.get(filter.column()).and_then(value_text) else {
            return false;
        };
        match filter {
            Filter::Eq { value, .. } => text == *value,
            Filter::ILike { pattern, .. } => ilike(&text, pattern),
        }
    }

    fn project(row: &Row, columns: &[String]) -> Row {
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            return row.clone();
        }
        columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect()
    }
}

impl MemorySource {
    fn run(&self, query: &SelectQuery) -> Result<Page, SourceError> {
        self.reads.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(ref message) = self.failure {
            return Err(SourceError::Unavailable(message.clone()));
        }

        if query.table != self.table {
            return Err(SourceError::Rejected {
                status: 404,
                code: Some("42P01".to_string()),
                message: format!("relation \"public.{}\" does not exist", query.table),
            });
        }

        let mut matched: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| Self::matches(row, f)))
            .collect();

        if let Some(ref order) = query.order {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        let total = matched.len();
        let limit = query.limit.unwrap_or(usize::MAX);
        let rows = matched
            .into_iter()
            .take(limit)
            .map(|row| Self::project(row, &query.columns))
            .collect();

        Ok(Page {
            rows,
            total: query.count.then_some(total),
        })
    }
}

#[async_trait]
impl TableSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>, SourceError> {
        self.run(query).map(|page| page.rows)
    }

    async fn fetch(&self, query: &SelectQuery) -> Result<Page, SourceError> {
        self.run(query)
    }
}

/// Textual form of a scalar value; null and containers have none
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Nulls sort last, numbers before strings
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    AnyRun,
    AnyChar,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            '%' | '*' => Token::AnyRun,
            '_' => Token::AnyChar,
            other => Token::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Case-insensitive LIKE match
fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let tokens: Vec<Token> = tokenize(&pattern.to_lowercase());

    // matched[j]: tokens[..i] match text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnyRun => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            Token::AnyChar => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            Token::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == c;
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topics() -> MemorySource {
        MemorySource::new("MEDLINEPLUS").with_rows(vec![
            json!({"topic_id": 3, "title": "Diabetes", "language": "English"}),
            json!({"topic_id": 1, "title": "Diabetes Type 1", "language": "English"}),
            json!({"topic_id": 2, "title": "Diabetes Type 2", "language": "English"}),
            json!({"topic_id": 4, "title": "Diabetes", "language": "Spanish"}),
            json!({"topic_id": 5, "title": "Asthma", "language": "English"}),
            json!({"topic_id": 6, "title": "Untitled", "language": null}),
        ])
    }

    #[test]
    fn test_ilike() {
        assert!(ilike("Diabetes Type 1", "%diabetes%"));
        assert!(ilike("DIABETES", "%Diabetes%"));
        assert!(!ilike("Asthma", "%diabetes%"));
        assert!(ilike("anything", "%%"));
        assert!(ilike("", "%%"));
        assert!(ilike("cat", "c_t"));
        assert!(!ilike("cart", "c_t"));
        assert!(ilike("100% juice", "%100\\%%"));
        assert!(!ilike("1000 juice", "%100\\%%"));
        assert!(ilike("a_b", "%a\\_b%"));
        assert!(!ilike("axb", "%a\\_b%"));
    }

    #[tokio::test]
    async fn test_filters_limit_and_projection() {
        let source = topics();
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["topic_id", "title"])
            .ilike("title", "%diabetes%")
            .eq("language", "English")
            .limit(2);

        let rows = source.execute(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row["title"].as_str().unwrap().contains("Diabetes"));
            assert!(!row.contains_key("language"));
        }
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_fetch_reports_total_when_counted() {
        let source = topics();
        let query = SelectQuery::from("MEDLINEPLUS").eq("language", "English").limit(2);

        let page = source.fetch(&query).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, None);

        let page = source.fetch(&query.count_exact()).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, Some(4));
    }

    #[tokio::test]
    async fn test_order() {
        let source = topics();
        let query = SelectQuery::from("MEDLINEPLUS")
            .select(&["topic_id"])
            .eq("language", "English")
            .order("topic_id", false);

        let rows = source.execute(&query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["topic_id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![5, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_null_never_matches_filters() {
        let source = topics();
        let query = SelectQuery::from("MEDLINEPLUS").ilike("language", "%");
        let rows = source.execute(&query).await.unwrap();
        assert_eq!(rows.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_table_is_rejected() {
        let err = topics()
            .execute(&SelectQuery::from("OTHER"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = topics().failing("connection refused");
        let err = source
            .execute(&SelectQuery::from("MEDLINEPLUS"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(source.reads(), 1);
    }
}
