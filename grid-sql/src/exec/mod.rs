//! The executor seam: how rendered queries reach a database.
//!
//! The templates only produce [`QueryResult`]s. Running them is delegated to a
//! [`SqlExecutor`], so the paging coordinator and repository work against any
//! driver. A `SQLite` executor ships behind the `sqlite` feature.

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

use crate::types::{QueryResult, Value};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while executing a query or decoding its rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// The driver rejected the statement or failed while running it.
    #[error("database error: {0}")]
    Database(String),

    /// The query did not finish within the configured timeout.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// A row did not have the shape the caller expected.
    #[error("cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The blocking task running the query failed.
    #[error("executor task failed: {0}")]
    Blocking(String),
}

impl ExecError {
    /// Decode error for `column`.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// A result row: column names with their values, in select-list order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create a row from `(column, value)` pairs.
    pub const fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Value of `column`, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Value of `column`, or a decode error if the row has no such column.
    pub fn require(&self, column: &str) -> Result<&Value, ExecError> {
        self.get(column)
            .ok_or_else(|| ExecError::decode(column, "column not present in row"))
    }

    /// Integer value of `column`.
    pub fn get_i64(&self, column: &str) -> Result<i64, ExecError> {
        let value = self.require(column)?;
        value
            .as_i64()
            .ok_or_else(|| ExecError::decode(column, format!("expected integer, got {value}")))
    }

    /// Text value of `column`; NULL becomes `None`, other scalars are rendered.
    pub fn get_string(&self, column: &str) -> Result<Option<String>, ExecError> {
        Ok(match self.require(column)? {
            Value::Null => None,
            value => Some(value.to_string()),
        })
    }

    /// Boolean value of a flag column (`0`/`1`).
    pub fn get_bool(&self, column: &str) -> Result<bool, ExecError> {
        match self.require(column)? {
            Value::Bool(b) => Ok(*b),
            value => value
                .as_i64()
                .map(|n| n != 0)
                .ok_or_else(|| ExecError::decode(column, format!("expected flag, got {value}"))),
        }
    }

    /// The first column's value.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Conversion from a result row into a caller type.
pub trait FromRow: Sized {
    /// Decode one row.
    fn from_row(row: &Row) -> Result<Self, ExecError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, ExecError> {
        Ok(row.clone())
    }
}

/// Runs rendered queries.
///
/// Implementations must be shareable across tasks; cancellation is by
/// dropping the returned future.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a query and return every row.
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>, ExecError>;

    /// Run a statement and return the number of affected rows.
    async fn execute(&self, query: &QueryResult) -> Result<u64, ExecError>;

    /// Run a query returning a single integer (a `COUNT`).
    async fn fetch_scalar(&self, query: &QueryResult) -> Result<i64, ExecError> {
        let rows = self.fetch_all(query).await?;
        let value = rows
            .first()
            .and_then(Row::first)
            .ok_or_else(|| ExecError::decode("<scalar>", "query returned no rows"))?;
        value
            .as_i64()
            .ok_or_else(|| ExecError::decode("<scalar>", format!("expected integer, got {value}")))
    }
}

/// Await `fut`, failing with [`ExecError::Timeout`] once `timeout` elapses.
pub(crate) async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, ExecError>
where
    F: Future<Output = Result<T, ExecError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ExecError::Timeout(limit))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(vec![
            ("Id".into(), Value::Int(7)),
            ("Name".into(), Value::from("Bike")),
            ("IsDeleted".into(), Value::Int(0)),
            ("Note".into(), Value::Null),
        ])
    }

    #[test]
    fn test_row_accessors() {
        let row = row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_string("NAME").unwrap(), Some("Bike".into()));
        assert_eq!(row.get_string("Note").unwrap(), None);
        assert!(!row.get_bool("IsDeleted").unwrap());
        assert_eq!(row.first(), Some(&Value::Int(7)));
        assert_eq!(row.len(), 4);
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["Id", "Name", "IsDeleted", "Note"]);
    }

    #[test]
    fn test_row_decode_errors() {
        let row = row();
        assert!(matches!(row.require("Missing"), Err(ExecError::Decode { .. })));
        let err = row.get_i64("Name").unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    struct Fixed(Vec<Row>);

    #[async_trait]
    impl SqlExecutor for Fixed {
        async fn fetch_all(&self, _query: &QueryResult) -> Result<Vec<Row>, ExecError> {
            Ok(self.0.clone())
        }

        async fn execute(&self, _query: &QueryResult) -> Result<u64, ExecError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_default_fetch_scalar() {
        let query = QueryResult {
            sql: "SELECT COUNT(1) FROM Product t1".into(),
            params: vec![],
        };
        let executor = Fixed(vec![Row::new(vec![("COUNT(1)".into(), Value::Int(3))])]);
        assert_eq!(executor.fetch_scalar(&query).await.unwrap(), 3);

        let empty = Fixed(vec![]);
        assert!(matches!(
            empty.fetch_scalar(&query).await,
            Err(ExecError::Decode { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ExecError>(1)
        };
        let err = with_timeout(Some(Duration::from_millis(10)), slow)
            .await
            .unwrap_err();
        assert_eq!(err, ExecError::Timeout(Duration::from_millis(10)));

        let fast = async { Ok::<_, ExecError>(2) };
        assert_eq!(with_timeout(None, fast).await.unwrap(), 2);
    }
}
