//! `SQLite` executor over rusqlite.
//!
//! `SQLite` accepts the MySQL dialect's output (`?` placeholders, `CONCAT`,
//! `LIMIT ... OFFSET ...`), which is how the paging templates are exercised
//! end to end in tests.

use super::{ExecError, Row, SqlExecutor};
use crate::types::{QueryResult, Value};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex};

impl From<rusqlite::Error> for ExecError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Self::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        },
    }
}

/// Executor backed by a single `SQLite` connection.
///
/// Access is serialized through a mutex and each statement runs on tokio's
/// blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Wrap an open connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, ExecError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExecError> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Run a batch of semicolon-separated statements, e.g. a schema.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), ExecError> {
        let sql = sql.to_string();
        self.run(move |conn| conn.execute_batch(&sql)).await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ExecError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ExecError::Database("connection mutex poisoned".into()))?;
            f(&guard).map_err(ExecError::from)
        })
        .await
        .map_err(|e| ExecError::Blocking(e.to_string()))?
    }
}

fn read_rows(conn: &Connection, query: &QueryResult) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            columns.push((name.clone(), from_sqlite(row.get_ref(i)?)));
        }
        out.push(Row::new(columns));
    }
    Ok(out)
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Row>, ExecError> {
        let query = query.clone();
        self.run(move |conn| read_rows(conn, &query)).await
    }

    async fn execute(&self, query: &QueryResult) -> Result<u64, ExecError> {
        let query = query.clone();
        let affected = self
            .run(move |conn| conn.execute(&query.sql, params_from_iter(query.params.iter())))
            .await?;
        Ok(affected as u64)
    }
}
