//! INSERT query builder.

use crate::dialect::Dialect;
use crate::types::{QueryResult, Value};
use crate::validate::assert_valid_sql_identifier;

/// Builder for INSERT queries.
#[derive(Debug)]
pub struct InsertBuilder<D: Dialect> {
    dialect: D,
    table: String,
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl<D: Dialect> InsertBuilder<D> {
    /// Create a new insert builder.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid SQL identifier.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_sql_identifier(&table, "table");
        Self {
            dialect,
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set the columns for insertion.
    ///
    /// # Panics
    ///
    /// Panics if any column name is not a valid SQL identifier.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            assert_valid_sql_identifier(col, "column");
        }
        self.columns = columns.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.values.push(values);
        self
    }

    /// Set columns and one row of values from `(column, value)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if any column name is not a valid SQL identifier.
    pub fn row(self, pairs: Vec<(&str, Value)>) -> Self {
        let (columns, values): (Vec<&str>, Vec<Value>) = pairs.into_iter().unzip();
        self.columns(&columns).values(values)
    }

    /// Build the INSERT query.
    ///
    /// Dialects without multi-row `VALUES` get one `INTO` per row inside an
    /// `INSERT ALL`.
    pub fn build(self) -> QueryResult {
        let mut params = Vec::new();
        let mut param_idx = 1usize;
        let columns = self.columns.join(", ");

        let mut value_groups = Vec::with_capacity(self.values.len());
        for row in &self.values {
            let placeholders: Vec<String> = row
                .iter()
                .map(|v| {
                    let p = self.dialect.param(param_idx);
                    params.push(v.clone());
                    param_idx += 1;
                    p
                })
                .collect();
            value_groups.push(format!("({})", placeholders.join(", ")));
        }

        let sql = if value_groups.len() > 1 && !self.dialect.multi_row_values() {
            let intos: Vec<String> = value_groups
                .iter()
                .map(|group| format!("INTO {} ({columns}) VALUES {group}", self.table))
                .collect();
            format!("INSERT ALL {} SELECT 1 FROM DUAL", intos.join(" "))
        } else {
            format!(
                "INSERT INTO {} ({columns}) VALUES {}",
                self.table,
                value_groups.join(", ")
            )
        };

        QueryResult { sql, params }
    }
}
