//! UPDATE query builder.

use super::push_where;
use crate::dialect::Dialect;
use crate::template::Predicate;
use crate::types::{QueryResult, Value};
use crate::validate::assert_valid_sql_identifier;

/// `UPDATE <table> SET ... [WHERE ...]` with bound values.
///
/// Assignments are numbered first, so predicate placeholders continue after
/// the last assigned column.
#[derive(Debug)]
pub struct UpdateBuilder<D: Dialect> {
    dialect: D,
    table: String,
    assignments: Vec<(String, Value)>,
    conditions: Vec<Predicate>,
}

impl<D: Dialect> UpdateBuilder<D> {
    /// Start an update of `table`.
    ///
    /// # Panics
    ///
    /// Panics on an invalid table name.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_sql_identifier(&table, "table");
        Self {
            dialect,
            table,
            assignments: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Assign `value` to `column`.
    ///
    /// # Panics
    ///
    /// Panics on an invalid column name.
    pub fn set(self, column: impl Into<String>, value: Value) -> Self {
        let column = column.into();
        self.set_many(vec![(column.as_str(), value)])
    }

    /// Assign several columns, in order.
    ///
    /// # Panics
    ///
    /// Panics on an invalid column name.
    pub fn set_many(mut self, pairs: Vec<(&str, Value)>) -> Self {
        self.assignments.extend(pairs.into_iter().map(|(column, value)| {
            assert_valid_sql_identifier(column, "column");
            (column.to_string(), value)
        }));
        self
    }

    /// Restrict the rows updated; conditions are ANDed.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.conditions.push(predicate);
        self
    }

    /// Restrict to rows where `column = value`.
    ///
    /// # Panics
    ///
    /// Panics on an invalid column name.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        assert_valid_sql_identifier(column, "filter field");
        self.filter(Predicate::eq(column, value))
    }

    /// Render the statement.
    pub fn build(self) -> QueryResult {
        let Self {
            dialect,
            table,
            assignments,
            conditions,
        } = self;

        let set_list = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = {}", dialect.param(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params: Vec<Value> = assignments.into_iter().map(|(_, value)| value).collect();
        let mut sql = format!("UPDATE {table} SET {set_list}");

        let next_idx = params.len() + 1;
        push_where(&dialect, &conditions, &mut sql, &mut params, next_idx);
        QueryResult { sql, params }
    }
}
