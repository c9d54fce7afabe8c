//! DELETE query builder.

use super::push_where;
use crate::dialect::Dialect;
use crate::template::Predicate;
use crate::types::{QueryResult, Value};
use crate::validate::assert_valid_sql_identifier;

/// Builder for DELETE queries.
#[derive(Debug)]
pub struct DeleteBuilder<D: Dialect> {
    dialect: D,
    table: String,
    filters: Vec<Predicate>,
}

impl<D: Dialect> DeleteBuilder<D> {
    /// Create a new delete builder.
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
            filters: Vec::new(),
        }
    }

    /// Add a WHERE predicate; predicates are ANDed.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Add `column = value` to the WHERE clause.
    ///
    /// # Panics
    ///
    /// Panics if the column name is not a valid SQL identifier.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        assert_valid_sql_identifier(column, "filter field");
        self.filter(Predicate::eq(column, value))
    }

    /// Build the DELETE query.
    pub fn build(self) -> QueryResult {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = Vec::new();
        push_where(&self.dialect, &self.filters, &mut sql, &mut params, 1);
        QueryResult { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Oracle};

    #[test]
    fn test_delete_by_ids() {
        let result = DeleteBuilder::new(Oracle, "Tag")
            .filter(Predicate::is_in("Id", vec![Value::Int(1), Value::Int(2)]))
            .build();
        assert_eq!(result.sql, "DELETE FROM Tag WHERE Id IN (:1, :2)");
        assert_eq!(result.params.len(), 2);
    }

    #[test]
    fn test_delete_single() {
        let result = DeleteBuilder::new(MySql, "Tag").where_eq("Id", 9).build();
        assert_eq!(result.sql, "DELETE FROM Tag WHERE Id = ?");
        assert_eq!(result.params, vec![Value::Int(9)]);
    }

    #[test]
    fn test_delete_without_filter() {
        let result = DeleteBuilder::new(MySql, "Tag").build();
        assert_eq!(result.sql, "DELETE FROM Tag");
        assert!(result.params.is_empty());
    }
}
