//! Table descriptors: the per-entity input to the templates.
//!
//! An entity repository builds one descriptor at construction time. Descriptors
//! are immutable once built and carry no per-request state, so a single
//! `Arc<TableDescriptor>` can serve concurrent requests.

use crate::validate::{
    assert_valid_column_ref, assert_valid_sql_expression, assert_valid_sql_identifier,
    is_valid_sql_expression, is_valid_sql_identifier,
};
use thiserror::Error;

/// Alias of the master table in every rendered query.
pub const MASTER_ALIAS: &str = "t1";

/// Join kinds supported by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    /// SQL keyword pair for this join.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// A join declared by an entity descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    /// Trusted join condition, e.g. `pi.ProductId = t1.Id`.
    pub on: String,
}

impl Join {
    /// Create a join.
    ///
    /// # Panics
    ///
    /// Panics if the table or alias is not a valid identifier, the alias is
    /// reserved by the templates, or the condition fails expression validation.
    /// Use [`try_new`](Self::try_new) for joins built from user input.
    pub fn new(
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: impl Into<String>,
    ) -> Self {
        Self::try_new(kind, table, alias, on).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Create a join, reporting the first invalid part instead of panicking.
    pub fn try_new(
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: impl Into<String>,
    ) -> Result<Self, JoinError> {
        let table = table.into();
        let alias = alias.into();
        let on = on.into();
        if !is_valid_sql_identifier(&table) {
            return Err(JoinError::InvalidTable(table));
        }
        if !is_valid_sql_identifier(&alias) {
            return Err(JoinError::InvalidAlias(alias));
        }
        if alias.eq_ignore_ascii_case(MASTER_ALIAS) || alias.starts_with("t_") {
            return Err(JoinError::ReservedAlias(alias));
        }
        if !is_valid_sql_expression(&on) {
            return Err(JoinError::InvalidCondition(on));
        }
        Ok(Self {
            kind,
            table,
            alias,
            on,
        })
    }

    pub(crate) fn to_sql(&self) -> String {
        self.to_sql_as(self.kind)
    }

    /// Render this join with a different kind.
    pub(crate) fn to_sql_as(&self, kind: JoinKind) -> String {
        format!("{} {} {} ON {}", kind.keyword(), self.table, self.alias, self.on)
    }
}

/// Why a join declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum JoinError {
    /// The joined table is not a valid identifier.
    #[error("Invalid SQL join table name '{0}'")]
    InvalidTable(String),

    /// The alias is not a valid identifier.
    #[error("Invalid SQL join alias name '{0}'")]
    InvalidAlias(String),

    /// The alias is `t1` or starts with `t_`.
    #[error("Join alias '{0}' collides with an alias reserved by the templates")]
    ReservedAlias(String),

    /// The ON condition failed expression validation.
    #[error("Invalid SQL expression for join condition: '{0}'")]
    InvalidCondition(String),
}

/// Describes how an entity is listed: table, projection, keys and joins.
///
/// # Example
///
/// ```
/// use grid_sql::TableDescriptor;
///
/// let products = TableDescriptor::new("Product")
///     .columns(&["t1.Id", "t1.Name", "pi.Url AS ImageUrl"])
///     .primary_keys(&["Id"])
///     .left_join("ProductImage", "pi", "pi.ProductId = t1.Id")
///     .soft_delete("IsDeleted")
///     .searchable(&["t1.Name", "t1.Sku"]);
///
/// assert_eq!(products.qualified_keys(), vec!["t1.Id".to_string()]);
/// assert!(products.has_joins());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<String>,
    primary_keys: Vec<String>,
    grouped_columns: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    joins: Vec<Join>,
    soft_delete: Option<String>,
    searchable: Vec<String>,
    selection: Vec<String>,
    filterable: Vec<String>,
    field_map: Vec<(String, String)>,
}

impl TableDescriptor {
    /// Create a descriptor for `name`.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid SQL identifier.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert_valid_sql_identifier(&name, "table");
        Self {
            name,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            grouped_columns: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            joins: Vec::new(),
            soft_delete: None,
            searchable: Vec::new(),
            selection: Vec::new(),
            filterable: Vec::new(),
            field_map: Vec::new(),
        }
    }

    /// Set the full select list. Items are trusted fragments (`t1.Id`,
    /// `pi.Url AS ImageUrl`, `COUNT(pi.Id) AS Images`).
    ///
    /// # Panics
    ///
    /// Panics if any item fails expression validation.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        for column in columns {
            assert_valid_sql_expression(column, "select column");
        }
        self.columns = to_strings(columns);
        self
    }

    /// Set the primary-key column names of the master table (unqualified).
    ///
    /// # Panics
    ///
    /// Panics if any key is not a valid SQL identifier.
    pub fn primary_keys(mut self, keys: &[&str]) -> Self {
        for key in keys {
            assert_valid_sql_identifier(key, "primary key");
        }
        self.primary_keys = to_strings(keys);
        self
    }

    /// Columns whose distinct combinations the counting query counts, when
    /// that differs from the query's own GROUP BY.
    ///
    /// # Panics
    ///
    /// Panics if any entry is not a column reference.
    pub fn grouped_columns(mut self, columns: &[&str]) -> Self {
        for column in columns {
            assert_valid_column_ref(column, "grouped");
        }
        self.grouped_columns = to_strings(columns);
        self
    }

    /// GROUP BY applied to the list queries.
    ///
    /// # Panics
    ///
    /// Panics if any entry is not a column reference.
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        for column in columns {
            assert_valid_column_ref(column, "group by");
        }
        self.group_by = to_strings(columns);
        self
    }

    /// Add a trusted HAVING predicate, e.g. `COUNT(pi.Id) > 0`. Declare the
    /// GROUP BY first.
    ///
    /// # Panics
    ///
    /// Panics if no GROUP BY has been declared or the predicate fails
    /// expression validation.
    pub fn having(mut self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        assert!(
            !self.group_by.is_empty(),
            "HAVING '{predicate}' on table '{}' needs a GROUP BY; call group_by first",
            self.name
        );
        assert_valid_sql_expression(&predicate, "having");
        self.having.push(predicate);
        self
    }

    /// Add a join.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add an INNER JOIN.
    pub fn inner_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.join(Join::new(JoinKind::Inner, table, alias, on))
    }

    /// Add a LEFT JOIN.
    pub fn left_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.join(Join::new(JoinKind::Left, table, alias, on))
    }

    /// Add a RIGHT JOIN.
    pub fn right_join(self, table: &str, alias: &str, on: &str) -> Self {
        self.join(Join::new(JoinKind::Right, table, alias, on))
    }

    /// Mark rows deleted through a boolean flag column instead of removing them.
    ///
    /// # Panics
    ///
    /// Panics if the column is not a valid SQL identifier.
    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        assert_valid_sql_identifier(&column, "soft delete");
        self.soft_delete = Some(column);
        self
    }

    /// Columns matched by the request `keywords`.
    ///
    /// # Panics
    ///
    /// Panics if any entry is not a column reference.
    pub fn searchable(mut self, columns: &[&str]) -> Self {
        for column in columns {
            assert_valid_column_ref(column, "searchable");
        }
        self.searchable = to_strings(columns);
        self
    }

    /// Projection used for `Selection` requests (dropdowns, pickers).
    ///
    /// # Panics
    ///
    /// Panics if any item fails expression validation.
    pub fn selection(mut self, columns: &[&str]) -> Self {
        for column in columns {
            assert_valid_sql_expression(column, "selection column");
        }
        self.selection = to_strings(columns);
        self
    }

    /// Restrict request filters and sorts to these field names. Empty allows
    /// any well-formed field.
    pub fn filterable(mut self, fields: &[&str]) -> Self {
        self.filterable = to_strings(fields);
        self
    }

    /// Map a request field name onto a column, e.g. `imageUrl` → `pi.Url`.
    ///
    /// # Panics
    ///
    /// Panics if the column is not a column reference.
    pub fn map_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        let column = column.into();
        assert_valid_column_ref(&column, "mapped");
        self.field_map.push((field.into(), column));
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full select list; `t1.*` when none was declared.
    pub fn select_list(&self) -> Vec<String> {
        if self.columns.is_empty() {
            vec![format!("{MASTER_ALIAS}.*")]
        } else {
            self.columns.clone()
        }
    }

    /// Projection for selection requests, falling back to the full list.
    pub fn selection_list(&self) -> Vec<String> {
        if self.selection.is_empty() {
            self.select_list()
        } else {
            self.selection.clone()
        }
    }

    /// Unqualified primary-key columns.
    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_keys
    }

    /// Primary keys qualified with the master alias.
    pub fn qualified_keys(&self) -> Vec<String> {
        self.primary_keys
            .iter()
            .map(|k| format!("{MASTER_ALIAS}.{k}"))
            .collect()
    }

    /// Whether the descriptor declares a primary key.
    pub const fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    /// Whether any join is declared.
    pub const fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Declared joins.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Counting-only grouping override.
    pub fn grouped(&self) -> &[String] {
        &self.grouped_columns
    }

    /// GROUP BY columns of the list queries.
    pub fn group_by_columns(&self) -> &[String] {
        &self.group_by
    }

    /// HAVING predicates.
    pub fn having_predicates(&self) -> &[String] {
        &self.having
    }

    /// Soft-delete flag column, if any.
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete.as_deref()
    }

    /// Keyword-searchable columns.
    pub fn searchable_columns(&self) -> &[String] {
        &self.searchable
    }

    /// Whether `field` may be used by a request.
    pub fn allows_field(&self, field: &str) -> bool {
        self.filterable.is_empty() || self.filterable.iter().any(|f| f == field)
    }

    /// Resolve a request field to a column reference: the explicit mapping
    /// first, then qualified columns as given, then the master alias.
    pub fn resolve_field(&self, field: &str) -> String {
        if let Some((_, column)) = self.field_map.iter().find(|(f, _)| f == field) {
            return column.clone();
        }
        if field.contains('.') {
            field.to_string()
        } else {
            format!("{MASTER_ALIAS}.{field}")
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
