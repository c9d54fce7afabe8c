//! SQL dialect implementations for MySQL and Oracle 11g.
//!
//! Each dialect handles the syntax differences the templates care about:
//! placeholders, pattern matching, empty-string semantics and, most importantly,
//! how a result window is cut ([`WindowStrategy`]).

use crate::config::ConfigError;
use crate::types::Value;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How a dialect restricts a query to rows `[skip, skip + take)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStrategy {
    /// Native `LIMIT take OFFSET skip` appended to the key query.
    LimitOffset,
    /// `ROWNUM` wrapper: the take bound is a `WHERE` on the wrapper, the skip
    /// bound is applied after the keys are joined back.
    RowNum,
}

/// SQL dialect trait for database-specific syntax.
pub trait Dialect: Clone + Copy + fmt::Debug + Send + Sync {
    /// Short name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Format a parameter placeholder (`?` for MySQL, `:1` for Oracle).
    fn param(&self, idx: usize) -> String;

    /// Format a boolean literal for a flag column.
    fn bool_lit(&self, val: bool) -> &'static str;

    /// Format an IN clause with one placeholder per value.
    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>);

    /// Format a STARTS WITH clause.
    fn starts_with_clause(&self, field: &str, idx: usize) -> String;

    /// Format an ENDS WITH clause.
    fn ends_with_clause(&self, field: &str, idx: usize) -> String;

    /// Format a CONTAINS clause.
    fn contains_clause(&self, field: &str, idx: usize) -> String;

    /// Format a DOES NOT CONTAIN clause.
    fn not_contains_clause(&self, field: &str, idx: usize) -> String;

    /// Format an "is empty string" check.
    fn is_empty_clause(&self, field: &str) -> String;

    /// Format an "is not empty string" check.
    fn is_not_empty_clause(&self, field: &str) -> String;

    /// Windowing primitive available at the target engine version.
    fn window_strategy(&self) -> WindowStrategy;

    /// Whether `INSERT ... VALUES (..), (..)` is accepted.
    fn multi_row_values(&self) -> bool;
}

/// MySQL dialect. Also accepted by `SQLite`, which the test suite executes it on.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    #[inline]
    fn name(&self) -> &'static str {
        "mysql"
    }

    #[inline]
    fn param(&self, _idx: usize) -> String {
        "?".to_string()
    }

    #[inline]
    fn bool_lit(&self, val: bool) -> &'static str {
        if val { "1" } else { "0" }
    }

    fn in_clause(&self, field: &str, values: &[Value], _start_idx: usize) -> (String, Vec<Value>) {
        let placeholders = vec!["?"; values.len()].join(", ");
        (format!("{field} IN ({placeholders})"), values.to_vec())
    }

    #[inline]
    fn starts_with_clause(&self, field: &str, _idx: usize) -> String {
        format!("{field} LIKE CONCAT(?, '%')")
    }

    #[inline]
    fn ends_with_clause(&self, field: &str, _idx: usize) -> String {
        format!("{field} LIKE CONCAT('%', ?)")
    }

    #[inline]
    fn contains_clause(&self, field: &str, _idx: usize) -> String {
        format!("{field} LIKE CONCAT('%', ?, '%')")
    }

    #[inline]
    fn not_contains_clause(&self, field: &str, _idx: usize) -> String {
        format!("{field} NOT LIKE CONCAT('%', ?, '%')")
    }

    #[inline]
    fn is_empty_clause(&self, field: &str) -> String {
        format!("{field} = ''")
    }

    #[inline]
    fn is_not_empty_clause(&self, field: &str) -> String {
        format!("{field} <> ''")
    }

    #[inline]
    fn window_strategy(&self) -> WindowStrategy {
        WindowStrategy::LimitOffset
    }

    #[inline]
    fn multi_row_values(&self) -> bool {
        true
    }
}

/// Oracle 11g dialect (no `OFFSET ... FETCH`, positional `:n` binds).
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    #[inline]
    fn name(&self) -> &'static str {
        "oracle"
    }

    #[inline]
    fn param(&self, idx: usize) -> String {
        format!(":{idx}")
    }

    #[inline]
    fn bool_lit(&self, val: bool) -> &'static str {
        // NUMBER(1) flag columns
        if val { "1" } else { "0" }
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        let placeholders: Vec<String> = (0..values.len())
            .map(|i| format!(":{}", start_idx + i))
            .collect();
        let sql = format!("{} IN ({})", field, placeholders.join(", "));
        (sql, values.to_vec())
    }

    #[inline]
    fn starts_with_clause(&self, field: &str, idx: usize) -> String {
        format!("{field} LIKE :{idx} || '%'")
    }

    #[inline]
    fn ends_with_clause(&self, field: &str, idx: usize) -> String {
        format!("{field} LIKE '%' || :{idx}")
    }

    #[inline]
    fn contains_clause(&self, field: &str, idx: usize) -> String {
        format!("{field} LIKE '%' || :{idx} || '%'")
    }

    #[inline]
    fn not_contains_clause(&self, field: &str, idx: usize) -> String {
        format!("{field} NOT LIKE '%' || :{idx} || '%'")
    }

    // Oracle stores '' as NULL, so emptiness is nullness.
    #[inline]
    fn is_empty_clause(&self, field: &str) -> String {
        format!("{field} IS NULL")
    }

    #[inline]
    fn is_not_empty_clause(&self, field: &str) -> String {
        format!("{field} IS NOT NULL")
    }

    #[inline]
    fn window_strategy(&self) -> WindowStrategy {
        WindowStrategy::RowNum
    }

    #[inline]
    fn multi_row_values(&self) -> bool {
        false
    }
}

/// Dialect chosen at startup from configuration.
///
/// The set is closed: an unknown name is a [`ConfigError::UnsupportedDialect`]
/// when the configuration is loaded, never a per-request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    MySql,
    Oracle,
}

impl FromStr for SqlDialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "oracle" | "oracle11g" | "oracle-11g" => Ok(Self::Oracle),
            other => Err(ConfigError::UnsupportedDialect(other.to_string())),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Dialect for SqlDialect {
    fn name(&self) -> &'static str {
        match self {
            Self::MySql => MySql.name(),
            Self::Oracle => Oracle.name(),
        }
    }

    fn param(&self, idx: usize) -> String {
        match self {
            Self::MySql => MySql.param(idx),
            Self::Oracle => Oracle.param(idx),
        }
    }

    fn bool_lit(&self, val: bool) -> &'static str {
        match self {
            Self::MySql => MySql.bool_lit(val),
            Self::Oracle => Oracle.bool_lit(val),
        }
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        match self {
            Self::MySql => MySql.in_clause(field, values, start_idx),
            Self::Oracle => Oracle.in_clause(field, values, start_idx),
        }
    }

    fn starts_with_clause(&self, field: &str, idx: usize) -> String {
        match self {
            Self::MySql => MySql.starts_with_clause(field, idx),
            Self::Oracle => Oracle.starts_with_clause(field, idx),
        }
    }

    fn ends_with_clause(&self, field: &str, idx: usize) -> String {
        match self {
            Self::MySql => MySql.ends_with_clause(field, idx),
            Self::Oracle => Oracle.ends_with_clause(field, idx),
        }
    }

    fn contains_clause(&self, field: &str, idx: usize) -> String {
        match self {
            Self::MySql => MySql.contains_clause(field, idx),
            Self::Oracle => Oracle.contains_clause(field, idx),
        }
    }

    fn not_contains_clause(&self, field: &str, idx: usize) -> String {
        match self {
            Self::MySql => MySql.not_contains_clause(field, idx),
            Self::Oracle => Oracle.not_contains_clause(field, idx),
        }
    }

    fn is_empty_clause(&self, field: &str) -> String {
        match self {
            Self::MySql => MySql.is_empty_clause(field),
            Self::Oracle => Oracle.is_empty_clause(field),
        }
    }

    fn is_not_empty_clause(&self, field: &str) -> String {
        match self {
            Self::MySql => MySql.is_not_empty_clause(field),
            Self::Oracle => Oracle.is_not_empty_clause(field),
        }
    }

    fn window_strategy(&self) -> WindowStrategy {
        match self {
            Self::MySql => MySql.window_strategy(),
            Self::Oracle => Oracle.window_strategy(),
        }
    }

    fn multi_row_values(&self) -> bool {
        match self {
            Self::MySql => MySql.multi_row_values(),
            Self::Oracle => Oracle.multi_row_values(),
        }
    }
}
