//! Core value types shared by the templates, composer and executors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL parameter values.
///
/// Every user-supplied value reaches the database through this type as a bound
/// parameter; only column and operator vocabulary is interpolated into SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Returns the integer payload, converting whole floats and numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is SQL NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// SQL keyword for this direction.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort column with direction. The column is already resolved and qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub column: String,
    pub dir: SortDir,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            column: column.into(),
            dir,
        }
    }

    pub(crate) fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.dir.keyword())
    }
}

/// Rendered SQL text with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "QueryResult must be used to execute the query"]
pub struct QueryResult {
    pub sql: String,
    pub params: Vec<Value>,
}
