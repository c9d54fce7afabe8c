//! The `field::value::operator|...` filter mini-language.
//!
//! Grid components send their filter state as a single query-string value:
//!
//! ```text
//! name::bike::contains|price::100::gte|discontinuedAt::::isnull
//! ```
//!
//! Parsing is tolerant. A segment that is not exactly three `::`-separated
//! parts, has an empty field, names an unknown operator, or gives a binary
//! operator no value is dropped, and parsing continues. There is no escaping:
//! a value containing `|` or `::` splits the segment.

use super::operator::FilterOperator;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Clause separator.
const CLAUSE_SEPARATOR: &str = "|";
/// Part separator within a clause.
const PART_SEPARATOR: &str = "::";

/// How a clause combines with the previous one.
///
/// Carried for wire compatibility; all clauses of a request are ANDed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

/// One structured filter condition.
///
/// `operator` is kept as text so that structured clause lists from a request
/// body can carry any token; the composer rejects tokens outside the
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub logic: Logic,
}

impl FilterClause {
    /// Create a clause with a known operator.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.as_token().to_string(),
            value: value.into(),
            logic: Logic::And,
        }
    }

    /// Create a unary clause (`isnull`, `isnotempty`, ...).
    pub fn unary(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self::new(field, operator, String::new())
    }

    /// The operator, if it belongs to the vocabulary.
    pub fn parsed_operator(&self) -> Option<FilterOperator> {
        FilterOperator::from_token(&self.operator)
    }
}

/// Parse a filter string into clauses, dropping malformed segments.
///
/// # Example
///
/// ```
/// use grid_sql::{parse_filters, FilterOperator};
///
/// let clauses = parse_filters("name::foo::contains|status::::isnull|bogus");
/// assert_eq!(clauses.len(), 2);
/// assert_eq!(clauses[0].value, "foo");
/// assert_eq!(clauses[1].parsed_operator(), Some(FilterOperator::IsNull));
///
/// assert!(parse_filters("").is_empty());
/// ```
pub fn parse_filters(input: &str) -> Vec<FilterClause> {
    input
        .split(CLAUSE_SEPARATOR)
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<FilterClause> {
    let parts: Vec<&str> = segment.split(PART_SEPARATOR).collect();
    let [field, value, operator] = parts.as_slice() else {
        debug!(segment, parts = parts.len(), "dropping filter segment: expected field::value::operator");
        return None;
    };

    let field = field.trim();
    if field.is_empty() {
        debug!(segment, "dropping filter segment: empty field");
        return None;
    }

    let Some(op) = FilterOperator::from_token(operator) else {
        debug!(segment, operator, "dropping filter segment: unknown operator");
        return None;
    };

    if !op.is_unary() && value.is_empty() {
        debug!(segment, operator = op.as_token(), "dropping filter segment: missing value");
        return None;
    }

    Some(FilterClause::new(field, op, *value))
}

/// Render clauses back into the mini-language.
///
/// Clauses whose field or value contain a separator cannot be represented and
/// will not survive a round trip.
pub fn format_filters(clauses: &[FilterClause]) -> String {
    clauses
        .iter()
        .map(|c| format!("{}{PART_SEPARATOR}{}{PART_SEPARATOR}{}", c.field, c.value, c.operator))
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}
