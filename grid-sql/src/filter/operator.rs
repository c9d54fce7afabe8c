//! The closed filter operator vocabulary.

use std::fmt;

/// Filter operators understood by the engine.
///
/// The four `Is*` operators are unary and take no value; all others require
/// a non-empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Substring match.
    Contains,
    /// Negated substring match.
    DoesNotContain,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
    /// Empty string (NULL on Oracle).
    IsEmpty,
    /// Non-empty string.
    IsNotEmpty,
}

impl FilterOperator {
    /// Every operator, in canonical order.
    pub const ALL: [Self; 14] = [
        Self::Eq,
        Self::Neq,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::StartsWith,
        Self::EndsWith,
        Self::Contains,
        Self::DoesNotContain,
        Self::IsNull,
        Self::IsNotNull,
        Self::IsEmpty,
        Self::IsNotEmpty,
    ];

    /// Parse an operator token.
    ///
    /// Matching ignores ASCII case, `_` and `-`, and accepts a few common
    /// aliases (`ne`, `le`, `ge`, `notcontains`).
    ///
    /// # Example
    ///
    /// ```
    /// use grid_sql::FilterOperator;
    ///
    /// assert_eq!(FilterOperator::from_token("eq"), Some(FilterOperator::Eq));
    /// assert_eq!(FilterOperator::from_token("startsWith"), Some(FilterOperator::StartsWith));
    /// assert_eq!(FilterOperator::from_token("is_not_null"), Some(FilterOperator::IsNotNull));
    /// assert_eq!(FilterOperator::from_token("regex"), None);
    /// ```
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized: String = token
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "eq" => Some(Self::Eq),
            "neq" | "ne" => Some(Self::Neq),
            "lt" => Some(Self::Lt),
            "lte" | "le" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" | "ge" => Some(Self::Gte),
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            "contains" => Some(Self::Contains),
            "doesnotcontain" | "notcontains" => Some(Self::DoesNotContain),
            "isnull" => Some(Self::IsNull),
            "isnotnull" => Some(Self::IsNotNull),
            "isempty" => Some(Self::IsEmpty),
            "isnotempty" => Some(Self::IsNotEmpty),
            _ => None,
        }
    }

    /// Canonical token, as written by [`format_filters`](super::format_filters).
    pub const fn as_token(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Contains => "contains",
            Self::DoesNotContain => "doesnotcontain",
            Self::IsNull => "isnull",
            Self::IsNotNull => "isnotnull",
            Self::IsEmpty => "isempty",
            Self::IsNotEmpty => "isnotempty",
        }
    }

    /// Whether the operator takes no value.
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::IsEmpty | Self::IsNotEmpty
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}
