//! Inbound list request.

use crate::filter::{FilterClause, parse_filters};
use crate::types::SortDir;
use serde::{Deserialize, Serialize};

/// What the caller is listing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestKind {
    /// Full rows for a data grid.
    #[default]
    Grid,
    /// Reduced projection for pickers and dropdowns.
    Selection,
}

/// Filters as sent by the caller: the compact text form, or a structured list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    Text(String),
    Clauses(Vec<FilterClause>),
}

impl Default for FilterInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl FilterInput {
    /// Structured clauses; text is parsed with [`parse_filters`].
    pub fn clauses(&self) -> Vec<FilterClause> {
        match self {
            Self::Text(text) => parse_filters(text),
            Self::Clauses(clauses) => clauses.clone(),
        }
    }
}

impl From<&str> for FilterInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<FilterClause>> for FilterInput {
    fn from(clauses: Vec<FilterClause>) -> Self {
        Self::Clauses(clauses)
    }
}

/// A list request: filters, sort, window and projection.
///
/// Deserializes from the camelCase JSON the grid components send; every field
/// is optional.
///
/// ```
/// use grid_sql::{PageRequest, SortDir};
///
/// let request: PageRequest = serde_json::from_str(
///     r#"{"filters":"name::bike::contains","take":10,"skip":20,"orderBy":"Name","dir":"desc"}"#,
/// ).unwrap();
/// assert_eq!(request.take, 10);
/// assert_eq!(request.dir, SortDir::Desc);
/// assert!(request.paging);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub filters: FilterInput,
    /// Page size; `0` means the configured default.
    pub take: u32,
    /// Rows to skip, zero-based.
    pub skip: u32,
    /// Sort field name, or several separated by commas.
    pub order_by: Option<String>,
    pub dir: SortDir,
    /// `false` returns every matching row and ignores `take`/`skip`.
    pub paging: bool,
    /// Free-text search over the table's searchable columns.
    pub keywords: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            kind: RequestKind::Grid,
            filters: FilterInput::default(),
            take: 0,
            skip: 0,
            order_by: None,
            dir: SortDir::Asc,
            paging: true,
            keywords: None,
        }
    }
}

impl PageRequest {
    /// A paged grid request with no filters and the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: impl Into<FilterInput>) -> Self {
        self.filters = filters.into();
        self
    }

    /// Set the row window.
    #[must_use]
    pub const fn with_window(mut self, skip: u32, take: u32) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    /// Set the sort field and direction.
    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.order_by = Some(field.into());
        self.dir = dir;
        self
    }

    /// Set the keyword search text.
    #[must_use]
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Return all matching rows in one envelope.
    #[must_use]
    pub const fn without_paging(mut self) -> Self {
        self.paging = false;
        self
    }

    /// Project the table's selection columns.
    #[must_use]
    pub const fn selection(mut self) -> Self {
        self.kind = RequestKind::Selection;
        self
    }

    /// Sort field names, trimmed, empties removed.
    pub fn order_fields(&self) -> Vec<&str> {
        self.order_by
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|f| !f.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Keyword text, if any non-blank text was given.
    pub fn keyword_text(&self) -> Option<&str> {
        self.keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
