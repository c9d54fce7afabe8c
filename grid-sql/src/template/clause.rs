//! Clause nodes: the structured input of the templates.
//!
//! A [`ClauseSet`] is what the composer produces from a request and what a
//! [`Template`](super::Template) consumes. Each node is tagged with the slot it
//! fills, so rendering is a walk over typed values rather than placeholder
//! substitution on a string skeleton.

use crate::table::Join;
use crate::types::{SortField, Value};

/// Comparison operators with a bound right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL operator text.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// LIKE-based string matching, rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
}

/// A boolean condition for WHERE or HAVING.
///
/// Columns are already resolved column references; values are always bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> ?`
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column LIKE ...`
    Pattern {
        column: String,
        kind: PatternKind,
        value: Value,
    },
    /// `column IS [NOT] NULL`
    IsNull { column: String, negated: bool },
    /// Empty-string check; NULL-equivalent on Oracle.
    IsEmpty { column: String, negated: bool },
    /// `column IN (?, ?, ...)`
    In { column: String, values: Vec<Value> },
    /// Flag column compared with a dialect boolean literal (soft delete).
    Flag { column: String, value: bool },
    /// Disjunction, used for keyword search across columns.
    Any(Vec<Predicate>),
    /// Trusted fragment declared by a table descriptor, e.g. a HAVING
    /// aggregate condition.
    Raw(String),
}

impl Predicate {
    /// `column = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// `column IN (values)`.
    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            column: column.into(),
            values,
        }
    }

    /// `column = <false literal>`: the row is not soft-deleted.
    pub fn not_deleted(column: impl Into<String>) -> Self {
        Self::Flag {
            column: column.into(),
            value: false,
        }
    }
}

/// Zero-based row window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u32,
    pub take: u32,
}

impl PageWindow {
    /// Create a window of `take` rows after `skip`.
    pub const fn new(skip: u32, take: u32) -> Self {
        Self { skip, take }
    }

    /// Exclusive upper row bound, `skip + take`.
    pub const fn end(self) -> u64 {
        self.skip as u64 + self.take as u64
    }
}

/// One clause slot of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Select(Vec<String>),
    Join(Join),
    Where(Predicate),
    GroupBy(Vec<String>),
    Having(Predicate),
    OrderBy(Vec<SortField>),
    Window(PageWindow),
}

/// An ordered collection of clause nodes.
///
/// Multiple `Where`/`Having` nodes are ANDed; multiple `GroupBy`/`OrderBy`
/// nodes concatenate; the last `Select` and `Window` win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseSet {
    clauses: Vec<Clause>,
}

impl ClauseSet {
    /// Empty clause set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause.
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, clause: Clause) -> Self {
        self.push(clause);
        self
    }

    /// All clauses in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// The projection, if one was set.
    pub fn select(&self) -> Option<&[String]> {
        self.clauses.iter().rev().find_map(|c| match c {
            Clause::Select(columns) => Some(columns.as_slice()),
            _ => None,
        })
    }

    /// Joins in declaration order.
    pub fn joins(&self) -> Vec<&Join> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Join(join) => Some(join),
                _ => None,
            })
            .collect()
    }

    /// WHERE predicates.
    pub fn wheres(&self) -> Vec<&Predicate> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Where(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// GROUP BY columns.
    pub fn group_by(&self) -> Vec<String> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::GroupBy(columns) => Some(columns.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// HAVING predicates.
    pub fn havings(&self) -> Vec<&Predicate> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Having(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Sort fields in priority order.
    pub fn order_by(&self) -> Vec<&SortField> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::OrderBy(fields) => Some(fields.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// The row window, if one was set.
    pub fn window(&self) -> Option<PageWindow> {
        self.clauses.iter().rev().find_map(|c| match c {
            Clause::Window(w) => Some(*w),
            _ => None,
        })
    }

    /// Whether any join is present.
    pub fn has_joins(&self) -> bool {
        self.clauses.iter().any(|c| matches!(c, Clause::Join(_)))
    }
}

impl Extend<Clause> for ClauseSet {
    fn extend<I: IntoIterator<Item = Clause>>(&mut self, iter: I) {
        self.clauses.extend(iter);
    }
}

impl FromIterator<Clause> for ClauseSet {
    fn from_iter<I: IntoIterator<Item = Clause>>(iter: I) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::JoinKind;
    use crate::types::SortDir;

    #[test]
    fn test_accessors() {
        let set = ClauseSet::new()
            .with(Clause::Select(vec!["t1.Id".into()]))
            .with(Clause::Join(Join::new(
                JoinKind::Left,
                "ProductImage",
                "pi",
                "pi.ProductId = t1.Id",
            )))
            .with(Clause::Where(Predicate::eq("t1.Name", "a")))
            .with(Clause::Where(Predicate::not_deleted("t1.IsDeleted")))
            .with(Clause::GroupBy(vec!["t1.Id".into()]))
            .with(Clause::OrderBy(vec![SortField::new("t1.Name", SortDir::Desc)]))
            .with(Clause::OrderBy(vec![SortField::new("t1.Id", SortDir::Asc)]))
            .with(Clause::Window(PageWindow::new(0, 5)))
            .with(Clause::Window(PageWindow::new(10, 5)));

        assert_eq!(set.select(), Some(&["t1.Id".to_string()][..]));
        assert_eq!(set.joins().len(), 1);
        assert!(set.has_joins());
        assert_eq!(set.wheres().len(), 2);
        assert_eq!(set.group_by(), vec!["t1.Id"]);
        assert!(set.havings().is_empty());
        let order: Vec<_> = set.order_by().iter().map(|f| f.to_sql()).collect();
        assert_eq!(order, vec!["t1.Name DESC", "t1.Id ASC"]);
        assert_eq!(set.window(), Some(PageWindow::new(10, 5)));
    }

    #[test]
    fn test_empty_set() {
        let set = ClauseSet::new();
        assert_eq!(set.select(), None);
        assert!(!set.has_joins());
        assert_eq!(set.window(), None);
    }

    #[test]
    fn test_window_end_does_not_overflow() {
        assert_eq!(PageWindow::new(u32::MAX, u32::MAX).end(), 2 * u64::from(u32::MAX));
    }
}
