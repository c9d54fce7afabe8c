//! Composition of request input into clause nodes.

use super::operator::FilterOperator;
use super::parse::FilterClause;
use crate::pagination::{PageRequest, RequestKind};
use crate::table::{MASTER_ALIAS, TableDescriptor};
use crate::template::{Clause, ClauseSet, CompareOp, PageWindow, PatternKind, Predicate};
use crate::types::{SortDir, SortField, Value};
use crate::validate::is_valid_column_ref;
use thiserror::Error;
use tracing::debug;

/// Request input the composer refuses to turn into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The operator token is outside the filter vocabulary.
    #[error("unsupported filter operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// The filter field is not a column name.
    #[error("invalid filter field '{0}'")]
    InvalidField(String),

    /// The field is a column name but not one this table lets callers use.
    #[error("field '{0}' is not filterable or sortable on this table")]
    FieldNotAllowed(String),

    /// The sort field is not a column name.
    #[error("invalid sort field '{0}'")]
    InvalidSortField(String),

    /// A binary operator arrived without a value.
    #[error("operator '{operator}' on field '{field}' requires a value")]
    MissingValue { field: String, operator: String },
}

/// Turns a [`PageRequest`] into the clause set for one table.
///
/// Only column names and operator vocabulary reach the SQL text; every value
/// becomes a bound parameter.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'a> {
    table: &'a TableDescriptor,
}

impl<'a> Composer<'a> {
    /// Create a composer for `table`.
    pub const fn new(table: &'a TableDescriptor) -> Self {
        Self { table }
    }

    /// Compose the full clause set for a request.
    ///
    /// The window is passed separately because its size is resolved against
    /// the engine configuration; `None` renders no window.
    pub fn compose(
        &self,
        request: &PageRequest,
        window: Option<PageWindow>,
    ) -> Result<ClauseSet, ValidationError> {
        let projection = match request.kind {
            RequestKind::Grid => self.table.select_list(),
            RequestKind::Selection => self.table.selection_list(),
        };

        let mut set = ClauseSet::new().with(Clause::Select(projection));
        set.extend(self.table.joins().iter().cloned().map(Clause::Join));
        set.extend(self.base_predicates().into_iter().map(Clause::Where));
        set.extend(
            self.filter_predicates(&request.filters.clauses())?
                .into_iter()
                .map(Clause::Where),
        );
        if let Some(keywords) = request.keyword_text() {
            if let Some(search) = self.keyword_predicate(keywords) {
                set.push(Clause::Where(search));
            } else {
                debug!(table = self.table.name(), "keywords ignored: no searchable columns");
            }
        }

        let group_by = self.table.group_by_columns();
        if !group_by.is_empty() {
            set.push(Clause::GroupBy(group_by.to_vec()));
        }
        set.extend(
            self.table
                .having_predicates()
                .iter()
                .map(|h| Clause::Having(Predicate::Raw(h.clone()))),
        );

        let order = self.sort_fields(&request.order_fields(), request.dir)?;
        if !order.is_empty() {
            set.push(Clause::OrderBy(order));
        }
        if let Some(window) = window {
            set.push(Clause::Window(window));
        }
        Ok(set)
    }

    /// Predicates every query against this table carries: the soft-delete
    /// filter, when the table declares a flag column.
    pub fn base_predicates(&self) -> Vec<Predicate> {
        self.table
            .soft_delete_column()
            .map(|flag| Predicate::not_deleted(format!("{MASTER_ALIAS}.{flag}")))
            .into_iter()
            .collect()
    }

    /// Translate filter clauses into predicates, failing on the first clause
    /// that cannot be expressed.
    pub fn filter_predicates(
        &self,
        clauses: &[FilterClause],
    ) -> Result<Vec<Predicate>, ValidationError> {
        clauses.iter().map(|c| self.predicate(c)).collect()
    }

    fn predicate(&self, clause: &FilterClause) -> Result<Predicate, ValidationError> {
        let field = clause.field.trim();
        let op = clause
            .parsed_operator()
            .ok_or_else(|| ValidationError::UnsupportedOperator {
                field: field.to_string(),
                operator: clause.operator.clone(),
            })?;
        let column = self.resolve(field, ValidationError::InvalidField)?;

        if !op.is_unary() && clause.value.is_empty() {
            return Err(ValidationError::MissingValue {
                field: field.to_string(),
                operator: op.as_token().to_string(),
            });
        }
        let value = Value::String(clause.value.clone());

        let compare = |op| Predicate::Compare {
            column: column.clone(),
            op,
            value: value.clone(),
        };
        let pattern = |kind| Predicate::Pattern {
            column: column.clone(),
            kind,
            value: value.clone(),
        };

        Ok(match op {
            FilterOperator::Eq => compare(CompareOp::Eq),
            FilterOperator::Neq => compare(CompareOp::Ne),
            FilterOperator::Lt => compare(CompareOp::Lt),
            FilterOperator::Lte => compare(CompareOp::Lte),
            FilterOperator::Gt => compare(CompareOp::Gt),
            FilterOperator::Gte => compare(CompareOp::Gte),
            FilterOperator::StartsWith => pattern(PatternKind::StartsWith),
            FilterOperator::EndsWith => pattern(PatternKind::EndsWith),
            FilterOperator::Contains => pattern(PatternKind::Contains),
            FilterOperator::DoesNotContain => pattern(PatternKind::NotContains),
            FilterOperator::IsNull => Predicate::IsNull {
                column,
                negated: false,
            },
            FilterOperator::IsNotNull => Predicate::IsNull {
                column,
                negated: true,
            },
            FilterOperator::IsEmpty => Predicate::IsEmpty {
                column,
                negated: false,
            },
            FilterOperator::IsNotEmpty => Predicate::IsEmpty {
                column,
                negated: true,
            },
        })
    }

    /// OR of `contains` over the searchable columns.
    fn keyword_predicate(&self, keywords: &str) -> Option<Predicate> {
        let columns = self.table.searchable_columns();
        if columns.is_empty() {
            return None;
        }
        Some(Predicate::Any(
            columns
                .iter()
                .map(|column| Predicate::Pattern {
                    column: self.table.resolve_field(column),
                    kind: PatternKind::Contains,
                    value: Value::from(keywords),
                })
                .collect(),
        ))
    }

    /// Requested sort fields followed by tiebreakers: the GROUP BY columns of a
    /// grouped table, else the primary keys.
    fn sort_fields(&self, fields: &[&str], dir: SortDir) -> Result<Vec<SortField>, ValidationError> {
        let mut order = fields
            .iter()
            .map(|f| {
                self.resolve(f, ValidationError::InvalidSortField)
                    .map(|column| SortField::new(column, dir))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tiebreak = if self.table.group_by_columns().is_empty() {
            self.table.qualified_keys()
        } else {
            self.table.group_by_columns().to_vec()
        };
        for key in tiebreak {
            if !order.iter().any(|s| s.column == key) {
                order.push(SortField::new(key, SortDir::Asc));
            }
        }
        Ok(order)
    }

    fn resolve(
        &self,
        field: &str,
        invalid: fn(String) -> ValidationError,
    ) -> Result<String, ValidationError> {
        if !is_valid_column_ref(field) {
            return Err(invalid(field.to_string()));
        }
        if !self.table.allows_field(field) {
            return Err(ValidationError::FieldNotAllowed(field.to_string()));
        }
        Ok(self.table.resolve_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySql;
    use crate::filter::Logic;
    use crate::template::Template;

    fn product() -> TableDescriptor {
        TableDescriptor::new("Product")
            .columns(&["t1.Id", "t1.Name", "pi.Url AS ImageUrl"])
            .primary_keys(&["Id"])
            .left_join("ProductImage", "pi", "pi.ProductId = t1.Id")
            .soft_delete("IsDeleted")
            .searchable(&["t1.Name", "t1.Sku"])
            .selection(&["t1.Id", "t1.Name"])
            .map_field("imageUrl", "pi.Url")
    }

    #[test]
    fn test_compose_text_filters() {
        let table = product();
        let request = PageRequest::new()
            .with_filters("Name::bike::contains|imageUrl::::isnotnull")
            .with_order("Name", SortDir::Desc);
        let set = Composer::new(&table)
            .compose(&request, Some(PageWindow::new(0, 10)))
            .unwrap();

        let query = Template::new(MySql, &table).render(&set);
        assert_eq!(
            query.sql,
            "SELECT t1.Id, t1.Name, pi.Url AS ImageUrl FROM Product t1 \
             LEFT JOIN ProductImage pi ON pi.ProductId = t1.Id \
             WHERE t1.IsDeleted = 0 AND t1.Name LIKE CONCAT('%', ?, '%') AND pi.Url IS NOT NULL \
             ORDER BY t1.Name DESC, t1.Id ASC"
        );
        assert_eq!(query.params, vec![Value::from("bike")]);
        assert_eq!(set.window(), Some(PageWindow::new(0, 10)));
    }

    #[test]
    fn test_default_order_is_primary_key() {
        let table = product();
        let set = Composer::new(&table).compose(&PageRequest::new(), None).unwrap();
        let order: Vec<_> = set.order_by().iter().map(|f| f.to_sql()).collect();
        assert_eq!(order, vec!["t1.Id ASC"]);
        assert_eq!(set.window(), None);
    }

    #[test]
    fn test_key_sort_is_not_duplicated() {
        let table = product();
        let request = PageRequest::new().with_order("Id", SortDir::Desc);
        let set = Composer::new(&table).compose(&request, None).unwrap();
        let order: Vec<_> = set.order_by().iter().map(|f| f.to_sql()).collect();
        assert_eq!(order, vec!["t1.Id DESC"]);
    }

    #[test]
    fn test_unknown_operator_fails_closed() {
        let table = product();
        let request = PageRequest::new().with_filters(vec![FilterClause {
            field: "Name".into(),
            operator: "regex".into(),
            value: ".*".into(),
            logic: Logic::And,
        }]);
        let err = Composer::new(&table).compose(&request, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedOperator {
                field: "Name".into(),
                operator: "regex".into()
            }
        );
        assert!(err.to_string().contains("regex"));
    }

    #[test]
    fn test_structured_clause_missing_value() {
        let table = product();
        let request = PageRequest::new()
            .with_filters(vec![FilterClause::new("Name", FilterOperator::Eq, "")]);
        let err = Composer::new(&table).compose(&request, None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingValue { .. }));
    }

    #[test]
    fn test_invalid_fields() {
        let table = product();
        let composer = Composer::new(&table);

        let request = PageRequest::new()
            .with_filters(vec![FilterClause::new("Name; --", FilterOperator::Eq, "x")]);
        assert_eq!(
            composer.compose(&request, None).unwrap_err(),
            ValidationError::InvalidField("Name; --".into())
        );

        let request = PageRequest::new().with_order("Name DESC", SortDir::Asc);
        assert_eq!(
            composer.compose(&request, None).unwrap_err(),
            ValidationError::InvalidSortField("Name DESC".into())
        );
    }

    #[test]
    fn test_filterable_whitelist() {
        let table = product().filterable(&["Name", "Id"]);
        let composer = Composer::new(&table);

        let request = PageRequest::new().with_filters("Cost::5::gt");
        assert_eq!(
            composer.compose(&request, None).unwrap_err(),
            ValidationError::FieldNotAllowed("Cost".into())
        );

        let request = PageRequest::new().with_filters("Name::a::eq");
        assert!(composer.compose(&request, None).is_ok());
    }

    #[test]
    fn test_keywords_and_selection() {
        let table = product();
        let request = PageRequest::new().with_keywords(" bike ").selection();
        let set = Composer::new(&table).compose(&request, None).unwrap();

        let query = Template::new(MySql, &table).render(&set);
        assert!(query.sql.starts_with("SELECT t1.Id, t1.Name FROM Product t1"));
        assert!(query.sql.contains(
            "AND (t1.Name LIKE CONCAT('%', ?, '%') OR t1.Sku LIKE CONCAT('%', ?, '%'))"
        ));
        assert_eq!(query.params, vec![Value::from("bike"), Value::from("bike")]);
    }

    #[test]
    fn test_group_by_and_having_come_from_descriptor() {
        let table = product()
            .group_by(&["t1.Id", "t1.Name"])
            .having("COUNT(pi.Id) > 0");
        let set = Composer::new(&table).compose(&PageRequest::new(), None).unwrap();
        assert_eq!(set.group_by(), vec!["t1.Id", "t1.Name"]);
        assert_eq!(
            set.havings(),
            vec![&Predicate::Raw("COUNT(pi.Id) > 0".into())]
        );
    }

    #[test]
    fn test_grouped_table_breaks_ties_on_group_columns() {
        let table = product().group_by(&["t1.CategoryId"]);
        let request = PageRequest::new().with_order("Name", SortDir::Desc);
        let set = Composer::new(&table).compose(&request, None).unwrap();
        let order: Vec<_> = set.order_by().iter().map(|f| f.to_sql()).collect();
        assert_eq!(order, vec!["t1.Name DESC", "t1.CategoryId ASC"]);
    }

    #[test]
    fn test_no_soft_delete_column() {
        let table = TableDescriptor::new("District").primary_keys(&["Id"]);
        assert!(Composer::new(&table).base_predicates().is_empty());
    }
}
