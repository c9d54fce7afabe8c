//! Per-dialect rendering of clause sets into SQL.

use super::clause::{ClauseSet, CompareOp, PageWindow, PatternKind, Predicate};
use crate::dialect::{Dialect, WindowStrategy};
use crate::table::{JoinKind, MASTER_ALIAS, TableDescriptor};
use crate::types::{QueryResult, SortDir, SortField, Value};
use tracing::{debug, warn};

/// Alias of the distinct-keys subquery joined back onto the master table.
const KEYS_ALIAS: &str = "t_keys";
/// Alias of the derived table wrapped by counting queries.
const COUNT_ALIAS: &str = "t_count";
/// Alias of the ordered key query inside the Oracle `ROWNUM` wrapper.
const ROWS_ALIAS: &str = "t_rows";
/// Column carrying `ROWNUM` out of the Oracle wrapper.
const ROW_NUM: &str = "row_num";
/// Prefix of the group-tuple columns selected by the windowed group query.
const GROUP_SLOT: &str = "grp_";

/// Renders the plain, paging and counting queries for one table.
///
/// A template borrows an immutable descriptor and holds no other state, so the
/// same descriptor can back any number of concurrent renders. Every call
/// returns a fresh [`QueryResult`].
///
/// # Example
///
/// ```
/// use grid_sql::{Clause, ClauseSet, MySql, PageWindow, TableDescriptor, Template};
///
/// let table = TableDescriptor::new("Product").primary_keys(&["Id"]);
/// let clauses = ClauseSet::new().with(Clause::Window(PageWindow::new(20, 10)));
///
/// let query = Template::new(MySql, &table).render_paging(&clauses);
/// assert!(query.sql.contains("LIMIT 10 OFFSET 20"));
/// assert!(query.sql.contains("t_keys ON t1.Id = t_keys.Id"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Template<'a, D: Dialect> {
    dialect: D,
    table: &'a TableDescriptor,
}

impl<'a, D: Dialect> Template<'a, D> {
    /// Create a template for `table` in `dialect`.
    pub const fn new(dialect: D, table: &'a TableDescriptor) -> Self {
        Self { dialect, table }
    }

    /// The descriptor this template renders.
    pub const fn table(&self) -> &'a TableDescriptor {
        self.table
    }

    /// `SELECT ... FROM ... [joins] [WHERE] [GROUP BY] [HAVING] [ORDER BY]`,
    /// without any row window. HAVING is only rendered alongside a GROUP BY.
    pub fn render(&self, clauses: &ClauseSet) -> QueryResult {
        let mut w = SqlWriter::new(self.dialect);
        w.push(&format!(
            "SELECT {} {}",
            self.select_list(clauses),
            self.from_clause(clauses)
        ));
        w.conditions(" WHERE ", None, &clauses.wheres());
        Self::push_grouping(&mut w, clauses, &clauses.group_by());

        let order = clauses.order_by();
        if !order.is_empty() {
            w.push(&format!(" ORDER BY {}", sort_list(order.iter().copied())));
        }

        let query = w.finish();
        self.trace("plain", &query);
        query
    }

    /// Window of distinct result rows, safe against join fan-out.
    ///
    /// The row window is cut on a subquery that selects only the primary keys
    /// (grouped, so each master row appears once), which is then joined back
    /// onto the table with the declared joins and filters re-applied. When the
    /// clause set groups, the window is cut over distinct group tuples instead
    /// and the rejoin matches on the grouping columns. Falls back to
    /// [`render`](Self::render) when an ungrouped descriptor has no primary
    /// key or the clause set carries no window.
    pub fn render_paging(&self, clauses: &ClauseSet) -> QueryResult {
        let Some(window) = clauses.window() else {
            return self.render(clauses);
        };
        let group_by = clauses.group_by();
        if !group_by.is_empty() {
            return self.render_group_paging(clauses, window, &group_by);
        }

        let keys = self.table.qualified_keys();
        if keys.is_empty() {
            if clauses.has_joins() {
                warn!(
                    table = self.table.name(),
                    "paging a joined query without primary keys; rendering unpaged rows"
                );
            } else {
                debug!(
                    table = self.table.name(),
                    "no primary keys declared; rendering unpaged rows"
                );
            }
            return self.render(clauses);
        }

        // Child rows without a master row have no key to page on.
        let anchored = Self::has_right_join(clauses);
        if anchored {
            debug!(
                table = self.table.name(),
                "right joins page over existing master rows"
            );
        }

        let mut w = SqlWriter::new(self.dialect);
        w.push(&format!(
            "SELECT {} FROM {} {MASTER_ALIAS} INNER JOIN (",
            self.select_list(clauses),
            self.table.name()
        ));
        let key_list = keys.join(", ");
        let row_bound = self.push_window(&mut w, window, |w| {
            w.push(&format!("SELECT {key_list} {}", self.from_clause(clauses)));
            let lead = anchored.then(|| not_null(&keys));
            w.conditions(" WHERE ", lead, &clauses.wheres());
            w.push(&format!(
                " GROUP BY {key_list} ORDER BY {}",
                Self::key_order(clauses, &keys)
            ));
        });

        w.push(&format!(") {KEYS_ALIAS} ON {}", self.key_join_condition()));
        for join in clauses.joins() {
            let kind = match join.kind {
                JoinKind::Right => JoinKind::Left,
                kind => kind,
            };
            w.push(" ");
            w.push(&join.to_sql_as(kind));
        }
        w.conditions(" WHERE ", row_bound, &clauses.wheres());
        w.push(&format!(" ORDER BY {}", Self::display_order(clauses, &keys)));

        let query = w.finish();
        self.trace("paging", &query);
        query
    }

    /// Count of distinct master rows, or of distinct group tuples.
    ///
    /// `grouped` is the grouping to count over for this call; when empty, the
    /// clause set's GROUP BY is used. With no grouping at all the count is over
    /// distinct primary keys, or plain rows if the table has none.
    pub fn render_counting(&self, clauses: &ClauseSet, grouped: &[String]) -> QueryResult {
        let group_by = clauses.group_by();
        let grouping = if grouped.is_empty() {
            group_by.clone()
        } else {
            grouped.to_vec()
        };
        let from = self.from_clause(clauses);
        let keys = self.table.qualified_keys();
        let wheres = clauses.wheres();
        let mut w = SqlWriter::new(self.dialect);

        if !grouping.is_empty() {
            w.push(&format!("SELECT COUNT(1) FROM (SELECT 1 AS grp {from}"));
            w.conditions(" WHERE ", None, &wheres);
            w.push(&format!(" GROUP BY {}", grouping.join(", ")));
            if !group_by.is_empty() {
                w.conditions(" HAVING ", None, &clauses.havings());
            }
            w.push(&format!(") {COUNT_ALIAS}"));
        } else {
            match keys.as_slice() {
                [] => {
                    w.push(&format!("SELECT COUNT(1) {from}"));
                    w.conditions(" WHERE ", None, &wheres);
                },
                [key] => {
                    w.push(&format!("SELECT COUNT(DISTINCT {key}) {from}"));
                    w.conditions(" WHERE ", None, &wheres);
                },
                _ => {
                    w.push(&format!(
                        "SELECT COUNT(1) FROM (SELECT DISTINCT {} {from}",
                        keys.join(", ")
                    ));
                    let lead = Self::has_right_join(clauses).then(|| not_null(&keys));
                    w.conditions(" WHERE ", lead, &wheres);
                    w.push(&format!(") {COUNT_ALIAS}"));
                },
            }
        }

        let query = w.finish();
        self.trace("counting", &query);
        query
    }

    /// Paging over distinct group tuples.
    ///
    /// The outer query keeps the declared joins as written and matches the
    /// windowed tuples null-safely, so each page holds whole groups.
    fn render_group_paging(
        &self,
        clauses: &ClauseSet,
        window: PageWindow,
        group_by: &[String],
    ) -> QueryResult {
        let slots: Vec<String> = (1..=group_by.len())
            .map(|i| format!("{GROUP_SLOT}{i}"))
            .collect();
        let key_select = group_by
            .iter()
            .zip(&slots)
            .map(|(column, slot)| format!("{column} AS {slot}"))
            .collect::<Vec<_>>()
            .join(", ");
        let from = self.from_clause(clauses);

        let mut w = SqlWriter::new(self.dialect);
        w.push(&format!(
            "SELECT {} {from} INNER JOIN (",
            self.select_list(clauses)
        ));
        let row_bound = self.push_window(&mut w, window, |w| {
            w.push(&format!("SELECT {key_select} {from}"));
            w.conditions(" WHERE ", None, &clauses.wheres());
            Self::push_grouping(w, clauses, group_by);
            w.push(&format!(" ORDER BY {}", Self::key_order(clauses, group_by)));
        });

        let on = group_by
            .iter()
            .zip(&slots)
            .map(|(column, slot)| {
                format!(
                    "({column} = {KEYS_ALIAS}.{slot} OR ({column} IS NULL AND {KEYS_ALIAS}.{slot} IS NULL))"
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        w.push(&format!(") {KEYS_ALIAS} ON {on}"));
        w.conditions(" WHERE ", row_bound, &clauses.wheres());
        Self::push_grouping(&mut w, clauses, group_by);
        w.push(&format!(" ORDER BY {}", Self::display_order(clauses, group_by)));

        let query = w.finish();
        self.trace("group paging", &query);
        query
    }

    /// Write the windowed key query. Returns the lower row bound the outer
    /// query must apply, if the dialect windows with `ROWNUM`.
    fn push_window(
        &self,
        w: &mut SqlWriter<D>,
        window: PageWindow,
        key_query: impl FnOnce(&mut SqlWriter<D>),
    ) -> Option<String> {
        match self.dialect.window_strategy() {
            WindowStrategy::LimitOffset => {
                key_query(w);
                w.push(&format!(" LIMIT {} OFFSET {}", window.take, window.skip));
                None
            },
            WindowStrategy::RowNum => {
                w.push(&format!("SELECT {ROWS_ALIAS}.*, ROWNUM {ROW_NUM} FROM ("));
                key_query(w);
                w.push(&format!(
                    ") {ROWS_ALIAS} WHERE ROWNUM <= {}",
                    window.end()
                ));
                Some(Self::skip_bound(window))
            },
        }
    }

    fn has_right_join(clauses: &ClauseSet) -> bool {
        clauses.joins().iter().any(|j| j.kind == JoinKind::Right)
    }

    fn select_list(&self, clauses: &ClauseSet) -> String {
        clauses
            .select()
            .filter(|columns| !columns.is_empty())
            .map_or_else(|| self.table.select_list().join(", "), |c| c.join(", "))
    }

    fn from_clause(&self, clauses: &ClauseSet) -> String {
        let mut from = format!("FROM {} {MASTER_ALIAS}", self.table.name());
        for join in clauses.joins() {
            from.push(' ');
            from.push_str(&join.to_sql());
        }
        from
    }

    /// Ordering for the grouped key query: sort columns outside `keys` are
    /// folded to the extreme value per key, and any key the sort leaves out is
    /// appended so the window is deterministic.
    fn key_order(clauses: &ClauseSet, keys: &[String]) -> String {
        let order = clauses.order_by();
        let mut parts: Vec<String> = order
            .iter()
            .map(|field| {
                if keys.contains(&field.column) {
                    field.to_sql()
                } else {
                    match field.dir {
                        SortDir::Asc => format!("MIN({}) ASC", field.column),
                        SortDir::Desc => format!("MAX({}) DESC", field.column),
                    }
                }
            })
            .collect();
        parts.extend(missing_keys(&order, keys));
        parts.join(", ")
    }

    fn display_order(clauses: &ClauseSet, keys: &[String]) -> String {
        let order = clauses.order_by();
        let mut parts: Vec<String> = order.iter().map(|f| f.to_sql()).collect();
        parts.extend(missing_keys(&order, keys));
        parts.join(", ")
    }

    fn key_join_condition(&self) -> String {
        self.table
            .primary_key_columns()
            .iter()
            .map(|k| format!("{MASTER_ALIAS}.{k} = {KEYS_ALIAS}.{k}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn skip_bound(window: PageWindow) -> String {
        format!("{KEYS_ALIAS}.{ROW_NUM} > {}", window.skip)
    }

    /// `GROUP BY` plus the clause set's HAVING, or nothing when ungrouped.
    fn push_grouping(w: &mut SqlWriter<D>, clauses: &ClauseSet, columns: &[String]) {
        if !columns.is_empty() {
            w.push(&format!(" GROUP BY {}", columns.join(", ")));
            w.conditions(" HAVING ", None, &clauses.havings());
        }
    }

    fn trace(&self, kind: &'static str, query: &QueryResult) {
        debug!(
            dialect = self.dialect.name(),
            table = self.table.name(),
            kind,
            params = query.params.len(),
            sql = %query.sql,
            "rendered query"
        );
    }
}

fn sort_list<'s>(fields: impl Iterator<Item = &'s SortField>) -> String {
    fields.map(SortField::to_sql).collect::<Vec<_>>().join(", ")
}

/// `key ASC` for every key the sort does not already name.
fn missing_keys(order: &[&SortField], keys: &[String]) -> Vec<String> {
    keys.iter()
        .filter(|k| !order.iter().any(|f| &f.column == *k))
        .map(|k| format!("{k} ASC"))
        .collect()
}

fn not_null(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{c} IS NOT NULL"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Accumulates SQL text and bound parameters, threading the placeholder index.
struct SqlWriter<D: Dialect> {
    dialect: D,
    sql: String,
    params: Vec<Value>,
    idx: usize,
}

impl<D: Dialect> SqlWriter<D> {
    fn new(dialect: D) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            idx: 1,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// Write `keyword` followed by the ANDed predicates, or nothing when there
    /// are none. `lead` is a literal condition placed first.
    fn conditions(&mut self, keyword: &str, lead: Option<String>, predicates: &[&Predicate]) {
        let mut parts: Vec<String> = lead.into_iter().collect();
        for predicate in predicates {
            let (sql, params, next) = render_predicate(&self.dialect, predicate, self.idx);
            parts.push(sql);
            self.params.extend(params);
            self.idx = next;
        }
        if !parts.is_empty() {
            self.sql.push_str(keyword);
            self.sql.push_str(&parts.join(" AND "));
        }
    }

    fn finish(self) -> QueryResult {
        QueryResult {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Render one predicate starting at placeholder `start_idx`.
///
/// Returns the SQL fragment, its parameters and the next free index.
pub(crate) fn render_predicate<D: Dialect>(
    dialect: &D,
    predicate: &Predicate,
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    let idx = start_idx;

    match predicate {
        // NULL handling
        Predicate::Compare {
            column,
            op: CompareOp::Eq,
            value: Value::Null,
        } => (format!("{column} IS NULL"), vec![], idx),
        Predicate::Compare {
            column,
            op: CompareOp::Ne,
            value: Value::Null,
        } => (format!("{column} IS NOT NULL"), vec![], idx),

        Predicate::Compare { column, op, value } => {
            let sql = format!("{} {} {}", column, op.sql(), dialect.param(idx));
            (sql, vec![value.clone()], idx + 1)
        },

        Predicate::Pattern {
            column,
            kind,
            value,
        } => {
            let sql = match kind {
                PatternKind::StartsWith => dialect.starts_with_clause(column, idx),
                PatternKind::EndsWith => dialect.ends_with_clause(column, idx),
                PatternKind::Contains => dialect.contains_clause(column, idx),
                PatternKind::NotContains => dialect.not_contains_clause(column, idx),
            };
            (sql, vec![value.clone()], idx + 1)
        },

        Predicate::IsNull { column, negated } => {
            let sql = if *negated {
                format!("{column} IS NOT NULL")
            } else {
                format!("{column} IS NULL")
            };
            (sql, vec![], idx)
        },

        Predicate::IsEmpty { column, negated } => {
            let sql = if *negated {
                dialect.is_not_empty_clause(column)
            } else {
                dialect.is_empty_clause(column)
            };
            (sql, vec![], idx)
        },

        // An empty IN list matches nothing.
        Predicate::In { values, .. } if values.is_empty() => ("1 = 0".to_string(), vec![], idx),
        Predicate::In { column, values } => {
            let (sql, params) = dialect.in_clause(column, values, idx);
            let next = idx + params.len();
            (sql, params, next)
        },

        Predicate::Flag { column, value } => {
            (format!("{column} = {}", dialect.bool_lit(*value)), vec![], idx)
        },

        Predicate::Any(predicates) => {
            let mut next = idx;
            let mut params = Vec::new();
            let mut parts = Vec::with_capacity(predicates.len());
            for p in predicates {
                let (sql, p_params, p_next) = render_predicate(dialect, p, next);
                parts.push(sql);
                params.extend(p_params);
                next = p_next;
            }
            let sql = match parts.len() {
                0 => "1 = 0".to_string(),
                1 => parts.concat(),
                _ => format!("({})", parts.join(" OR ")),
            };
            (sql, params, next)
        },

        Predicate::Raw(sql) => (sql.clone(), vec![], idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Oracle};
    use crate::template::clause::Clause;
    use crate::types::SortDir;

    const PRODUCT_SELECT: &str = "SELECT t1.Id, t1.Name, pi.Url AS ImageUrl";
    const PRODUCT_JOIN: &str = "LEFT JOIN ProductImage pi ON pi.ProductId = t1.Id";

    fn product() -> TableDescriptor {
        TableDescriptor::new("Product")
            .columns(&["t1.Id", "t1.Name", "pi.Url AS ImageUrl"])
            .primary_keys(&["Id"])
            .left_join("ProductImage", "pi", "pi.ProductId = t1.Id")
    }

    fn product_clauses(table: &TableDescriptor) -> ClauseSet {
        let mut set = ClauseSet::new().with(Clause::Select(table.select_list()));
        set.extend(table.joins().iter().cloned().map(Clause::Join));
        set.with(Clause::Where(Predicate::Pattern {
            column: "t1.Name".into(),
            kind: PatternKind::Contains,
            value: "a".into(),
        }))
        .with(Clause::Where(Predicate::not_deleted("t1.IsDeleted")))
        .with(Clause::OrderBy(vec![
            SortField::new("t1.Name", SortDir::Asc),
            SortField::new("t1.Id", SortDir::Asc),
        ]))
        .with(Clause::Window(PageWindow::new(10, 5)))
    }

    #[test]
    fn test_render_plain_mysql() {
        let table = product();
        let query = Template::new(MySql, &table).render(&product_clauses(&table));

        assert_eq!(
            query.sql,
            format!(
                "{PRODUCT_SELECT} FROM Product t1 {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE CONCAT('%', ?, '%') AND t1.IsDeleted = 0 \
                 ORDER BY t1.Name ASC, t1.Id ASC"
            )
        );
        assert_eq!(query.params, vec![Value::from("a")]);
    }

    #[test]
    fn test_render_empty_clauses_has_no_where() {
        let table = TableDescriptor::new("District");
        let query = Template::new(MySql, &table).render(&ClauseSet::new());
        assert_eq!(query.sql, "SELECT t1.* FROM District t1");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_render_paging_mysql() {
        let table = product();
        let query = Template::new(MySql, &table).render_paging(&product_clauses(&table));

        assert_eq!(
            query.sql,
            format!(
                "{PRODUCT_SELECT} FROM Product t1 INNER JOIN (\
                 SELECT t1.Id FROM Product t1 {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE CONCAT('%', ?, '%') AND t1.IsDeleted = 0 \
                 GROUP BY t1.Id ORDER BY MIN(t1.Name) ASC, t1.Id ASC LIMIT 5 OFFSET 10\
                 ) t_keys ON t1.Id = t_keys.Id {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE CONCAT('%', ?, '%') AND t1.IsDeleted = 0 \
                 ORDER BY t1.Name ASC, t1.Id ASC"
            )
        );
        assert_eq!(query.params, vec![Value::from("a"), Value::from("a")]);
    }

    #[test]
    fn test_render_paging_oracle() {
        let table = product();
        let query = Template::new(Oracle, &table).render_paging(&product_clauses(&table));

        assert_eq!(
            query.sql,
            format!(
                "{PRODUCT_SELECT} FROM Product t1 INNER JOIN (\
                 SELECT t_rows.*, ROWNUM row_num FROM (\
                 SELECT t1.Id FROM Product t1 {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE '%' || :1 || '%' AND t1.IsDeleted = 0 \
                 GROUP BY t1.Id ORDER BY MIN(t1.Name) ASC, t1.Id ASC\
                 ) t_rows WHERE ROWNUM <= 15\
                 ) t_keys ON t1.Id = t_keys.Id {PRODUCT_JOIN} \
                 WHERE t_keys.row_num > 10 AND t1.Name LIKE '%' || :2 || '%' AND t1.IsDeleted = 0 \
                 ORDER BY t1.Name ASC, t1.Id ASC"
            )
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_render_paging_descending_non_key_uses_max() {
        let table = product();
        let set = ClauseSet::new()
            .with(Clause::OrderBy(vec![
                SortField::new("t1.Name", SortDir::Desc),
                SortField::new("t1.Id", SortDir::Desc),
            ]))
            .with(Clause::Window(PageWindow::new(0, 3)));
        let query = Template::new(MySql, &table).render_paging(&set);
        assert!(
            query
                .sql
                .contains("GROUP BY t1.Id ORDER BY MAX(t1.Name) DESC, t1.Id DESC LIMIT 3 OFFSET 0")
        );
        assert!(query.sql.ends_with("ORDER BY t1.Name DESC, t1.Id DESC"));
    }

    #[test]
    fn test_render_paging_composite_key() {
        let table = TableDescriptor::new("OrderLine").primary_keys(&["OrderId", "LineNo"]);
        let set = ClauseSet::new().with(Clause::Window(PageWindow::new(0, 10)));
        let query = Template::new(MySql, &table).render_paging(&set);

        assert_eq!(
            query.sql,
            "SELECT t1.* FROM OrderLine t1 INNER JOIN (\
             SELECT t1.OrderId, t1.LineNo FROM OrderLine t1 \
             GROUP BY t1.OrderId, t1.LineNo ORDER BY t1.OrderId ASC, t1.LineNo ASC \
             LIMIT 10 OFFSET 0) t_keys \
             ON t1.OrderId = t_keys.OrderId AND t1.LineNo = t_keys.LineNo \
             ORDER BY t1.OrderId ASC, t1.LineNo ASC"
        );
    }

    #[test]
    fn test_render_paging_without_keys_degrades_to_plain() {
        let table = TableDescriptor::new("AuditLog")
            .left_join("Account", "a", "a.Id = t1.AccountId");
        let mut set = ClauseSet::new().with(Clause::Window(PageWindow::new(0, 10)));
        set.extend(table.joins().iter().cloned().map(Clause::Join));

        let template = Template::new(MySql, &table);
        assert_eq!(template.render_paging(&set), template.render(&set));
        assert!(!template.render_paging(&set).sql.contains("LIMIT"));
    }

    #[test]
    fn test_render_paging_without_window_degrades_to_plain() {
        let table = product();
        let template = Template::new(Oracle, &table);
        let set = ClauseSet::new();
        assert_eq!(template.render_paging(&set), template.render(&set));
    }

    #[test]
    fn test_having_needs_group_by_in_every_query() {
        let table = product();
        let set = ClauseSet::new()
            .with(Clause::Having(Predicate::Raw("COUNT(pi.Id) > 0".into())))
            .with(Clause::Window(PageWindow::new(0, 2)));
        let template = Template::new(MySql, &table);

        assert!(!template.render(&set).sql.contains("HAVING"));
        assert!(!template.render_paging(&set).sql.contains("HAVING"));
        assert!(!template.render_counting(&set, &[]).sql.contains("HAVING"));
        // A counting-only grouping does not pull the HAVING in either.
        let grouped = vec!["t1.Id".to_string()];
        assert!(!template.render_counting(&set, &grouped).sql.contains("HAVING"));
    }

    #[test]
    fn test_render_paging_grouped_windows_group_tuples() {
        let table = product();
        let set = ClauseSet::new()
            .with(Clause::Select(vec!["t1.CategoryId".into(), "COUNT(t1.Id) AS N".into()]))
            .with(Clause::GroupBy(vec!["t1.CategoryId".into()]))
            .with(Clause::Having(Predicate::Raw("COUNT(t1.Id) > 0".into())))
            .with(Clause::Window(PageWindow::new(1, 1)));

        let query = Template::new(MySql, &table).render_paging(&set);
        assert_eq!(
            query.sql,
            "SELECT t1.CategoryId, COUNT(t1.Id) AS N FROM Product t1 INNER JOIN (\
             SELECT t1.CategoryId AS grp_1 FROM Product t1 \
             GROUP BY t1.CategoryId HAVING COUNT(t1.Id) > 0 \
             ORDER BY t1.CategoryId ASC LIMIT 1 OFFSET 1\
             ) t_keys ON (t1.CategoryId = t_keys.grp_1 \
             OR (t1.CategoryId IS NULL AND t_keys.grp_1 IS NULL)) \
             GROUP BY t1.CategoryId HAVING COUNT(t1.Id) > 0 ORDER BY t1.CategoryId ASC"
        );
    }

    #[test]
    fn test_render_paging_grouped_oracle_keeps_declared_joins() {
        let table = product();
        let mut set = ClauseSet::new()
            .with(Clause::GroupBy(vec!["t1.Id".into(), "pi.Url".into()]))
            .with(Clause::OrderBy(vec![SortField::new("t1.Name", SortDir::Desc)]))
            .with(Clause::Window(PageWindow::new(4, 2)));
        set.extend(table.joins().iter().cloned().map(Clause::Join));

        let query = Template::new(Oracle, &table).render_paging(&set);
        assert!(query.sql.starts_with(&format!(
            "{PRODUCT_SELECT} FROM Product t1 {PRODUCT_JOIN} INNER JOIN (\
             SELECT t_rows.*, ROWNUM row_num FROM (\
             SELECT t1.Id AS grp_1, pi.Url AS grp_2 FROM Product t1 {PRODUCT_JOIN} \
             GROUP BY t1.Id, pi.Url ORDER BY MAX(t1.Name) DESC, t1.Id ASC, pi.Url ASC\
             ) t_rows WHERE ROWNUM <= 6) t_keys ON "
        )));
        assert!(query.sql.contains("WHERE t_keys.row_num > 4 GROUP BY t1.Id, pi.Url"));
        assert!(query.sql.ends_with("ORDER BY t1.Name DESC, t1.Id ASC, pi.Url ASC"));
    }

    #[test]
    fn test_render_paging_right_join_anchors_on_master_rows() {
        let table = TableDescriptor::new("Product")
            .columns(&["t1.Id", "pi.Url"])
            .primary_keys(&["Id"])
            .right_join("ProductImage", "pi", "pi.ProductId = t1.Id");
        let mut set = ClauseSet::new().with(Clause::Window(PageWindow::new(0, 1)));
        set.extend(table.joins().iter().cloned().map(Clause::Join));

        let query = Template::new(MySql, &table).render_paging(&set);
        assert_eq!(
            query.sql,
            "SELECT t1.Id, pi.Url FROM Product t1 INNER JOIN (\
             SELECT t1.Id FROM Product t1 RIGHT JOIN ProductImage pi ON pi.ProductId = t1.Id \
             WHERE t1.Id IS NOT NULL GROUP BY t1.Id ORDER BY t1.Id ASC LIMIT 1 OFFSET 0\
             ) t_keys ON t1.Id = t_keys.Id LEFT JOIN ProductImage pi ON pi.ProductId = t1.Id \
             ORDER BY t1.Id ASC"
        );
        // The unwindowed queries keep the join as declared.
        assert!(Template::new(MySql, &table).render(&set).sql.contains("RIGHT JOIN"));
    }

    #[test]
    fn test_render_counting_composite_key_right_join() {
        let table = TableDescriptor::new("OrderLine")
            .primary_keys(&["OrderId", "LineNo"])
            .right_join("Shipment", "s", "s.OrderId = t1.OrderId");
        let mut set = ClauseSet::new();
        set.extend(table.joins().iter().cloned().map(Clause::Join));

        let query = Template::new(MySql, &table).render_counting(&set, &[]);
        assert_eq!(
            query.sql,
            "SELECT COUNT(1) FROM (SELECT DISTINCT t1.OrderId, t1.LineNo FROM OrderLine t1 \
             RIGHT JOIN Shipment s ON s.OrderId = t1.OrderId \
             WHERE t1.OrderId IS NOT NULL AND t1.LineNo IS NOT NULL) t_count"
        );
    }

    #[test]
    fn test_render_counting_single_key() {
        let table = product();
        let query = Template::new(MySql, &table).render_counting(&product_clauses(&table), &[]);
        assert_eq!(
            query.sql,
            format!(
                "SELECT COUNT(DISTINCT t1.Id) FROM Product t1 {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE CONCAT('%', ?, '%') AND t1.IsDeleted = 0"
            )
        );
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn test_render_counting_grouped() {
        let table = product();
        let grouped = vec!["t1.Id".to_string()];
        let query =
            Template::new(Oracle, &table).render_counting(&product_clauses(&table), &grouped);
        assert_eq!(
            query.sql,
            format!(
                "SELECT COUNT(1) FROM (SELECT 1 AS grp FROM Product t1 {PRODUCT_JOIN} \
                 WHERE t1.Name LIKE '%' || :1 || '%' AND t1.IsDeleted = 0 \
                 GROUP BY t1.Id) t_count"
            )
        );
    }

    #[test]
    fn test_render_counting_falls_back_to_group_by() {
        let table = product();
        let set = ClauseSet::new()
            .with(Clause::GroupBy(vec!["t1.Name".into()]))
            .with(Clause::Having(Predicate::Raw("COUNT(pi.Id) > 1".into())));
        let query = Template::new(MySql, &table).render_counting(&set, &[]);
        assert_eq!(
            query.sql,
            "SELECT COUNT(1) FROM (SELECT 1 AS grp FROM Product t1 \
             GROUP BY t1.Name HAVING COUNT(pi.Id) > 1) t_count"
        );
    }

    #[test]
    fn test_render_counting_composite_and_keyless() {
        let table = TableDescriptor::new("OrderLine").primary_keys(&["OrderId", "LineNo"]);
        let query = Template::new(MySql, &table).render_counting(&ClauseSet::new(), &[]);
        assert_eq!(
            query.sql,
            "SELECT COUNT(1) FROM (SELECT DISTINCT t1.OrderId, t1.LineNo FROM OrderLine t1) t_count"
        );

        let table = TableDescriptor::new("AuditLog");
        let query = Template::new(Oracle, &table).render_counting(&ClauseSet::new(), &[]);
        assert_eq!(query.sql, "SELECT COUNT(1) FROM AuditLog t1");
    }

    #[test]
    fn test_render_predicate_variants() {
        let any = Predicate::Any(vec![
            Predicate::Pattern {
                column: "t1.Name".into(),
                kind: PatternKind::Contains,
                value: "x".into(),
            },
            Predicate::Pattern {
                column: "t1.Sku".into(),
                kind: PatternKind::Contains,
                value: "x".into(),
            },
        ]);
        let (sql, params, next) = render_predicate(&Oracle, &any, 3);
        assert_eq!(sql, "(t1.Name LIKE '%' || :3 || '%' OR t1.Sku LIKE '%' || :4 || '%')");
        assert_eq!(params.len(), 2);
        assert_eq!(next, 5);

        let (sql, _, next) = render_predicate(&Oracle, &Predicate::eq("t1.Note", Value::Null), 1);
        assert_eq!(sql, "t1.Note IS NULL");
        assert_eq!(next, 1);

        let (sql, params, _) = render_predicate(&MySql, &Predicate::is_in("t1.Id", vec![]), 1);
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());

        let ne = Predicate::Compare {
            column: "t1.Status".into(),
            op: CompareOp::Ne,
            value: "x".into(),
        };
        assert_eq!(render_predicate(&MySql, &ne, 1).0, "t1.Status <> ?");

        let empty = Predicate::IsEmpty {
            column: "t1.Note".into(),
            negated: true,
        };
        assert_eq!(render_predicate(&Oracle, &empty, 1).0, "t1.Note IS NOT NULL");
        assert_eq!(render_predicate(&MySql, &empty, 1).0, "t1.Note <> ''");
    }
}
