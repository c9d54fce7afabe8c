//! INSERT, UPDATE and DELETE statement builders.
//!
//! Write statements address the bare table (no alias), so predicates passed to
//! these builders use unqualified column names.

mod delete;
mod insert;
mod update;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use update::UpdateBuilder;

use crate::dialect::Dialect;
use crate::template::{Predicate, render_predicate};
use crate::types::Value;

/// Render ` WHERE a AND b ...` for `filters`, continuing at `param_idx`.
fn push_where<D: Dialect>(
    dialect: &D,
    filters: &[Predicate],
    sql: &mut String,
    params: &mut Vec<Value>,
    mut param_idx: usize,
) {
    if filters.is_empty() {
        return;
    }
    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        let (condition, new_params, new_idx) = render_predicate(dialect, filter, param_idx);
        conditions.push(condition);
        params.extend(new_params);
        param_idx = new_idx;
    }
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
}
