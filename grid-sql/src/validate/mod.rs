//! Validation for the SQL vocabulary that is interpolated rather than bound.
//!
//! Values never pass through here: they are always bound parameters. What is
//! checked is the text that has to be spliced into SQL:
//! - table names, aliases and column references (identifiers)
//! - trusted descriptor fragments such as join conditions (expressions)

mod column;
mod expression;

pub use column::{
    assert_valid_column_ref, assert_valid_sql_identifier, is_valid_column_ref,
    is_valid_sql_identifier,
};
pub use expression::{assert_valid_sql_expression, is_valid_sql_expression};
