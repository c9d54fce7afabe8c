//! Identifier and column-reference validation.
//!
//! Column and table names are the only caller-controlled text interpolated into
//! rendered SQL, so every one of them passes through here first.

/// Maximum identifier length. Oracle 11g caps identifiers at 30 bytes, which is
/// the tighter of the two supported dialects.
const MAX_IDENTIFIER_LENGTH: usize = 30;

/// Validate that a string is a safe, unquoted SQL identifier.
///
/// A valid identifier starts with an ASCII letter or underscore, continues with
/// ASCII letters, digits or underscores, and is 1-30 characters long.
///
/// # Examples
///
/// ```
/// use grid_sql::is_valid_sql_identifier;
///
/// assert!(is_valid_sql_identifier("Product"));
/// assert!(is_valid_sql_identifier("purchase_order"));
/// assert!(!is_valid_sql_identifier("t1.Id"));       // qualified, see is_valid_column_ref
/// assert!(!is_valid_sql_identifier("Name; DROP"));
/// ```
#[inline]
#[must_use]
pub fn is_valid_sql_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }

    let mut chars = s.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a column reference: `column` or `alias.column`.
///
/// # Examples
///
/// ```
/// use grid_sql::is_valid_column_ref;
///
/// assert!(is_valid_column_ref("Name"));
/// assert!(is_valid_column_ref("t1.Name"));
/// assert!(is_valid_column_ref("pi.ProductId"));
/// assert!(!is_valid_column_ref("a.b.c"));
/// assert!(!is_valid_column_ref("t1."));
/// ```
#[must_use]
pub fn is_valid_column_ref(s: &str) -> bool {
    match s.split_once('.') {
        Some((alias, column)) => is_valid_sql_identifier(alias) && is_valid_sql_identifier(column),
        None => is_valid_sql_identifier(s),
    }
}

/// Assert that a string is a valid SQL identifier.
///
/// # Panics
///
/// Panics with a descriptive error if the identifier is invalid. This is for
/// programmer errors (bad table/column names in descriptor code), not for
/// request input, which goes through the composer's validation errors instead.
#[inline]
pub fn assert_valid_sql_identifier(s: &str, context: &str) {
    assert!(
        is_valid_sql_identifier(s),
        "Invalid SQL {context} name '{s}': must start with letter/underscore, \
             contain only ASCII alphanumeric/underscore, and be 1-30 chars"
    );
}

/// Assert that a string is a valid column reference.
///
/// # Panics
///
/// Panics if the reference is not `column` or `alias.column`.
#[inline]
pub fn assert_valid_column_ref(s: &str, context: &str) {
    assert!(
        is_valid_column_ref(s),
        "Invalid {context} column reference '{s}': expected `column` or `alias.column`"
    );
}
