//! Validation for trusted SQL fragments declared in table descriptors.
//!
//! Select-list items (`pi.Url AS ImageUrl`, `COUNT(pi.Id) AS ImageCount`),
//! join conditions and HAVING expressions come from descriptor code, not from
//! requests. They are still screened so a typo or a copied snippet cannot smuggle
//! a second statement or a subquery into every list endpoint.

/// Longest fragment accepted.
const MAX_EXPRESSION_LENGTH: usize = 1000;

/// Keywords that have no business inside a select item, join condition or
/// HAVING predicate.
const DANGEROUS_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "merge", "drop", "truncate", "alter", "create",
    "grant", "revoke", "exec", "execute", "call", "union", "into", "from", "where", "limit",
    "offset", "fetch", "rownum",
    // Timing and resource functions (MySQL / Oracle)
    "sleep", "benchmark", "waitfor",
    // File access
    "load_file", "outfile", "dumpfile",
];

/// Validate a trusted SQL fragment.
///
/// Rejects comments, statement terminators, quoted identifiers, hex escapes,
/// catalog access (`information_schema`, `sys.`, `dba_`, `all_`), Oracle
/// package calls (`dbms_`, `utl_`) and the keywords above as whole words.
///
/// # Examples
///
/// ```
/// use grid_sql::is_valid_sql_expression;
///
/// assert!(is_valid_sql_expression("pi.ProductId = t1.Id"));
/// assert!(is_valid_sql_expression("COUNT(pi.Id) AS ImageCount"));
/// assert!(is_valid_sql_expression("t1.UpdatedAt"));
///
/// assert!(!is_valid_sql_expression("1; DROP TABLE Product"));
/// assert!(!is_valid_sql_expression("t1.Id -- comment"));
/// assert!(!is_valid_sql_expression("(SELECT MAX(Id) FROM Product)"));
/// ```
#[must_use]
pub fn is_valid_sql_expression(s: &str) -> bool {
    if s.trim().is_empty() || s.len() > MAX_EXPRESSION_LENGTH {
        return false;
    }

    if s.contains("--") || s.contains("/*") || s.contains("*/") || s.contains('#') {
        return false;
    }

    if s.contains(';') || s.contains('`') || s.contains('"') {
        return false;
    }

    let lower = s.to_ascii_lowercase();

    if DANGEROUS_KEYWORDS
        .iter()
        .any(|keyword| contains_sql_keyword(&lower, keyword))
    {
        return false;
    }

    const CATALOG_PREFIXES: &[&str] = &["information_schema", "sys.", "dbms_", "utl_"];
    if CATALOG_PREFIXES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    if contains_prefixed_word(&lower, "dba_") || contains_prefixed_word(&lower, "all_") {
        return false;
    }

    if lower.contains("0x") || lower.contains("\\x") {
        return false;
    }

    true
}

/// Whether `keyword` appears in `haystack` as a whole word, so `UpdatedAt`
/// does not trip the `update` check.
fn contains_sql_keyword(haystack: &str, keyword: &str) -> bool {
    words(haystack).any(|word| word == keyword)
}

/// Whether any word in `haystack` starts with `prefix`.
fn contains_prefixed_word(haystack: &str, prefix: &str) -> bool {
    words(haystack).any(|word| word.starts_with(prefix))
}

fn words(haystack: &str) -> impl Iterator<Item = &str> {
    haystack
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Assert that a descriptor fragment is a valid SQL expression.
///
/// # Panics
///
/// Panics if the expression contains dangerous patterns.
#[inline]
pub fn assert_valid_sql_expression(s: &str, context: &str) {
    assert!(
        is_valid_sql_expression(s),
        "Invalid SQL expression for {context}: '{s}' contains dangerous patterns \
             (comments, semicolons, subqueries or catalog access)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fragments() {
        assert!(is_valid_sql_expression("t1.Id"));
        assert!(is_valid_sql_expression("pi.Url AS ImageUrl"));
        assert!(is_valid_sql_expression("pi.ProductId = t1.Id AND pi.IsDeleted = 0"));
        assert!(is_valid_sql_expression("COUNT(pi.Id) > 0"));
        assert!(is_valid_sql_expression("COALESCE(t1.Nickname, t1.Name) AS Display"));
        assert!(is_valid_sql_expression("t1.LastUpdated"));
        assert!(is_valid_sql_expression("t1.Selected"));
    }

    #[test]
    fn test_rejects_statement_tricks() {
        assert!(!is_valid_sql_expression(""));
        assert!(!is_valid_sql_expression("   "));
        assert!(!is_valid_sql_expression("t1.Id; DELETE FROM Product"));
        assert!(!is_valid_sql_expression("t1.Id /* x */"));
        assert!(!is_valid_sql_expression("t1.Id # x"));
        assert!(!is_valid_sql_expression("`Name`"));
        assert!(!is_valid_sql_expression("\"Name\""));
        assert!(!is_valid_sql_expression("t1.Id UNION ALL t2.Id"));
        assert!(!is_valid_sql_expression("t1.Id IN (SELECT Id FROM Voucher)"));
    }

    #[test]
    fn test_rejects_dialect_specific_abuse() {
        assert!(!is_valid_sql_expression("SLEEP(5)"));
        assert!(!is_valid_sql_expression("BENCHMARK(1000000, MD5(1))"));
        assert!(!is_valid_sql_expression("DBMS_PIPE.RECEIVE_MESSAGE('a', 10)"));
        assert!(!is_valid_sql_expression("UTL_HTTP.REQUEST('x')"));
        assert!(!is_valid_sql_expression("information_schema.tables"));
        assert!(!is_valid_sql_expression("sys.user$"));
        assert!(!is_valid_sql_expression("dba_users.username"));
        assert!(!is_valid_sql_expression("ROWNUM <= 10"));
        assert!(!is_valid_sql_expression("0x41"));
        assert!(!is_valid_sql_expression(&"a".repeat(1001)));
    }

    #[test]
    #[should_panic(expected = "Invalid SQL expression for join condition")]
    fn test_assert_panics() {
        assert_valid_sql_expression("1=1; DROP TABLE Product", "join condition");
    }
}
