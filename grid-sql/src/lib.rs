// =============================================================================
// CRATE-LEVEL QUALITY LINTS
// =============================================================================
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
// =============================================================================
// CLIPPY CONFIGURATION
// =============================================================================
#![allow(clippy::doc_markdown)] // SQL keywords in docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)] // Descriptor builders assert on identifiers
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)] // Builder pattern methods return Self
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::format_push_string)] // String building style preference
#![allow(clippy::cast_possible_truncation)] // Window bounds are u32/u64
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

//! # grid-sql - list, count and page SQL for grid requests
//!
//! Turns a grid request (filters, keywords, ordering, a skip/take window) and
//! a table descriptor into SQL for MySQL-like or Oracle 11g-like databases.
//!
//! Paging is fan-out safe: when the master table carries one-to-many joins,
//! the window is applied to distinct primary keys in an inner query and the
//! joins are re-applied outside it, so a page of N masters is N masters no
//! matter how many child rows each has.
//!
//! ## Quick Start
//!
//! ```
//! # use grid_sql::prelude::*;
//! let table = TableDescriptor::new("Product")
//!     .columns(&["t1.Id", "t1.Name", "pi.Url"])
//!     .primary_keys(&["Id"])
//!     .left_join("ProductImage", "pi", "pi.ProductId = t1.Id")
//!     .soft_delete("IsDeleted");
//!
//! let request = PageRequest::new()
//!     .with_filters("Name::bike::contains")
//!     .with_window(0, 10);
//!
//! let clauses = Composer::new(&table)
//!     .compose(&request, Some(PageWindow::new(0, 10)))
//!     .unwrap();
//! let template = Template::new(MySql, &table);
//!
//! let page = template.render_paging(&clauses);
//! assert!(page.sql.contains("LIMIT 10 OFFSET 0) t_keys ON t1.Id = t_keys.Id"));
//!
//! let count = template.render_counting(&clauses, &[]);
//! assert!(count.sql.starts_with("SELECT COUNT(DISTINCT t1.Id) FROM Product t1"));
//! ```
//!
//! ## Filter Language
//!
//! Filters arrive as `field::value::operator` segments joined by `|`:
//!
//! ```
//! # use grid_sql::prelude::*;
//! let clauses = parse_filters("Name::bike::contains|Price::100::lte|Note::::isnull");
//! assert_eq!(clauses.len(), 3);
//! assert_eq!(clauses[2].value, "");
//! ```
//!
//! | Operator | SQL |
//! |----------|-----|
//! | `eq` / `neq` | `=` / `<>` |
//! | `lt` / `lte` / `gt` / `gte` | `<` / `<=` / `>` / `>=` |
//! | `startswith` / `endswith` / `contains` / `doesnotcontain` | `LIKE` with `%` joined in SQL |
//! | `isnull` / `isnotnull` | `IS NULL` / `IS NOT NULL` |
//! | `isempty` / `isnotempty` | empty string (and `NULL` on Oracle) |
//!
//! ## Execution
//!
//! Rendering is pure. Running the queries goes through the [`SqlExecutor`]
//! trait; [`PagingCoordinator`] serves list requests and [`Repository`]
//! adds get/create/update/delete with soft delete and all-or-nothing bulk
//! delete. A `SQLite` executor ships behind the default `sqlite` feature.

mod builder;
mod config;
mod dialect;
mod exec;
mod filter;
mod pager;
mod pagination;
mod repository;
mod table;
mod template;
mod types;
mod validate;

pub use builder::{DeleteBuilder, InsertBuilder, UpdateBuilder};
pub use config::{ConfigError, EngineConfig};
pub use dialect::{Dialect, MySql, Oracle, SqlDialect, WindowStrategy};
#[cfg(feature = "sqlite")]
pub use exec::SqliteExecutor;
pub use exec::{ExecError, FromRow, Row, SqlExecutor};
pub use filter::{
    Composer, FilterClause, FilterOperator, Logic, ValidationError, format_filters, parse_filters,
};
pub use pager::{PagePlan, PagingCoordinator, PagingError};
pub use pagination::{FilterInput, PageEnvelope, PageRequest, RequestKind};
pub use repository::{Entity, NOT_FOUND, Repository, RepositoryError};
pub use table::{Join, JoinError, JoinKind, MASTER_ALIAS, TableDescriptor};
pub use template::{Clause, ClauseSet, CompareOp, PageWindow, PatternKind, Predicate, Template};
pub use types::{QueryResult, SortDir, SortField, Value};
pub use validate::{
    assert_valid_column_ref, assert_valid_sql_expression, assert_valid_sql_identifier,
    is_valid_column_ref, is_valid_sql_expression, is_valid_sql_identifier,
};

/// Prelude module for convenient imports.
///
/// ```
/// use grid_sql::prelude::*;
/// let table = TableDescriptor::new("Tag").primary_keys(&["Id"]);
/// let sql = Template::new(Oracle, &table).render(&ClauseSet::new()).sql;
/// assert_eq!(sql, "SELECT t1.* FROM Tag t1");
/// ```
pub mod prelude {
    #[cfg(feature = "sqlite")]
    pub use crate::SqliteExecutor;
    pub use crate::{
        Clause, ClauseSet, Composer, DeleteBuilder, Dialect, EngineConfig, Entity, ExecError,
        FilterClause, FilterInput, FilterOperator, FromRow, InsertBuilder, Join, JoinKind, MySql,
        Oracle, PageEnvelope, PageRequest, PageWindow, PagingCoordinator, Predicate, QueryResult,
        Repository, RepositoryError, Row, SortDir, SortField, SqlDialect, SqlExecutor,
        TableDescriptor, Template, UpdateBuilder, Value, format_filters, parse_filters,
    };
}
