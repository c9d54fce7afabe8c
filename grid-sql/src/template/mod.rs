//! Dialect templates: clause nodes in, plain/paging/counting SQL out.

mod clause;
mod render;

pub use clause::{Clause, ClauseSet, CompareOp, PageWindow, PatternKind, Predicate};
pub(crate) use render::render_predicate;
pub use render::Template;
