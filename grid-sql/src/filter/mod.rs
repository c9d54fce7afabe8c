//! Filter input: the operator vocabulary, the text mini-language, and the
//! composer that turns a request into clause nodes.

mod compose;
mod operator;
mod parse;

pub use compose::{Composer, ValidationError};
pub use operator::FilterOperator;
pub use parse::{FilterClause, Logic, format_filters, parse_filters};
