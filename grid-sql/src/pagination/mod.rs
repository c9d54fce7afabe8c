//! Request and envelope types for offset-paged list endpoints.
//!
//! A [`PageRequest`] carries filters, sort, window and projection; a
//! [`PageEnvelope`] carries one page of rows plus the counts and position flags
//! a grid needs to render its pager.

mod envelope;
mod request;

pub use envelope::PageEnvelope;
pub use request::{FilterInput, PageRequest, RequestKind};
