// ============================================================================
// Order Query Composition
// ============================================================================
//
// - filter: optional predicates combined with AND
// - page:   page request, sort order and the result page envelope
//
// ============================================================================

pub mod filter;
pub mod page;

pub use filter::OrderFilter;
pub use page::{Page, PageRequest, PageRequestError, Sort};
