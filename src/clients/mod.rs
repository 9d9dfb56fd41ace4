// ============================================================================
// Collaborator Clients
// ============================================================================
//
// HTTP clients for the two services an order depends on:
// - catalog:  does the referenced service exist?
// - feedback: newest customer feedback for an order
//
// Each client sits behind a trait so the lifecycle service can be tested
// with in-memory fakes.
//
// ============================================================================

mod error;
mod http;

pub mod catalog;
pub mod feedback;

pub use catalog::{CatalogClient, HttpCatalogClient};
pub use error::ClientError;
pub use feedback::{FeedbackClient, FeedbackQuery, FeedbackView, HttpFeedbackClient};
