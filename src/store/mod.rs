// ============================================================================
// Order Persistence
// ============================================================================
//
// `OrderRepository` abstracts the relational store. Implementations:
// - postgres: sqlx / PgPool, conditional UPDATE keyed on version
// - memory:   HashMap behind a RwLock, same compare-and-swap semantics
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::InMemoryOrderRepository;
pub use postgres::PgOrderRepository;

use async_trait::async_trait;

use crate::domain::order::{NewOrder, Order, OrderId};
use crate::query::{OrderFilter, Page, PageRequest};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupted order row {id}: {reason}")]
    CorruptedRow { id: OrderId, reason: String },
}

/// Outcome of a conditional write
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Row written; carries the stored state with the bumped version
    Updated(Order),
    /// The stored version no longer matches the one the caller read
    VersionMismatch,
    /// No row with that id
    Missing,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order; the store assigns the id.
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Write `order` only if the stored version equals `expected_version`.
    async fn update(&self, order: &Order, expected_version: i64) -> Result<UpdateOutcome, RepositoryError>;

    /// Filtered, sorted page plus total match count
    async fn find_page(&self, filter: &OrderFilter, page: &PageRequest) -> Result<Page<Order>, RepositoryError>;
}
