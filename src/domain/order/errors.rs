use super::value_objects::{OrderId, OrderStatus, ServiceId};
use crate::clients::ClientError;
use crate::store::RepositoryError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("No such order with id: {0}")]
    NoSuchOrder(OrderId),

    #[error("No such service with id: {0}")]
    NoSuchService(ServiceId),

    #[error("No such order status with name: {0}")]
    NoSuchStatus(String),

    #[error("Illegal order status! From {from} to {to} in order with id: {order_id}")]
    IllegalTransition {
        from: OrderStatus,
        to: OrderStatus,
        order_id: OrderId,
    },

    #[error("Order {order_id} is {status} and can no longer be modified")]
    OrderFinalized { order_id: OrderId, status: OrderStatus },

    #[error("Order {order_id} was modified concurrently (expected version {expected_version})")]
    ConcurrencyConflict { order_id: OrderId, expected_version: i64 },

    #[error("Collaborator call failed: {0}")]
    Collaborator(#[from] ClientError),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl OrderError {
    /// Whether resubmitting the same request can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            OrderError::ConcurrencyConflict { .. }
            | OrderError::Collaborator(_)
            | OrderError::Storage(_) => true,
            _ => false,
        }
    }
}
