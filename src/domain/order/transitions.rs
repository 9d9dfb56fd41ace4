use super::errors::OrderError;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Status Transition Table
// ============================================================================
//
//   CREATED      -> CONFIRMED | CANCELED
//   CONFIRMED    -> IN_PROGRESS | CANCELED
//   IN_PROGRESS  -> COMPLETED
//   COMPLETED    (terminal)
//   CANCELED     (terminal)
//
// Pure lookup: nothing here touches storage.
// ============================================================================

/// Statuses reachable in one step from `from`
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    match from {
        OrderStatus::Created => &[OrderStatus::Confirmed, OrderStatus::Canceled],
        OrderStatus::Confirmed => &[OrderStatus::InProgress, OrderStatus::Canceled],
        OrderStatus::InProgress => &[OrderStatus::Completed],
        OrderStatus::Completed | OrderStatus::Canceled => &[],
    }
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Check a requested transition for the given order.
///
/// Self-transitions are never in the table and therefore always rejected.
pub fn validate(current: OrderStatus, requested: OrderStatus, order_id: OrderId) -> Result<(), OrderError> {
    if is_allowed(current, requested) {
        Ok(())
    } else {
        Err(OrderError::IllegalTransition {
            from: current,
            to: requested,
            order_id,
        })
    }
}
