use chrono::{DateTime, Utc};

use super::commands::{CreateOrder, UpdateOrder};
use super::errors::OrderError;
use super::transitions;
use super::value_objects::{OrderId, OrderStatus, OwnerId, ServiceId};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone)]
pub struct Order {
    // Identity
    pub id: OrderId,
    pub version: i64,

    // Current State
    pub owner_id: OwnerId,
    pub status: OrderStatus,
    pub service_id: ServiceId,
    pub comment: Option<String>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

/// An order that has not been assigned an id yet
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner_id: OwnerId,
    pub service_id: ServiceId,
    pub comment: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn from_command(command: CreateOrder, now: DateTime<Utc>) -> Self {
        Self {
            owner_id: command.owner_id,
            service_id: command.service_id,
            comment: command.comment,
            status: OrderStatus::Created,
            created_at: now,
        }
    }

    /// Materialize with a storage-assigned id
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            version: 1,
            owner_id: self.owner_id,
            status: self.status,
            service_id: self.service_id,
            comment: self.comment,
            created_at: self.created_at,
            last_modified_at: self.created_at,
        }
    }
}

impl Order {
    /// Identity comparison. Two values with the same id are the same order
    /// regardless of the rest of their fields.
    #[cfg(test)]
    pub fn same_entity(&self, other: &Order) -> bool {
        self.id == other.id
    }

    /// Apply a partial update in place.
    ///
    /// Validation happens before any field is touched, so a rejected status
    /// change never leaves a co-requested comment applied. Returns `false`
    /// when the update carried nothing to change.
    pub fn apply_update(&mut self, update: &UpdateOrder, now: DateTime<Utc>) -> Result<bool, OrderError> {
        if update.is_empty() {
            return Ok(false);
        }

        match update.status {
            Some(target) => transitions::validate(self.status, target, self.id)?,
            None if self.status.is_terminal() => {
                return Err(OrderError::OrderFinalized {
                    order_id: self.id,
                    status: self.status,
                })
            }
            None => {}
        }

        if let Some(target) = update.status {
            self.status = target;
        }
        if let Some(comment) = &update.comment {
            self.comment = Some(comment.clone());
        }
        self.touch(now);

        Ok(true)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        // created_at <= last_modified_at even if the clock steps backwards
        self.last_modified_at = now.max(self.created_at).max(self.last_modified_at);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
