use super::value_objects::{OrderStatus, OwnerId, ServiceId};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub owner_id: OwnerId,
    pub service_id: ServiceId,
    pub comment: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub status: Option<OrderStatus>,
    pub comment: Option<String>,
}

impl UpdateOrder {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            comment: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.comment.is_none()
    }
}

/// Named transition actions exposed as `POST /orders/{id}/<action>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Confirm,
    Cancel,
    StartProgress,
    Complete,
}

impl TransitionAction {
    pub const ALL: [TransitionAction; 4] = [
        TransitionAction::Confirm,
        TransitionAction::Cancel,
        TransitionAction::StartProgress,
        TransitionAction::Complete,
    ];

    pub fn target_status(&self) -> OrderStatus {
        match self {
            TransitionAction::Confirm => OrderStatus::Confirmed,
            TransitionAction::Cancel => OrderStatus::Canceled,
            TransitionAction::StartProgress => OrderStatus::InProgress,
            TransitionAction::Complete => OrderStatus::Completed,
        }
    }

    /// Path segment and link relation name
    pub fn rel(&self) -> &'static str {
        match self {
            TransitionAction::Confirm => "confirm",
            TransitionAction::Cancel => "cancel",
            TransitionAction::StartProgress => "in-progress",
            TransitionAction::Complete => "complete",
        }
    }

    pub fn for_target(status: OrderStatus) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.target_status() == status)
    }
}
