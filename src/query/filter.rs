use sqlx::{Postgres, QueryBuilder};

use crate::domain::order::{Order, OrderId, OrderStatus, OwnerId, ServiceId};

// ============================================================================
// Order Filter - conjunction of optional predicates
// ============================================================================
//
// Each supplied filter value becomes one predicate; absent values add
// nothing. A filter matches an order when every predicate holds. The same
// predicate list is evaluated in memory (`matches`) or rendered into a
// Postgres WHERE clause (`push_where`).
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OrderPredicate {
    OwnerIs(OwnerId),
    IdIs(OrderId),
    ServiceIs(ServiceId),
    StatusIs(OrderStatus),
}

impl OrderPredicate {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderPredicate::OwnerIs(owner_id) => order.owner_id == *owner_id,
            OrderPredicate::IdIs(id) => order.id == *id,
            OrderPredicate::ServiceIs(service_id) => order.service_id == *service_id,
            OrderPredicate::StatusIs(status) => order.status == *status,
        }
    }

    fn push_sql(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            OrderPredicate::OwnerIs(owner_id) => {
                query.push("owner_id = ").push_bind(*owner_id);
            }
            OrderPredicate::IdIs(id) => {
                query.push("id = ").push_bind(*id);
            }
            OrderPredicate::ServiceIs(service_id) => {
                query.push("service_id = ").push_bind(*service_id);
            }
            OrderPredicate::StatusIs(status) => {
                query.push("status = ").push_bind(status.as_str());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    predicates: Vec<OrderPredicate>,
}

impl OrderFilter {
    /// Matches every order
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter from the optional owner and order ids
    pub fn build(owner_id: Option<OwnerId>, order_id: Option<OrderId>) -> Self {
        Self::all().owner(owner_id).order(order_id)
    }

    pub fn owner(self, owner_id: Option<OwnerId>) -> Self {
        self.with(owner_id.map(OrderPredicate::OwnerIs))
    }

    pub fn order(self, order_id: Option<OrderId>) -> Self {
        self.with(order_id.map(OrderPredicate::IdIs))
    }

    pub fn service(self, service_id: Option<ServiceId>) -> Self {
        self.with(service_id.map(OrderPredicate::ServiceIs))
    }

    pub fn status(self, status: Option<OrderStatus>) -> Self {
        self.with(status.map(OrderPredicate::StatusIs))
    }

    fn with(mut self, predicate: Option<OrderPredicate>) -> Self {
        if let Some(predicate) = predicate {
            self.predicates.push(predicate);
        }
        self
    }

    pub fn predicates(&self) -> &[OrderPredicate] {
        &self.predicates
    }

    pub fn is_unrestricted(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(order))
    }

    /// Append ` WHERE p1 AND p2 ...`; appends nothing for an unrestricted filter
    pub fn push_where(&self, query: &mut QueryBuilder<'_, Postgres>) {
        for (index, predicate) in self.predicates.iter().enumerate() {
            query.push(if index == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(query);
        }
    }
}
