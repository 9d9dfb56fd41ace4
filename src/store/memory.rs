//! In-memory implementation of `OrderRepository`.
//!
//! All orders are lost on restart. Used by tests and by the
//! `storage.backend = "memory"` configuration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{OrderRepository, RepositoryError, UpdateOutcome};
use crate::domain::order::{NewOrder, Order, OrderId};
use crate::query::{OrderFilter, Page, PageRequest};

pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
    next_id: AtomicI64,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = order.into_order(id);
        self.orders.write().await.insert(id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<UpdateOutcome, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(stored) = orders.get_mut(&order.id) else {
            return Ok(UpdateOutcome::Missing);
        };
        if stored.version != expected_version {
            return Ok(UpdateOutcome::VersionMismatch);
        }

        // id, owner, service and creation time are immutable
        stored.status = order.status;
        stored.comment = order.comment.clone();
        stored.last_modified_at = order.last_modified_at;
        stored.version = expected_version + 1;

        Ok(UpdateOutcome::Updated(stored.clone()))
    }

    async fn find_page(&self, filter: &OrderFilter, page: &PageRequest) -> Result<Page<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&Order> = orders.values().filter(|order| filter.matches(order)).collect();
        matching.sort_by(|a, b| page.sort.compare(a, b));

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CreateOrder, OrderStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn new_order(owner_id: Uuid) -> NewOrder {
        NewOrder::from_command(
            CreateOrder {
                owner_id,
                service_id: 1,
                comment: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryOrderRepository::new();
        let a = repo.insert(new_order(Uuid::new_v4())).await.unwrap();
        let b = repo.insert(new_order(Uuid::new_v4())).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.find_by_id(2).await.unwrap().unwrap().owner_id, b.owner_id);
        assert!(repo.find_by_id(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_is_version_checked() {
        let repo = InMemoryOrderRepository::new();
        let mut order = repo.insert(new_order(Uuid::new_v4())).await.unwrap();
        order.status = OrderStatus::Confirmed;

        let updated = match repo.update(&order, 1).await.unwrap() {
            UpdateOutcome::Updated(order) => order,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(updated.version, 2);

        // A second writer still holding version 1 loses
        order.status = OrderStatus::Canceled;
        assert!(matches!(repo.update(&order, 1).await.unwrap(), UpdateOutcome::VersionMismatch));
        let stored = repo.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);

        order.id = 99;
        assert!(matches!(repo.update(&order, 1).await.unwrap(), UpdateOutcome::Missing));
    }

    #[tokio::test]
    async fn test_find_page_filters_and_pages() {
        let repo = InMemoryOrderRepository::new();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        for owner in [u1, u1, u2, u1] {
            repo.insert(new_order(owner)).await.unwrap();
        }

        let page = repo
            .find_page(&OrderFilter::build(Some(u1), None), &PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2]);

        let page = repo
            .find_page(&OrderFilter::build(Some(u1), None), &PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.content.iter().map(|o| o.id).collect::<Vec<_>>(), vec![4]);
    }
}
