use chrono::Utc;
use std::sync::Arc;

use crate::clients::CatalogClient;
use crate::domain::order::{
    CreateOrder, NewOrder, Order, OrderError, OrderId, OrderStatus, OwnerId, UpdateOrder,
};
use crate::enrichment::{FeedbackEnricher, OrderView};
use crate::metrics::Metrics;
use crate::query::{OrderFilter, Page, PageRequest};
use crate::store::{OrderRepository, UpdateOutcome};

// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orchestrates: catalog check → repository → feedback enrichment
//
// Writes are conditional on the version that was read, so a concurrent
// modification surfaces as ConcurrencyConflict instead of a lost update.
//
// ============================================================================

pub struct OrderLifecycleService {
    repository: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogClient>,
    enricher: FeedbackEnricher,
    metrics: Arc<Metrics>,
}

impl OrderLifecycleService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogClient>,
        enricher: FeedbackEnricher,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            catalog,
            enricher,
            metrics,
        }
    }

    /// Create an order for an existing catalog service.
    ///
    /// Nothing is persisted when the service is unknown or the catalog
    /// cannot be reached.
    pub async fn create_order(&self, command: CreateOrder) -> Result<OrderView, OrderError> {
        let service_id = command.service_id;

        if self.catalog.get_service_by_id(service_id).await?.is_none() {
            tracing::warn!(service_id, owner_id = %command.owner_id, "Order references unknown service");
            return Err(OrderError::NoSuchService(service_id));
        }

        let order = self
            .repository
            .insert(NewOrder::from_command(command, Utc::now()))
            .await?;
        self.metrics.record_order_created();

        tracing::info!(
            order_id = order.id,
            owner_id = %order.owner_id,
            service_id,
            "✅ Order created"
        );

        // A brand-new order has no feedback yet
        Ok(OrderView::new(order, None))
    }

    pub async fn get_order(&self, id: OrderId) -> Result<OrderView, OrderError> {
        let order = self.load(id).await?;
        Ok(self.enricher.enrich(order).await?)
    }

    /// Apply a partial update. A requested status is validated before
    /// anything else is applied; an empty update returns the current view.
    ///
    /// Feedback is fetched before the write, so a collaborator failure
    /// leaves the stored order untouched and the request can be retried.
    pub async fn update_order(&self, id: OrderId, update: UpdateOrder) -> Result<OrderView, OrderError> {
        let mut order = self.load(id).await?;
        let expected_version = order.version;
        let from = order.status;

        let changed = order.apply_update(&update, Utc::now()).inspect_err(|e| {
            if let OrderError::IllegalTransition { from, to, .. } = e {
                self.metrics.record_transition_rejected(from.as_str(), to.as_str());
            }
            tracing::warn!(order_id = id, error = %e, "Order update rejected");
        })?;

        if !changed {
            tracing::debug!(order_id = id, "Empty update, nothing to write");
            return Ok(self.enricher.enrich(order).await?);
        }

        let feedback = self.enricher.latest(id).await?;
        let updated = self.write(order, expected_version).await?;

        if updated.status != from {
            self.metrics.record_transition(from.as_str(), updated.status.as_str());
            tracing::info!(
                order_id = id,
                from = %from,
                to = %updated.status,
                version = updated.version,
                "Order status changed"
            );
        } else {
            tracing::info!(order_id = id, version = updated.version, "Order comment updated");
        }

        Ok(OrderView::new(updated, feedback))
    }

    pub async fn change_status(&self, id: OrderId, target: OrderStatus) -> Result<OrderView, OrderError> {
        self.update_order(id, UpdateOrder::status(target)).await
    }

    /// All orders, or only `owner_id`'s, one page at a time
    pub async fn list_orders(
        &self,
        page: &PageRequest,
        owner_id: Option<OwnerId>,
    ) -> Result<Page<OrderView>, OrderError> {
        self.list_orders_matching(page, &OrderFilter::build(owner_id, None))
            .await
    }

    pub async fn list_orders_matching(
        &self,
        page: &PageRequest,
        filter: &OrderFilter,
    ) -> Result<Page<OrderView>, OrderError> {
        let orders = self.repository.find_page(filter, page).await?;

        tracing::debug!(
            predicates = filter.predicates().len(),
            unrestricted = filter.is_unrestricted(),
            page = page.page_number,
            size = page.page_size,
            returned = orders.number_of_elements(),
            total = orders.total_elements,
            "Listing orders"
        );

        Ok(self.enricher.enrich_all(orders).await?)
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(OrderError::NoSuchOrder(id))
    }

    async fn write(&self, order: Order, expected_version: i64) -> Result<Order, OrderError> {
        let id = order.id;
        match self.repository.update(&order, expected_version).await? {
            UpdateOutcome::Updated(stored) => Ok(stored),
            UpdateOutcome::VersionMismatch => {
                self.metrics.record_conflict();
                tracing::warn!(order_id = id, expected_version, "Concurrent modification detected");
                Err(OrderError::ConcurrencyConflict {
                    order_id: id,
                    expected_version,
                })
            }
            UpdateOutcome::Missing => Err(OrderError::NoSuchOrder(id)),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clients::catalog::ServiceSummary;
    use crate::clients::{ClientError, FeedbackView};
    use crate::domain::order::ServiceId;
    use crate::enrichment::FeedbackLookup;
    use crate::store::{InMemoryOrderRepository, RepositoryError};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    pub(crate) struct FakeCatalog {
        known: HashSet<ServiceId>,
        pub(crate) down: AtomicBool,
    }

    impl FakeCatalog {
        pub(crate) fn with_services(ids: &[ServiceId]) -> Self {
            Self {
                known: ids.iter().copied().collect(),
                down: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn get_service_by_id(&self, id: ServiceId) -> Result<Option<ServiceSummary>, ClientError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ClientError::api_error(503, "catalog unavailable"));
            }
            Ok(self.known.contains(&id).then(|| ServiceSummary {
                id,
                category_id: None,
                owner_id: None,
                title: format!("service {id}"),
                description: None,
                image_urls: Vec::new(),
                price: None,
                priority: None,
                created_at: None,
                last_modified_at: None,
            }))
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeFeedback {
        pub(crate) ratings: Mutex<HashMap<OrderId, i32>>,
        pub(crate) down: AtomicBool,
    }

    #[async_trait]
    impl FeedbackLookup for FakeFeedback {
        async fn latest_for_order(&self, order_id: OrderId) -> Result<Option<FeedbackView>, ClientError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ClientError::Timeout {
                    collaborator: "feedback".to_string(),
                });
            }
            let rating = self.ratings.lock().unwrap().get(&order_id).copied();
            Ok(rating.map(|rating| {
                let now = Utc::now();
                FeedbackView {
                    id: 1,
                    order_id,
                    owner_id: Uuid::new_v4(),
                    rating,
                    comment: None,
                    created_at: now,
                    last_modified_at: now,
                }
            }))
        }
    }

    /// Another writer slips in between our read and our write
    struct RacingRepository {
        inner: InMemoryOrderRepository,
    }

    #[async_trait]
    impl OrderRepository for RacingRepository {
        async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
            self.inner.insert(order).await
        }

        async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn update(&self, order: &Order, expected_version: i64) -> Result<UpdateOutcome, RepositoryError> {
            if let Some(mut current) = self.inner.find_by_id(order.id).await? {
                current.comment = Some("written by someone else".to_string());
                let version = current.version;
                self.inner.update(&current, version).await?;
            }
            self.inner.update(order, expected_version).await
        }

        async fn find_page(&self, filter: &OrderFilter, page: &PageRequest) -> Result<Page<Order>, RepositoryError> {
            self.inner.find_page(filter, page).await
        }
    }

    pub(crate) struct Fixture {
        pub(crate) service: OrderLifecycleService,
        pub(crate) repository: Arc<InMemoryOrderRepository>,
        pub(crate) catalog: Arc<FakeCatalog>,
        pub(crate) feedback: Arc<FakeFeedback>,
        pub(crate) metrics: Arc<Metrics>,
    }

    pub(crate) fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let catalog = Arc::new(FakeCatalog::with_services(&[1, 2]));
        let feedback = Arc::new(FakeFeedback::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = OrderLifecycleService::new(
            repository.clone(),
            catalog.clone(),
            FeedbackEnricher::new(feedback.clone(), 4),
            metrics.clone(),
        );
        Fixture {
            service,
            repository,
            catalog,
            feedback,
            metrics,
        }
    }

    fn create(owner_id: OwnerId, service_id: ServiceId) -> CreateOrder {
        CreateOrder {
            owner_id,
            service_id,
            comment: Some("please be quick".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_order_starts_created() {
        let fx = fixture();
        let owner = Uuid::new_v4();

        let view = fx.service.create_order(create(owner, 1)).await.unwrap();

        assert_eq!(view.status, OrderStatus::Created);
        assert_eq!(view.owner_id, owner);
        assert_eq!(view.created_at, view.last_modified_at);
        assert!(view.feedback.is_none());
        assert!(view.link("confirm").is_some());
        assert_eq!(fx.metrics.orders_created.get(), 1);

        let stored = fx.repository.find_by_id(view.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_unknown_service_persists_nothing() {
        let fx = fixture();

        let err = fx.service.create_order(create(Uuid::new_v4(), 99)).await.unwrap_err();

        assert!(matches!(err, OrderError::NoSuchService(99)));
        assert_eq!(fx.repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_persists_nothing() {
        let fx = fixture();
        fx.catalog.down.store(true, Ordering::SeqCst);

        let err = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap_err();

        assert!(matches!(err, OrderError::Collaborator(_)));
        assert!(err.is_retryable());
        assert_eq!(fx.repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let fx = fixture();
        let err = fx.service.get_order(404).await.unwrap_err();
        assert!(matches!(err, OrderError::NoSuchOrder(404)));
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;

        let view = fx.service.change_status(id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(view.status, OrderStatus::Confirmed);

        let err = fx.service.change_status(id, OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition {
                from: OrderStatus::Confirmed,
                to: OrderStatus::Confirmed,
                ..
            }
        ));

        let view = fx.service.change_status(id, OrderStatus::InProgress).await.unwrap();
        assert_eq!(view.status, OrderStatus::InProgress);

        let err = fx.service.change_status(id, OrderStatus::Canceled).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition {
                from: OrderStatus::InProgress,
                to: OrderStatus::Canceled,
                ..
            }
        ));

        let view = fx.service.change_status(id, OrderStatus::Completed).await.unwrap();
        assert_eq!(view.status, OrderStatus::Completed);
        assert_eq!(view.links.len(), 1);

        let err = fx.service.change_status(id, OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Confirmed,
                ..
            }
        ));

        let stored = fx.repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.version, 4);
        assert!(stored.created_at <= stored.last_modified_at);
        assert_eq!(fx.metrics.order_transition_rejections.with_label_values(&["COMPLETED", "CONFIRMED"]).get(), 1);
    }

    #[tokio::test]
    async fn test_illegal_status_leaves_comment_untouched() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;

        let update = UpdateOrder {
            status: Some(OrderStatus::Completed),
            comment: Some("sneaky".to_string()),
        };
        let err = fx.service.update_order(id, update).await.unwrap_err();
        assert!(matches!(err, OrderError::IllegalTransition { .. }));

        let stored = fx.repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.comment.as_deref(), Some("please be quick"));
        assert_eq!(stored.status, OrderStatus::Created);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_comment_update_and_empty_update() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;

        let update = UpdateOrder {
            status: None,
            comment: Some("ring the bell".to_string()),
        };
        let view = fx.service.update_order(id, update).await.unwrap();
        assert_eq!(view.comment.as_deref(), Some("ring the bell"));
        assert_eq!(view.status, OrderStatus::Created);

        fx.service.update_order(id, UpdateOrder::default()).await.unwrap();
        let stored = fx.repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_comment_on_finished_order_rejected() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;
        fx.service.change_status(id, OrderStatus::Canceled).await.unwrap();

        let update = UpdateOrder {
            status: None,
            comment: Some("too late".to_string()),
        };
        let err = fx.service.update_order(id, update).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderFinalized { .. }));
    }

    #[tokio::test]
    async fn test_lost_race_is_a_conflict() {
        let repository = Arc::new(RacingRepository {
            inner: InMemoryOrderRepository::new(),
        });
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = OrderLifecycleService::new(
            repository.clone(),
            Arc::new(FakeCatalog::with_services(&[1])),
            FeedbackEnricher::new(Arc::new(FakeFeedback::default()), 2),
            metrics.clone(),
        );
        let id = service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;

        let err = service.change_status(id, OrderStatus::Confirmed).await.unwrap_err();

        assert!(matches!(
            err,
            OrderError::ConcurrencyConflict {
                expected_version: 1,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(metrics.order_conflicts.get(), 1);
        let stored = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_feedback_outage_during_transition_persists_nothing() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;

        fx.feedback.down.store(true, Ordering::SeqCst);
        let err = fx.service.change_status(id, OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, OrderError::Collaborator(_)));
        assert!(err.is_retryable());

        let err = fx
            .service
            .update_order(id, UpdateOrder {
                status: None,
                comment: Some("ring twice".to_string()),
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let stored = fx.repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
        assert_eq!(stored.version, 1);
        assert_eq!(stored.comment.as_deref(), Some("please be quick"));
        assert_eq!(fx.metrics.order_transitions.with_label_values(&["CREATED", "CONFIRMED"]).get(), 0);

        // Once feedback recovers the same request succeeds
        fx.feedback.down.store(false, Ordering::SeqCst);
        fx.feedback.ratings.lock().unwrap().insert(id, 4);
        let view = fx.service.change_status(id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(view.status, OrderStatus::Confirmed);
        assert_eq!(view.feedback.unwrap().rating, 4);
        assert_eq!(fx.repository.find_by_id(id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_get_order_attaches_feedback() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;
        fx.feedback.ratings.lock().unwrap().insert(id, 5);

        let view = fx.service.get_order(id).await.unwrap();
        assert_eq!(view.feedback.unwrap().rating, 5);
    }

    #[tokio::test]
    async fn test_feedback_outage_fails_reads() {
        let fx = fixture();
        let id = fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap().id;
        fx.feedback.down.store(true, Ordering::SeqCst);

        let err = fx.service.get_order(id).await.unwrap_err();
        assert!(matches!(err, OrderError::Collaborator(ClientError::Timeout { .. })));

        let err = fx.service.list_orders(&PageRequest::of_size(10), None).await.unwrap_err();
        assert!(matches!(err, OrderError::Collaborator(_)));
    }

    #[tokio::test]
    async fn test_list_orders_by_owner() {
        let fx = fixture();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        for service_id in [1, 2, 1] {
            fx.service.create_order(create(u1, service_id)).await.unwrap();
        }
        let u2_order = fx.service.create_order(create(u2, 2)).await.unwrap();

        let all = fx.service.list_orders(&PageRequest::of_size(10), None).await.unwrap();
        assert_eq!(all.total_elements, 4);
        assert_eq!(all.content.len(), 4);

        for size in [1, 2, 3, 10] {
            let page = fx.service.list_orders(&PageRequest::of_size(size), Some(u2)).await.unwrap();
            assert_eq!(page.total_elements, 1);
            assert_eq!(page.content.len(), 1);
            assert_eq!(page.content[0].id, u2_order.id);
        }

        let page = fx.service.list_orders(&PageRequest::of_size(2), Some(u1)).await.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.content.iter().all(|v| v.owner_id == u1));
        assert!(page.content.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_list_orders_matching_combines_predicates() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let a = fx.service.create_order(create(owner, 1)).await.unwrap();
        fx.service.create_order(create(owner, 2)).await.unwrap();
        fx.service.create_order(create(Uuid::new_v4(), 1)).await.unwrap();
        fx.service.change_status(a.id, OrderStatus::Confirmed).await.unwrap();

        let filter = OrderFilter::build(Some(owner), None)
            .service(Some(1))
            .status(Some(OrderStatus::Confirmed));
        let page = fx
            .service
            .list_orders_matching(&PageRequest::of_size(10), &filter)
            .await
            .unwrap();

        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].id, a.id);
    }
}
