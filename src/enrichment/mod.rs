// ============================================================================
// Feedback Enrichment
// ============================================================================
//
// Turns stored orders into OrderViews carrying the newest feedback, if any.
// A page is enriched with one lookup per order, at most `max_concurrency`
// in flight, results kept in input order. Any lookup failure fails the whole
// call; a failure is never reported as "no feedback".
//
// ============================================================================

pub mod view;

pub use view::{OrderView, ORDERS_PATH};

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::clients::{ClientError, FeedbackClient, FeedbackQuery, FeedbackView};
use crate::domain::order::{Order, OrderId};
use crate::query::Page;

/// Newest feedback for an order. Swappable for batched or cached sources.
#[async_trait]
pub trait FeedbackLookup: Send + Sync {
    async fn latest_for_order(&self, order_id: OrderId) -> Result<Option<FeedbackView>, ClientError>;
}

#[async_trait]
impl<C> FeedbackLookup for C
where
    C: FeedbackClient + ?Sized,
{
    async fn latest_for_order(&self, order_id: OrderId) -> Result<Option<FeedbackView>, ClientError> {
        let page = self.list_feedback(&FeedbackQuery::latest_for_order(order_id)).await?;
        Ok(page.content.into_iter().next())
    }
}

pub struct FeedbackEnricher {
    lookup: Arc<dyn FeedbackLookup>,
    max_concurrency: usize,
}

impl FeedbackEnricher {
    pub fn new(lookup: Arc<dyn FeedbackLookup>, max_concurrency: usize) -> Self {
        Self {
            lookup,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Newest feedback for `order_id`, without building a view
    pub async fn latest(&self, order_id: OrderId) -> Result<Option<FeedbackView>, ClientError> {
        self.lookup.latest_for_order(order_id).await
    }

    pub async fn enrich(&self, order: Order) -> Result<OrderView, ClientError> {
        let feedback = self.latest(order.id).await?;
        Ok(OrderView::new(order, feedback))
    }

    pub async fn enrich_all(&self, mut page: Page<Order>) -> Result<Page<OrderView>, ClientError> {
        let orders = std::mem::take(&mut page.content);
        let count = orders.len();

        let views: Vec<OrderView> = stream::iter(orders.into_iter().map(|order| self.enrich(order)))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        tracing::debug!(orders = count, "Enriched order page with feedback");
        Ok(page.with_content(views))
    }
}
